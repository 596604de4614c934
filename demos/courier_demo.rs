/// Courier demo — the full shopping-and-delivery section running against
/// the simulated world, with a scripted player following the goals.
///
/// Run with: cargo run --example courier_demo

use std::path::Path;

use tutorial_graph::core::context::ContextKey;
use tutorial_graph::core::section::{MachineStatus, TutorialMachine};
use tutorial_graph::core::world::GameWorld;
use tutorial_graph::schema::dialog::DialogLibrary;
use tutorial_graph::schema::entity::{Position, Team};
use tutorial_graph::schema::goal::{GoalKind, GoalState};
use tutorial_graph::schema::order::{OrderKind, PlayerOrder};
use tutorial_graph::sections::courier;
use tutorial_graph::sim::SimWorld;

fn main() {
    tracing_subscriber::fmt::init();

    let library = DialogLibrary::load_from_ron(Path::new("section_data/courier.ron"))
        .expect("Failed to load courier dialog");
    let captions = library.clone();
    let mut world = SimWorld::with_dialog_library(library);

    // --- World setup: hero, the two guides, and the courier ---
    let hero_home = Position::new(-4941.0, 5874.0, 128.0);
    let hero = world.spawn_unit("hero", hero_home, Team::Friendly);
    let first_guide = world.spawn_unit("slag", hero_home.offset(150.0, 0.0), Team::Friendly);
    let second_guide = world.spawn_unit("sol", hero_home.offset(-150.0, 0.0), Team::Friendly);
    let courier_unit = world.spawn_unit(
        "courier",
        Position::new(-5000.0, 2300.0, 128.0),
        Team::Friendly,
    );
    world.set_player_hero(hero);
    world.stock_secret_shop(courier::SECRET_SHOP_LOCATION, &[courier::KEYSTONE_BLADE]);
    world.add_recipe(
        &[courier::FLUX_CRYSTAL, courier::BINDING_RUNE],
        courier::STARFORGED_EDGE,
    );

    let mut machine = TutorialMachine::new(2026);
    let ctx = machine.context_mut();
    ctx.set_entity(ContextKey::PlayerHero, hero);
    ctx.set_entity(ContextKey::PlayerCourier, courier_unit);
    ctx.set_entity(ContextKey::FirstGuide, first_guide);
    ctx.set_entity(ContextKey::SecondGuide, second_guide);

    machine.add_section(courier::section());
    machine.start(&mut world, 0.0).expect("section start");

    // --- Scripted player: one cue per tutorial beat, fired once ---
    type Cue = (
        &'static str,
        Box<dyn Fn(&SimWorld) -> bool>,
        Box<dyn Fn(&mut SimWorld, &mut TutorialMachine)>,
    );
    let mut cues: Vec<Cue> = vec![
        (
            "walk to the hidden shop",
            Box::new(|_| true),
            Box::new(move |world, machine| {
                submit(
                    world,
                    machine,
                    PlayerOrder::player(
                        hero,
                        OrderKind::MoveToPosition(courier::SHOP_FRONT_LOCATION),
                    ),
                );
            }),
        ),
        (
            "open the shop",
            Box::new(|world: &SimWorld| {
                world.highlights().contains(courier::SHOP_BUTTON_PATH)
            }),
            Box::new(|world, _| world.set_shop_open(true)),
        ),
        (
            "buy the keystone blade",
            Box::new(|world: &SimWorld| {
                world.highlights().contains(courier::BLADE_GUIDE_PATH)
            }),
            Box::new(move |world, machine| {
                submit(
                    world,
                    machine,
                    PlayerOrder::player(
                        hero,
                        OrderKind::PurchaseItem {
                            item: courier::KEYSTONE_BLADE.to_string(),
                        },
                    ),
                );
            }),
        ),
        (
            "buy the components",
            Box::new(|world: &SimWorld| {
                world.highlights().contains(courier::COMPONENTS_GUIDE_PATH)
            }),
            Box::new(move |world, machine| {
                for item in courier::ALLOWED_COMPONENTS {
                    submit(
                        world,
                        machine,
                        PlayerOrder::player(
                            hero,
                            OrderKind::PurchaseItem {
                                item: (*item).to_string(),
                            },
                        ),
                    );
                }
            }),
        ),
        (
            "request delivery",
            Box::new(|world: &SimWorld| {
                world.highlights().contains(courier::DELIVER_BUTTON_PATH)
            }),
            Box::new(move |world, machine| {
                submit(
                    world,
                    machine,
                    PlayerOrder::player(courier_unit, OrderKind::CourierDeliver),
                );
            }),
        ),
        (
            "head to the jungle",
            Box::new(|world: &SimWorld| {
                goal_state(world, courier::GOAL_FINAL_POSITION) == Some(GoalState::Active)
            }),
            Box::new(move |world, machine| {
                submit(
                    world,
                    machine,
                    PlayerOrder::player(hero, OrderKind::MoveToPosition(courier::FINAL_POSITION)),
                );
            }),
        ),
    ];

    // --- Drive loop: print dialog and goal changes as they happen ---
    let mut spoken = 0;
    let mut last_goals = String::new();
    let dt = 0.1;
    while machine.status() == MachineStatus::Running && world.now() < 120.0 {
        world.step(dt);
        let now = world.now();
        machine.tick(&mut world, now).expect("section tick");

        while spoken < world.dialog_log.len() {
            let key = &world.dialog_log[spoken];
            let text = captions
                .lines
                .get(key)
                .map(|line| line.text.as_str())
                .unwrap_or("…");
            println!("[{now:6.1}s] 🗣  {text}");
            spoken += 1;
        }

        let rendered = render_goals(&world);
        if rendered != last_goals {
            if !rendered.is_empty() {
                println!("[{now:6.1}s] {rendered}");
            }
            last_goals = rendered;
        }

        if let Some(at) = cues.iter().position(|(_, ready, _)| ready(&world)) {
            let (label, _, act) = cues.remove(at);
            println!("[{now:6.1}s] ▶  player: {label}");
            act(&mut world, &mut machine);
        }
    }

    println!(
        "\nFinished: {:?} after {:.1}s of game time",
        machine.status(),
        world.now()
    );
}

fn submit(world: &mut SimWorld, machine: &mut TutorialMachine, order: PlayerOrder) {
    let verdict = machine.filter_order(world, &order);
    if verdict.is_allowed() {
        world.apply_order(&order);
    }
}

fn goal_state(world: &SimWorld, label: &str) -> Option<GoalState> {
    world
        .goal_display()
        .iter()
        .find(|g| g.label.as_str() == label)
        .map(|g| g.state)
}

fn render_goals(world: &SimWorld) -> String {
    world
        .goal_display()
        .iter()
        .map(|goal| {
            let mark = match goal.state {
                GoalState::Pending => " ",
                GoalState::Active => "•",
                GoalState::Complete => "✓",
            };
            match goal.kind {
                GoalKind::Numeric => format!(
                    "[{mark}] {} ({}/{})",
                    goal.label,
                    goal.current_value.unwrap_or(0),
                    goal.target_value.unwrap_or(0)
                ),
                GoalKind::Boolean => format!("[{mark}] {}", goal.label),
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}
