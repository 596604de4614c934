/// Section Runner — headless scripted playthrough of a built-in section
/// on the simulated world, printing a tick transcript.
///
/// Usage: section_runner <courier|team_fight> [--seed <n>] [--data-dir <dir>] [--dt <seconds>]

use std::path::{Path, PathBuf};
use std::process;

use tutorial_graph::core::context::ContextKey;
use tutorial_graph::core::section::{MachineStatus, TutorialMachine};
use tutorial_graph::core::world::GameWorld;
use tutorial_graph::schema::dialog::DialogLibrary;
use tutorial_graph::schema::entity::{EntityId, Position, Team};
use tutorial_graph::schema::goal::GoalState;
use tutorial_graph::schema::order::{CastTarget, OrderKind, PlayerOrder};
use tutorial_graph::sections::{courier, team_fight};
use tutorial_graph::sim::SimWorld;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let section = args[1].clone();
    let mut seed: u64 = 42;
    let mut data_dir = PathBuf::from("section_data");
    let mut dt: f64 = 0.1;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--data-dir" if i + 1 < args.len() => {
                i += 1;
                data_dir = PathBuf::from(&args[i]);
            }
            "--dt" if i + 1 < args.len() => {
                i += 1;
                dt = args[i].parse().unwrap_or(0.1);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let finished = match section.as_str() {
        "courier" => run_courier(seed, &data_dir, dt),
        "team_fight" => run_team_fight(seed, &data_dir, dt),
        other => {
            eprintln!("Unknown section '{}'", other);
            print_usage();
            process::exit(1);
        }
    };

    if !finished {
        eprintln!("Section did not finish within its time budget");
        process::exit(1);
    }
}

fn print_usage() {
    println!(
        "Usage: section_runner <courier|team_fight> [--seed <n>] [--data-dir <dir>] [--dt <seconds>]"
    );
}

fn load_library(data_dir: &Path, file: &str) -> DialogLibrary {
    let path = data_dir.join(file);
    match DialogLibrary::load_from_ron(&path) {
        Ok(library) => library,
        Err(e) => {
            eprintln!("ERROR: failed to load {:?}: {}", path, e);
            process::exit(1);
        }
    }
}

struct Transcript {
    spoken: usize,
    last_goals: String,
}

impl Transcript {
    fn new() -> Self {
        Transcript {
            spoken: 0,
            last_goals: String::new(),
        }
    }

    fn emit(&mut self, world: &SimWorld) {
        let now = world.now();
        while self.spoken < world.dialog_log.len() {
            println!("[{now:6.1}s] line: {}", world.dialog_log[self.spoken]);
            self.spoken += 1;
        }
        let goals = world
            .goal_display()
            .iter()
            .map(|g| {
                let mark = match g.state {
                    GoalState::Pending => ' ',
                    GoalState::Active => '*',
                    GoalState::Complete => 'x',
                };
                match (g.current_value, g.target_value) {
                    (Some(current), Some(target)) => {
                        format!("[{mark}] {} {current}/{target}", g.label)
                    }
                    _ => format!("[{mark}] {}", g.label),
                }
            })
            .collect::<Vec<_>>()
            .join("  ");
        if goals != self.last_goals {
            if !goals.is_empty() {
                println!("[{now:6.1}s] goals: {goals}");
            }
            self.last_goals = goals;
        }
    }
}

fn submit(world: &mut SimWorld, machine: &mut TutorialMachine, order: PlayerOrder) {
    if machine.filter_order(world, &order).is_allowed() {
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

fn run_courier(seed: u64, data_dir: &Path, dt: f64) -> bool {
    let mut world = SimWorld::with_dialog_library(load_library(data_dir, "courier.ron"));

    let hero_home = Position::new(-4941.0, 5874.0, 128.0);
    let hero = world.spawn_unit("hero", hero_home, Team::Friendly);
    let first = world.spawn_unit("first_guide", hero_home.offset(150.0, 0.0), Team::Friendly);
    let second = world.spawn_unit("second_guide", hero_home.offset(-150.0, 0.0), Team::Friendly);
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

    let mut machine = TutorialMachine::new(seed);
    let ctx = machine.context_mut();
    ctx.set_entity(ContextKey::PlayerHero, hero);
    ctx.set_entity(ContextKey::PlayerCourier, courier_unit);
    ctx.set_entity(ContextKey::FirstGuide, first);
    ctx.set_entity(ContextKey::SecondGuide, second);
    machine.add_section(courier::section());
    machine.start(&mut world, 0.0).expect("section start");

    submit(
        &mut world,
        &mut machine,
        PlayerOrder::player(hero, OrderKind::MoveToPosition(courier::SHOP_FRONT_LOCATION)),
    );

    let mut transcript = Transcript::new();
    let mut bought_blade = false;
    let mut bought_components = false;
    let mut requested = false;
    let mut final_move = false;

    while machine.status() == MachineStatus::Running && world.now() < 120.0 {
        world.step(dt);
        let now = world.now();
        machine.tick(&mut world, now).expect("section tick");
        transcript.emit(&world);

        if world.highlights().contains(courier::SHOP_BUTTON_PATH) && !world.shop_open() {
            world.set_shop_open(true);
        }
        if !bought_blade && world.highlights().contains(courier::BLADE_GUIDE_PATH) {
            bought_blade = true;
            submit(
                &mut world,
                &mut machine,
                PlayerOrder::player(
                    hero,
                    OrderKind::PurchaseItem {
                        item: courier::KEYSTONE_BLADE.to_string(),
                    },
                ),
            );
        }
        if !bought_components && world.highlights().contains(courier::COMPONENTS_GUIDE_PATH) {
            bought_components = true;
            for item in courier::ALLOWED_COMPONENTS {
                submit(
                    &mut world,
                    &mut machine,
                    PlayerOrder::player(
                        hero,
                        OrderKind::PurchaseItem {
                            item: (*item).to_string(),
                        },
                    ),
                );
            }
        }
        if !requested && world.highlights().contains(courier::DELIVER_BUTTON_PATH) {
            requested = true;
            submit(
                &mut world,
                &mut machine,
                PlayerOrder::player(courier_unit, OrderKind::CourierDeliver),
            );
        }
        if !final_move
            && goal_state(&world, courier::GOAL_FINAL_POSITION) == Some(GoalState::Active)
        {
            final_move = true;
            submit(
                &mut world,
                &mut machine,
                PlayerOrder::player(hero, OrderKind::MoveToPosition(courier::FINAL_POSITION)),
            );
        }
    }

    machine.status() == MachineStatus::Finished
}

fn run_team_fight(seed: u64, data_dir: &Path, dt: f64) -> bool {
    let mut world = SimWorld::with_dialog_library(load_library(data_dir, "team_fight.ron"));

    let hero = world.spawn_unit("hero", team_fight::BATTLE_GROUND, Team::Friendly);
    let first = world.spawn_unit(
        "first_guide",
        team_fight::BATTLE_GROUND.offset(200.0, 0.0),
        Team::Friendly,
    );
    let second = world.spawn_unit(
        "second_guide",
        team_fight::BATTLE_GROUND.offset(-200.0, 0.0),
        Team::Friendly,
    );
    world.set_player_hero(hero);

    let mut machine = TutorialMachine::new(seed);
    let ctx = machine.context_mut();
    ctx.set_entity(ContextKey::PlayerHero, hero);
    ctx.set_entity(ContextKey::FirstGuide, first);
    ctx.set_entity(ContextKey::SecondGuide, second);
    machine.add_section(team_fight::section());
    machine.start(&mut world, 0.0).expect("section start");

    let enemies: Vec<EntityId> = team_fight::ENEMY_NAMES
        .iter()
        .filter_map(|name| {
            machine
                .context()
                .try_entity(&ContextKey::Enemy((*name).to_string()))
        })
        .collect();

    let mut transcript = Transcript::new();
    let mut next_kill = 0;
    let mut kill_at = 8.0;
    let mut recalled = false;
    let mut keyed_mic = false;

    while machine.status() == MachineStatus::Running && world.now() < 180.0 {
        world.step(dt);
        let now = world.now();
        machine.tick(&mut world, now).expect("section tick");
        transcript.emit(&world);

        if next_kill < enemies.len() && now >= kill_at {
            world.kill_unit(enemies[next_kill]);
            next_kill += 1;
            kill_at = now + 2.5;
        }
        if !recalled && goal_state(&world, team_fight::GOAL_USE_RECALL) == Some(GoalState::Active)
        {
            recalled = true;
            let order = PlayerOrder::player(
                hero,
                OrderKind::UseItem {
                    item: team_fight::RECALL_SCROLL.to_string(),
                    target: CastTarget::Point(team_fight::FOUNTAIN_LOCATION),
                },
            );
            machine.filter_order(&mut world, &order);
        }
        if !keyed_mic
            && goal_state(&world, team_fight::GOAL_PROMISE_CARRY) == Some(GoalState::Active)
        {
            keyed_mic = true;
            world.set_voice_chat(true);
        }
    }

    machine.status() == MachineStatus::Finished
}
