/// Team-fight demo — the scripted 5v5 with a cooperative player: watches
/// the intro, wins the fight (the sim referee calls the kills), aims the
/// recall scroll home, and even keys the mic when baited.
///
/// Run with: cargo run --example team_fight_demo

use std::path::Path;

use tutorial_graph::core::context::ContextKey;
use tutorial_graph::core::section::{MachineStatus, TutorialMachine};
use tutorial_graph::core::world::GameWorld;
use tutorial_graph::schema::dialog::DialogLibrary;
use tutorial_graph::schema::entity::{EntityId, Team};
use tutorial_graph::schema::goal::{GoalKind, GoalState};
use tutorial_graph::schema::order::{CastTarget, OrderKind, PlayerOrder};
use tutorial_graph::sections::team_fight;
use tutorial_graph::sim::SimWorld;

fn main() {
    tracing_subscriber::fmt::init();

    let library = DialogLibrary::load_from_ron(Path::new("section_data/team_fight.ron"))
        .expect("Failed to load team fight dialog");
    let captions = library.clone();
    let mut world = SimWorld::with_dialog_library(library);

    let hero = world.spawn_unit("hero", team_fight::BATTLE_GROUND, Team::Friendly);
    let first_guide = world.spawn_unit(
        "slag",
        team_fight::BATTLE_GROUND.offset(200.0, 0.0),
        Team::Friendly,
    );
    let second_guide = world.spawn_unit(
        "sol",
        team_fight::BATTLE_GROUND.offset(-200.0, 0.0),
        Team::Friendly,
    );
    world.set_player_hero(hero);

    let mut machine = TutorialMachine::new(2026);
    let ctx = machine.context_mut();
    ctx.set_entity(ContextKey::PlayerHero, hero);
    ctx.set_entity(ContextKey::FirstGuide, first_guide);
    ctx.set_entity(ContextKey::SecondGuide, second_guide);

    machine.add_section(team_fight::section());
    machine.start(&mut world, 0.0).expect("section start");

    // The squads exist after the first tick; the referee needs the list.
    let enemies: Vec<EntityId> = team_fight::ENEMY_NAMES
        .iter()
        .filter_map(|name| {
            machine
                .context()
                .try_entity(&ContextKey::Enemy((*name).to_string()))
        })
        .collect();

    let mut spoken = 0;
    let mut last_goals = String::new();
    let mut next_kill = 0;
    let mut kill_at = 8.0;
    let mut recalled = false;
    let mut keyed_mic = false;
    let dt = 0.1;

    while machine.status() == MachineStatus::Running && world.now() < 180.0 {
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

        // Referee: one enemy falls every few seconds once the brawl is on.
        if next_kill < enemies.len() && now >= kill_at {
            world.kill_unit(enemies[next_kill]);
            println!(
                "[{now:6.1}s] ☠  {} falls",
                team_fight::ENEMY_NAMES[next_kill]
            );
            next_kill += 1;
            kill_at = now + 2.5;
        }

        // Aim the recall scroll once the tutorial asks for it.
        if !recalled
            && goal_state(&world, team_fight::GOAL_USE_RECALL) == Some(GoalState::Active)
        {
            recalled = true;
            println!("[{now:6.1}s] ▶  player: recall home");
            let order = PlayerOrder::player(
                hero,
                OrderKind::UseItem {
                    item: team_fight::RECALL_SCROLL.to_string(),
                    target: CastTarget::Point(team_fight::FOUNTAIN_LOCATION),
                },
            );
            // The filter records the aim and swallows the raw cast.
            machine.filter_order(&mut world, &order);
        }

        // Take the voice-chat bait.
        if !keyed_mic
            && goal_state(&world, team_fight::GOAL_PROMISE_CARRY) == Some(GoalState::Active)
        {
            keyed_mic = true;
            println!("[{now:6.1}s] ▶  player: keys the mic");
            world.set_voice_chat(true);
        }
    }

    println!(
        "\nFinished: {:?} after {:.1}s of game time",
        machine.status(),
        world.now()
    );
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
