/// End-to-end section runs over the simulated world: the full courier
/// errand and the scripted team fight, driven through the tutorial machine
/// with scripted player input.
use std::path::Path;

use tutorial_graph::core::context::ContextKey;
use tutorial_graph::core::section::{MachineStatus, TutorialMachine};
use tutorial_graph::core::world::GameWorld;
use tutorial_graph::schema::dialog::DialogLibrary;
use tutorial_graph::schema::entity::{EntityId, Position, Team};
use tutorial_graph::schema::goal::GoalState;
use tutorial_graph::schema::order::{CastTarget, OrderKind, PlayerOrder};
use tutorial_graph::sections::{courier, team_fight};
use tutorial_graph::sim::SimWorld;

const DT: f64 = 0.1;

fn drive_until<F>(
    world: &mut SimWorld,
    machine: &mut TutorialMachine,
    max_seconds: f64,
    mut pred: F,
) -> bool
where
    F: FnMut(&SimWorld, &TutorialMachine) -> bool,
{
    let deadline = world.now() + max_seconds;
    while world.now() < deadline {
        world.step(DT);
        let now = world.now();
        machine.tick(world, now).expect("section must not abort");
        if pred(world, machine) {
            return true;
        }
    }
    false
}

fn goal_state(world: &SimWorld, label: &str) -> Option<GoalState> {
    world
        .goal_display()
        .iter()
        .find(|g| g.label.as_str() == label)
        .map(|g| g.state)
}

fn submit(world: &mut SimWorld, machine: &mut TutorialMachine, order: PlayerOrder) -> bool {
    let verdict = machine.filter_order(world, &order);
    if verdict.is_allowed() {
        world.apply_order(&order);
        true
    } else {
        false
    }
}

struct CourierStage {
    world: SimWorld,
    machine: TutorialMachine,
    hero: EntityId,
    courier_unit: EntityId,
}

fn courier_stage() -> CourierStage {
    let library = DialogLibrary::load_from_ron(Path::new("section_data/courier.ron"))
        .expect("courier dialog library loads");
    let mut world = SimWorld::with_dialog_library(library);

    let hero_home = Position::new(-4941.0, 5874.0, 128.0);
    let hero = world.spawn_unit("hero", hero_home, Team::Friendly);
    let first_guide = world.spawn_unit("first_guide", hero_home.offset(150.0, 0.0), Team::Friendly);
    let second_guide =
        world.spawn_unit("second_guide", hero_home.offset(-150.0, 0.0), Team::Friendly);
    let courier_unit =
        world.spawn_unit("courier", Position::new(-5000.0, 2300.0, 128.0), Team::Friendly);

    world.set_player_hero(hero);
    world.stock_secret_shop(courier::SECRET_SHOP_LOCATION, &[courier::KEYSTONE_BLADE]);
    world.add_recipe(
        &[courier::FLUX_CRYSTAL, courier::BINDING_RUNE],
        courier::STARFORGED_EDGE,
    );

    let mut machine = TutorialMachine::new(42);
    let ctx = machine.context_mut();
    ctx.set_entity(ContextKey::PlayerHero, hero);
    ctx.set_entity(ContextKey::PlayerCourier, courier_unit);
    ctx.set_entity(ContextKey::FirstGuide, first_guide);
    ctx.set_entity(ContextKey::SecondGuide, second_guide);

    machine.add_section(courier::section());
    machine.start(&mut world, 0.0).unwrap();

    CourierStage {
        world,
        machine,
        hero,
        courier_unit,
    }
}

#[test]
fn courier_section_runs_to_completion() {
    let CourierStage {
        mut world,
        mut machine,
        hero,
        courier_unit,
    } = courier_stage();

    // The goal list is declared up front, in order.
    machine.tick(&mut world, 0.0).unwrap();
    let labels: Vec<&str> = world
        .goal_display()
        .iter()
        .map(|g| g.label.as_str())
        .collect();
    assert_eq!(
        labels,
        vec![
            courier::GOAL_REACH_SHOP,
            courier::GOAL_OPEN_SHOP,
            courier::GOAL_BUY_BLADE,
            courier::GOAL_BUY_COMPONENTS,
            courier::GOAL_REQUEST_DELIVERY,
            courier::GOAL_WAIT_DELIVERY,
            courier::GOAL_FINAL_POSITION,
        ]
    );

    let hero_order = PlayerOrder::player(
        hero,
        OrderKind::MoveToPosition(courier::SHOP_FRONT_LOCATION),
    );
    assert!(submit(&mut world, &mut machine, hero_order));

    // Walk to the hidden shop; the movement goal activates mid-walk and
    // completes on arrival.
    assert!(drive_until(&mut world, &mut machine, 30.0, |world, _| {
        goal_state(world, courier::GOAL_REACH_SHOP) == Some(GoalState::Complete)
    }));

    // Shop-opening beat: highlight up, then the player opens the shop.
    assert!(drive_until(&mut world, &mut machine, 10.0, |world, _| {
        world.highlights().contains(courier::SHOP_BUTTON_PATH)
    }));
    world.set_shop_open(true);
    assert!(drive_until(&mut world, &mut machine, 5.0, |world, _| {
        world.highlights().contains(courier::BLADE_GUIDE_PATH)
    }));
    assert_eq!(world.unit(hero).unwrap().gold, 5150);

    // Off-script purchase is denied with the section's error message and
    // leaves step/goal state untouched.
    let wrong = PlayerOrder::player(
        hero,
        OrderKind::PurchaseItem {
            item: courier::FLUX_CRYSTAL.to_string(),
        },
    );
    assert!(!submit(&mut world, &mut machine, wrong));
    assert_eq!(
        world.last_error().map(|e| e.as_str()),
        Some(courier::ERROR_BUY_BLADE)
    );
    assert_eq!(
        goal_state(&world, courier::GOAL_BUY_BLADE),
        Some(GoalState::Active)
    );

    // The scripted purchase goes through and lands in the inventory.
    let buy_blade = PlayerOrder::player(
        hero,
        OrderKind::PurchaseItem {
            item: courier::KEYSTONE_BLADE.to_string(),
        },
    );
    assert!(submit(&mut world, &mut machine, buy_blade.clone()));
    assert!(world.has_item(hero, courier::KEYSTONE_BLADE));
    // Buying it twice is silently refused.
    assert!(!submit(&mut world, &mut machine, buy_blade));

    // Component phase: only listed components, once each.
    assert!(drive_until(&mut world, &mut machine, 10.0, |world, _| {
        world.highlights().contains(courier::COMPONENTS_GUIDE_PATH)
    }));
    let errors_before = world.errors.len();
    assert!(!submit(
        &mut world,
        &mut machine,
        PlayerOrder::player(
            hero,
            OrderKind::PurchaseItem {
                item: "shiny_bauble".to_string(),
            },
        ),
    ));
    assert_eq!(world.errors.len(), errors_before + 1);
    for item in courier::ALLOWED_COMPONENTS {
        assert!(submit(
            &mut world,
            &mut machine,
            PlayerOrder::player(
                hero,
                OrderKind::PurchaseItem {
                    item: (*item).to_string(),
                },
            ),
        ));
    }
    // Duplicates are refused once a component is bought.
    assert!(!submit(
        &mut world,
        &mut machine,
        PlayerOrder::player(
            hero,
            OrderKind::PurchaseItem {
                item: courier::FLUX_CRYSTAL.to_string(),
            },
        ),
    ));
    // Remote purchases sit in the stash until the courier moves.
    assert_eq!(world.unit(hero).unwrap().stash.len(), 2);

    // Delivery request beat.
    assert!(drive_until(&mut world, &mut machine, 10.0, |world, _| {
        goal_state(world, courier::GOAL_REQUEST_DELIVERY) == Some(GoalState::Active)
    }));
    assert!(submit(
        &mut world,
        &mut machine,
        PlayerOrder::player(courier_unit, OrderKind::CourierDeliver),
    ));

    // Camera follows the courier while the player waits frozen.
    assert!(drive_until(&mut world, &mut machine, 5.0, |world, _| {
        world.camera_target() == Some(courier_unit)
    }));
    assert!(world.unit(hero).unwrap().frozen);

    // Delivery arrives, components combine into the finished edge.
    assert!(drive_until(&mut world, &mut machine, 20.0, |world, _| {
        world.has_item(hero, courier::STARFORGED_EDGE)
    }));
    assert!(drive_until(&mut world, &mut machine, 5.0, |world, _| {
        goal_state(world, courier::GOAL_WAIT_DELIVERY) == Some(GoalState::Complete)
            && !world.unit(hero).unwrap().frozen
    }));

    // Final reposition closes the section and the machine finishes.
    assert!(drive_until(&mut world, &mut machine, 15.0, |world, _| {
        goal_state(world, courier::GOAL_FINAL_POSITION) == Some(GoalState::Active)
    }));
    assert!(submit(
        &mut world,
        &mut machine,
        PlayerOrder::player(hero, OrderKind::MoveToPosition(courier::FINAL_POSITION)),
    ));
    assert!(drive_until(&mut world, &mut machine, 30.0, |_, machine| {
        machine.status() == MachineStatus::Finished
    }));
}

#[test]
fn courier_section_skip_cleans_up() {
    let CourierStage {
        mut world,
        mut machine,
        hero,
        ..
    } = courier_stage();

    assert!(drive_until(&mut world, &mut machine, 10.0, |world, _| {
        !world.goal_display().is_empty()
    }));
    let now = world.now();
    machine.skip_section(&mut world, now).unwrap();

    // Goal display cleared, hero released, no further goal updates.
    assert!(world.goal_display().is_empty());
    assert!(!world.unit(hero).unwrap().frozen);
    let before = world.dialog_log.len();
    assert!(!drive_until(&mut world, &mut machine, 3.0, |world, _| {
        world.dialog_log.len() > before
    }));
    assert_eq!(machine.status(), MachineStatus::Finished);
}

#[test]
fn team_fight_section_runs_to_completion() {
    let library = DialogLibrary::load_from_ron(Path::new("section_data/team_fight.ron"))
        .expect("team fight dialog library loads");
    let mut world = SimWorld::with_dialog_library(library);

    let hero = world.spawn_unit("hero", team_fight::BATTLE_GROUND, Team::Friendly);
    let first_guide = world.spawn_unit(
        "first_guide",
        team_fight::BATTLE_GROUND.offset(200.0, 0.0),
        Team::Friendly,
    );
    let second_guide = world.spawn_unit(
        "second_guide",
        team_fight::BATTLE_GROUND.offset(-200.0, 0.0),
        Team::Friendly,
    );
    world.set_player_hero(hero);

    let mut machine = TutorialMachine::new(7);
    let ctx = machine.context_mut();
    ctx.set_entity(ContextKey::PlayerHero, hero);
    ctx.set_entity(ContextKey::FirstGuide, first_guide);
    ctx.set_entity(ContextKey::SecondGuide, second_guide);

    machine.add_section(team_fight::section());
    machine.start(&mut world, 0.0).unwrap();

    // Required state equipped the keepsake gear before the section built.
    for item in team_fight::KEEPSAKE_ITEMS {
        assert!(world.has_item(hero, item));
    }

    // Both squads spawned into their context slots on the first tick.
    let enemies: Vec<EntityId> = team_fight::ENEMY_NAMES
        .iter()
        .map(|name| {
            machine
                .context()
                .try_entity(&ContextKey::Enemy((*name).to_string()))
                .expect("enemy spawned")
        })
        .collect();
    assert_eq!(enemies.len(), 5);

    // After the intro pan, the brawl starts and allies engage.
    assert!(drive_until(&mut world, &mut machine, 15.0, |world, machine| {
        let ally = machine
            .context()
            .try_entity(&ContextKey::Ally("blademaster".to_string()));
        ally.map_or(false, |id| world.is_attacking(id))
    }));
    assert_eq!(
        goal_state(&world, team_fight::GOAL_DEFEAT_ENEMIES),
        Some(GoalState::Active)
    );

    // Scripted opener goes out once the line engages.
    assert!(drive_until(&mut world, &mut machine, 10.0, |world, _| {
        world
            .cast_log
            .iter()
            .any(|(_, ability)| ability == "whirling_steel")
    }));

    // Kill two enemies; the numeric goal tracks the body count.
    world.kill_unit(enemies[0]);
    world.kill_unit(enemies[1]);
    assert!(drive_until(&mut world, &mut machine, 5.0, |world, _| {
        world
            .goal_display()
            .iter()
            .any(|g| g.label.as_str() == team_fight::GOAL_DEFEAT_ENEMIES
                && g.current_value == Some(2))
    }));

    // Finish the fight.
    for id in &enemies[2..] {
        world.kill_unit(*id);
    }
    assert!(drive_until(&mut world, &mut machine, 10.0, |world, _| {
        goal_state(world, team_fight::GOAL_DEFEAT_ENEMIES) == Some(GoalState::Complete)
    }));

    // Recall beat: scroll handed over, then the aim matters.
    assert!(drive_until(&mut world, &mut machine, 20.0, |world, _| {
        goal_state(world, team_fight::GOAL_USE_RECALL) == Some(GoalState::Active)
    }));
    assert!(world.has_item(hero, team_fight::RECALL_SCROLL));
    assert!(world.highlights().contains(team_fight::RECALL_SLOT_PATH));

    let bad_recall = PlayerOrder::player(
        hero,
        OrderKind::UseItem {
            item: team_fight::RECALL_SCROLL.to_string(),
            target: CastTarget::Point(team_fight::BATTLE_GROUND),
        },
    );
    assert!(!submit(&mut world, &mut machine, bad_recall));
    assert_eq!(
        world.last_error().map(|e| e.as_str()),
        Some(team_fight::ERROR_RECALL_TARGET)
    );

    let good_recall = PlayerOrder::player(
        hero,
        OrderKind::UseItem {
            item: team_fight::RECALL_SCROLL.to_string(),
            target: CastTarget::Point(team_fight::FOUNTAIN_LOCATION),
        },
    );
    // The raw cast never commits; the script notices and teleports itself.
    assert!(!submit(&mut world, &mut machine, good_recall));
    assert!(drive_until(&mut world, &mut machine, 5.0, |world, _| {
        goal_state(world, team_fight::GOAL_USE_RECALL) == Some(GoalState::Complete)
    }));

    // Voice bait: key the mic, get thanked.
    assert!(drive_until(&mut world, &mut machine, 15.0, |world, _| {
        goal_state(world, team_fight::GOAL_PROMISE_CARRY) == Some(GoalState::Active)
    }));
    world.set_voice_chat(true);
    assert!(drive_until(&mut world, &mut machine, 10.0, |world, _| {
        goal_state(world, team_fight::GOAL_PROMISE_CARRY) == Some(GoalState::Complete)
    }));
    world.set_voice_chat(false);

    // Epilogue: teleported home, squads disposed, machine finished.
    assert!(drive_until(&mut world, &mut machine, 20.0, |_, machine| {
        machine.status() == MachineStatus::Finished
    }));
    let hero_pos = world.unit_position(hero).unwrap();
    assert!(hero_pos.distance_2d(&team_fight::FOUNTAIN_LOCATION) < 100.0);
    for id in &enemies {
        assert!(world.unit(*id).is_none());
    }
}
