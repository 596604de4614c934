//! Team-fight section — a scripted 5v5: both squads spawn pacified, the
//! camera pans across the enemy line during the intro, scripted casts race
//! the fight's outcome, and the epilogue walks the player through their
//! first recall scroll (and a little voice-chat bait).

use rand::Rng;

use crate::core::context::{ContextKey, TutorialContext};
use crate::core::goals::GoalTracker;
use crate::core::leaves::{
    audio_dialog, pan_camera_exponential, use_ability, wait_for_voice_chat, AbilityTarget,
};
use crate::core::section::{FunctionalSection, SectionGraph};
use crate::core::step::{
    complete_on_check, fork, fork_any, immediate, never_complete, repeat_while, seq, wait,
    with_goals, GraphError, StepArg,
};
use crate::core::world::GameWorld;
use crate::schema::entity::{Position, Team};
use crate::schema::order::{CastTarget, OrderKind, OrderVerdict, PlayerOrder};
use crate::schema::section::{RequiredState, SectionName};
use crate::sections::{living_allies, living_enemies, spawn_squad};

pub const ALLY_NAMES: &[&str] = &["blademaster", "tidecaller", "hexweaver", "stormcaller"];
pub const ENEMY_NAMES: &[&str] = &["ironclad", "frostmage", "warlock", "ranger", "shadowpriest"];

pub const BATTLE_GROUND: Position = Position::new(-1000.0, 500.0, 0.0);
pub const ENEMY_CAMP: Position = Position::new(500.0, 1200.0, 0.0);
pub const FOUNTAIN_LOCATION: Position = Position::new(-6850.0, -6500.0, 384.0);
const SPAWN_SPREAD: f32 = 250.0;
const RECALL_TARGET_RANGE: f32 = 1000.0;

pub const RECALL_SCROLL: &str = "recall_scroll";
pub const RECALL_SLOT_PATH: &str = "lower_hud/inventory/recall_slot";

pub const GOAL_SPOT_ENEMIES: &str = "goal_teamfight_spot_enemies";
pub const GOAL_DEFEAT_ENEMIES: &str = "goal_teamfight_defeat_enemies";
pub const GOAL_USE_RECALL: &str = "goal_teamfight_use_recall";
pub const GOAL_PROMISE_CARRY: &str = "goal_teamfight_promise_carry";

pub const SCRIPT_SPOT_ENEMIES: &str = "script_teamfight_spot_enemies";
pub const SCRIPT_VICTORY: &str = "script_teamfight_victory";
pub const SCRIPT_RECALL_1: &str = "script_teamfight_recall_1";
pub const SCRIPT_RECALL_2: &str = "script_teamfight_recall_2";
pub const SCRIPT_RECALL_NAG: &str = "script_teamfight_recall_nag";
pub const SCRIPT_VOICE_1: &str = "script_teamfight_voice_1";
pub const SCRIPT_VOICE_2: &str = "script_teamfight_voice_2";
pub const SCRIPT_VOICE_NAG: &str = "script_teamfight_voice_nag";
pub const SCRIPT_VOICE_THANKS: &str = "script_teamfight_voice_thanks";
pub const SCRIPT_VOICE_SILENT: &str = "script_teamfight_voice_silent";

/// Every voiced line this section plays, for content lints.
pub const DIALOG_KEYS: &[&str] = &[
    SCRIPT_SPOT_ENEMIES,
    SCRIPT_VICTORY,
    SCRIPT_RECALL_1,
    SCRIPT_RECALL_2,
    SCRIPT_RECALL_NAG,
    SCRIPT_VOICE_1,
    SCRIPT_VOICE_2,
    SCRIPT_VOICE_NAG,
    SCRIPT_VOICE_THANKS,
    SCRIPT_VOICE_SILENT,
];

pub const ERROR_RECALL_TARGET: &str = "error_teamfight_recall_target";

const VAR_WAITING_RECALL: &str = "teamfight_waiting_recall";
const VAR_USED_RECALL: &str = "teamfight_used_recall";
const VAR_VOICE_USED: &str = "teamfight_voice_used";

fn ally(name: &str) -> ContextKey {
    ContextKey::Ally(name.to_string())
}

fn enemy(name: &str) -> ContextKey {
    ContextKey::Enemy(name.to_string())
}

pub fn required_state() -> RequiredState {
    RequiredState {
        hero_location: Some(BATTLE_GROUND),
        // High tolerance: the previous section ends with the player
        // already pushing toward the enemies.
        hero_location_tolerance: 1500.0,
        hero_level: Some(25),
        hero_ability_min_levels: vec![4, 4, 4, 3],
        hero_items: vec![KEEPSAKE_ITEMS[0].to_string(), KEEPSAKE_ITEMS[1].to_string()],
        require_first_guide: true,
        require_second_guide: true,
        blockades: vec!["pit_rim".to_string(), "river_cliff".to_string()],
        ..RequiredState::default()
    }
}

/// Gear the player is expected to still be carrying from earlier chapters.
pub const KEEPSAKE_ITEMS: &[&str] = &["starforged_edge", "aegis_shard"];

fn build(
    ctx: &mut TutorialContext,
    _world: &mut dyn GameWorld,
) -> Result<SectionGraph, GraphError> {
    let hero = ctx.entity(&ContextKey::PlayerHero)?;
    let total_enemies = ENEMY_NAMES.len() as u32;

    let mut goals = GoalTracker::new();
    let goal_spot_enemies = goals.add_boolean(GOAL_SPOT_ENEMIES);
    let goal_defeat_enemies = goals.add_numeric(GOAL_DEFEAT_ENEMIES, total_enemies);
    let goal_use_recall = goals.add_boolean(GOAL_USE_RECALL);
    let goal_promise_carry = goals.add_boolean(GOAL_PROMISE_CARRY);

    let root = with_goals(seq(vec![
        immediate(move |frame| {
            frame.world.heal(hero);
            Ok(())
        }),
        spawn_squad(ALLY_NAMES, Team::Friendly, BATTLE_GROUND, SPAWN_SPREAD),
        spawn_squad(ENEMY_NAMES, Team::Enemy, ENEMY_CAMP, SPAWN_SPREAD),
        immediate(|frame| {
            // Scripted casters need their spells ready before the brawl.
            for (key, ability) in [
                (ally("blademaster"), "whirling_steel"),
                (ally("tidecaller"), "tidal_crash"),
                (ally("hexweaver"), "hex_bolt"),
                (enemy("frostmage"), "glacial_barrage"),
                (enemy("warlock"), "curse_of_embers"),
                (enemy("shadowpriest"), "dark_mending"),
            ] {
                let id = frame.ctx.entity(&key)?;
                frame.world.ensure_ability(id, ability);
            }
            frame.world.set_time_of_day(0.5);
            Ok(())
        }),
        // Pan across the enemy line while the intro line plays; both
        // branches must finish before the fight starts.
        immediate(move |frame| {
            frame.goals.start(goal_spot_enemies);
            Ok(())
        }),
        fork(vec![
            audio_dialog(SCRIPT_SPOT_ENEMIES, ContextKey::FirstGuide),
            seq(vec![
                pan_camera_exponential(
                    StepArg::from_fn(move |frame| {
                        frame
                            .world
                            .unit_position(hero)
                            .ok_or(GraphError::UnknownEntity(hero))
                    }),
                    ENEMY_CAMP,
                    2.0,
                ),
                wait(0.75),
                immediate(move |frame| {
                    frame.goals.complete(goal_spot_enemies);
                    Ok(())
                }),
                wait(0.75),
                immediate(move |frame| {
                    frame.goals.start(goal_defeat_enemies);
                    Ok(())
                }),
                wait(0.75),
            ]),
        ]),
        // Everyone spawned pacified; flip them hostile together.
        fork(
            ALLY_NAMES
                .iter()
                .map(|name| ally(name))
                .chain(ENEMY_NAMES.iter().map(|name| enemy(name)))
                .map(|key| {
                    immediate(move |frame| {
                        let id = frame.ctx.entity(&key)?;
                        frame.world.set_pacifist(id, false);
                        Ok(())
                    })
                })
                .collect(),
        ),
        immediate(|frame| {
            let allies = living_allies(frame);
            let enemies = living_enemies(frame);
            for id in allies {
                let dx = frame.ctx.rng().gen_range(-300.0..=300.0);
                let dy = frame.ctx.rng().gen_range(-300.0..=300.0);
                frame.world.issue_attack_move(id, ENEMY_CAMP.offset(dx, dy));
            }
            for id in enemies {
                let dx = frame.ctx.rng().gen_range(-300.0..=300.0);
                let dy = frame.ctx.rng().gen_range(-300.0..=300.0);
                frame
                    .world
                    .issue_attack_move(id, BATTLE_GROUND.offset(dx, dy));
            }
            Ok(())
        }),
        fork(vec![
            // Mirror the body count into the numeric goal once a second
            // until the last enemy drops.
            seq(vec![
                repeat_while(
                    |frame| Ok(!living_enemies(frame).is_empty()),
                    move |_| {
                        seq(vec![
                            immediate(move |frame| {
                                let living = living_enemies(frame).len() as u32;
                                frame
                                    .goals
                                    .set_value(goal_defeat_enemies, total_enemies - living);
                                Ok(())
                            }),
                            wait(1.0),
                        ])
                    },
                ),
                immediate(move |frame| {
                    frame.goals.set_value(goal_defeat_enemies, total_enemies);
                    frame.goals.complete(goal_defeat_enemies);
                    Ok(())
                }),
            ]),
            // Friendly combo, once everyone has actually engaged. The
            // fight ending early cancels whatever casts remain.
            seq(vec![
                fork(
                    ALLY_NAMES
                        .iter()
                        .map(|name| {
                            let key = ally(name);
                            complete_on_check(
                                move |frame| {
                                    let id = frame.ctx.entity(&key)?;
                                    Ok(frame.world.is_attacking(id))
                                },
                                1.0,
                            )
                        })
                        .collect(),
                ),
                fork_any(vec![
                    complete_on_check(|frame| Ok(living_enemies(frame).is_empty()), 1.0),
                    seq(vec![
                        use_ability(ally("blademaster"), "whirling_steel", AbilityTarget::NoTarget),
                        use_ability(ally("tidecaller"), "tidal_crash", AbilityTarget::NoTarget),
                        wait(2.0),
                        use_ability(
                            ally("hexweaver"),
                            "hex_bolt",
                            AbilityTarget::Unit(enemy("ranger").into()),
                        ),
                    ]),
                ]),
            ]),
            // Enemy answer, same race against the fight ending.
            fork_any(vec![
                complete_on_check(|frame| Ok(living_enemies(frame).is_empty()), 1.0),
                fork(vec![
                    use_ability(
                        enemy("frostmage"),
                        "glacial_barrage",
                        AbilityTarget::Point(BATTLE_GROUND.into()),
                    ),
                    seq(vec![
                        use_ability(
                            enemy("warlock"),
                            "curse_of_embers",
                            AbilityTarget::Unit(ally("tidecaller").into()),
                        ),
                        wait(1.0),
                        use_ability(enemy("shadowpriest"), "dark_mending", AbilityTarget::NoTarget),
                    ]),
                ]),
            ]),
        ]),
        audio_dialog(SCRIPT_VICTORY, ContextKey::FirstGuide),
        // Hand over the recall scroll and wait for the player to try it.
        immediate(move |frame| {
            frame.world.add_item(hero, RECALL_SCROLL);
            frame.world.highlight_ui(RECALL_SLOT_PATH);
            Ok(())
        }),
        audio_dialog(SCRIPT_RECALL_1, ContextKey::SecondGuide),
        audio_dialog(SCRIPT_RECALL_2, ContextKey::FirstGuide),
        fork_any(vec![
            seq(vec![
                audio_dialog(SCRIPT_RECALL_NAG, ContextKey::SecondGuide),
                never_complete(),
            ]),
            seq(vec![
                immediate(move |frame| {
                    frame.goals.start(goal_use_recall);
                    frame.ctx.set_flag(VAR_WAITING_RECALL, true);
                    Ok(())
                }),
                complete_on_check(|frame| Ok(frame.ctx.flag(VAR_USED_RECALL)), 0.1),
            ]),
        ]),
        immediate(move |frame| {
            frame.goals.complete(goal_use_recall);
            frame.world.remove_highlight(RECALL_SLOT_PATH);
            Ok(())
        }),
        audio_dialog(SCRIPT_VOICE_1, ContextKey::FirstGuide),
        audio_dialog(SCRIPT_VOICE_2, ContextKey::SecondGuide),
        fork_any(vec![
            seq(vec![
                audio_dialog(SCRIPT_VOICE_NAG, ContextKey::FirstGuide),
                never_complete(),
            ]),
            seq(vec![
                immediate(move |frame| {
                    frame.goals.start(goal_promise_carry);
                    Ok(())
                }),
                fork_any(vec![
                    seq(vec![
                        wait_for_voice_chat(),
                        immediate(|frame| {
                            frame.ctx.set_flag(VAR_VOICE_USED, true);
                            Ok(())
                        }),
                        audio_dialog(SCRIPT_VOICE_THANKS, ContextKey::FirstGuide),
                    ]),
                    seq(vec![
                        // Give them a good while to take the bait.
                        wait(13.0),
                        complete_on_check(|frame| Ok(!frame.ctx.flag(VAR_VOICE_USED)), 0.1),
                        audio_dialog(SCRIPT_VOICE_SILENT, ContextKey::SecondGuide),
                    ]),
                ]),
            ]),
        ]),
        immediate(move |frame| {
            frame.goals.complete(goal_promise_carry);
            Ok(())
        }),
        // The filter swallowed the raw scroll cast; the script performs
        // the actual trip home.
        immediate(move |frame| {
            frame.world.set_frozen(hero, true);
            frame.world.teleport_unit(hero, FOUNTAIN_LOCATION);
            Ok(())
        }),
        pan_camera_exponential(
            StepArg::from_fn(move |frame| {
                frame
                    .world
                    .unit_position(hero)
                    .ok_or(GraphError::UnknownEntity(hero))
            }),
            FOUNTAIN_LOCATION,
            2.0,
        ),
        complete_on_check(
            move |frame| {
                let at = frame
                    .world
                    .unit_position(hero)
                    .ok_or(GraphError::UnknownEntity(hero))?;
                Ok(at.distance_2d(&FOUNTAIN_LOCATION) < 100.0)
            },
            0.2,
        ),
        immediate(move |frame| {
            dispose_squads(frame.ctx, frame.world);
            frame.world.set_frozen(hero, false);
            Ok(())
        }),
    ]));

    Ok(SectionGraph { goals, root })
}

fn dispose_squads(ctx: &mut TutorialContext, world: &mut dyn GameWorld) {
    for name in ALLY_NAMES {
        let key = ally(name);
        if let Some(id) = ctx.try_entity(&key) {
            world.remove_unit(id);
        }
        ctx.clear_slot(&key);
    }
    for name in ENEMY_NAMES {
        let key = enemy(name);
        if let Some(id) = ctx.try_entity(&key) {
            world.remove_unit(id);
        }
        ctx.clear_slot(&key);
    }
}

fn order_filter(
    ctx: &mut TutorialContext,
    _world: &mut dyn GameWorld,
    order: &PlayerOrder,
) -> OrderVerdict {
    if let OrderKind::UseItem { item, target } = &order.kind {
        if item == RECALL_SCROLL {
            // Record a well-aimed recall while the script waits for one;
            // the raw cast itself never goes through, the script handles
            // the teleport.
            if ctx.flag(VAR_WAITING_RECALL) {
                match target {
                    CastTarget::Point(at)
                        if at.distance_2d(&FOUNTAIN_LOCATION) < RECALL_TARGET_RANGE =>
                    {
                        ctx.set_flag(VAR_USED_RECALL, true);
                        return OrderVerdict::deny_silent();
                    }
                    _ => return OrderVerdict::deny(ERROR_RECALL_TARGET),
                }
            }
            return OrderVerdict::deny_silent();
        }
    }
    OrderVerdict::Allow
}

fn cleanup(ctx: &mut TutorialContext, world: &mut dyn GameWorld) {
    dispose_squads(ctx, world);
    if let Some(hero) = ctx.try_entity(&ContextKey::PlayerHero) {
        world.set_frozen(hero, false);
    }
    world.remove_highlight(RECALL_SLOT_PATH);
    world.set_camera_target(None);
}

/// The team-fight section, ready to drop into a
/// [`crate::core::section::TutorialMachine`].
pub fn section() -> FunctionalSection {
    FunctionalSection::new(SectionName::TeamFight, required_state(), build)
        .with_cleanup(cleanup)
        .with_order_filter(order_filter)
}
