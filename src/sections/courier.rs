//! Courier section — buy items at the hidden shop, then let the courier
//! deliver the rest: guided movement, UI-highlighted purchases, a delivery
//! request, and a final repositioning, with an order filter that keeps the
//! player on script the whole way.

use crate::core::context::{ContextKey, TutorialContext};
use crate::core::goals::GoalTracker;
use crate::core::leaves::{audio_dialog, go_to_location, set_camera_target};
use crate::core::section::{FunctionalSection, SectionGraph};
use crate::core::step::{
    complete_on_check, fork_any, immediate, never_complete, seq, wait, with_goals, GraphError,
    StepArg,
};
use crate::core::world::GameWorld;
use crate::schema::entity::Position;
use crate::schema::order::{OrderKind, OrderVerdict, PlayerOrder};
use crate::schema::section::{RequiredState, SectionName};

// Items. The blade is stocked at the hidden shop; the components are
// remote purchases that sit in the stash until the courier brings them,
// combining into the finished edge.
pub const KEYSTONE_BLADE: &str = "keystone_blade";
pub const FLUX_CRYSTAL: &str = "flux_crystal";
pub const BINDING_RUNE: &str = "binding_rune";
pub const STARFORGED_EDGE: &str = "starforged_edge";
pub const ALLOWED_COMPONENTS: &[&str] = &[FLUX_CRYSTAL, BINDING_RUNE];

// Locations.
pub const SECRET_SHOP_LOCATION: Position = Position::new(-5082.0, 2011.0, 128.0);
pub const SHOP_FRONT_LOCATION: Position = Position::new(-4840.0, 1822.0, 128.0);
const RIVER_CROSSING: Position = Position::new(-3930.0, 2480.0, 0.0);
const SHOP_RAMP: Position = Position::new(-4380.0, 2020.0, 128.0);
const FAR_RAMP: Position = Position::new(-3675.0, 3400.0, 128.0);
pub const FINAL_POSITION: Position = Position::new(-3538.0, 3861.0, 128.0);

// UI paths highlighted while the matching goal is active.
pub const SHOP_BUTTON_PATH: &str = "lower_hud/shop_launcher/shop_button";
pub const BLADE_GUIDE_PATH: &str = "shop/guide/keystone_blade";
pub const COMPONENTS_GUIDE_PATH: &str = "shop/guide/starforged_edge";
pub const DELIVER_BUTTON_PATH: &str = "lower_hud/courier_controls/deliver_items_button";

// Goal labels.
pub const GOAL_REACH_SHOP: &str = "goal_courier_reach_shop";
pub const GOAL_OPEN_SHOP: &str = "goal_courier_open_shop";
pub const GOAL_BUY_BLADE: &str = "goal_courier_buy_blade";
pub const GOAL_BUY_COMPONENTS: &str = "goal_courier_buy_components";
pub const GOAL_REQUEST_DELIVERY: &str = "goal_courier_request_delivery";
pub const GOAL_WAIT_DELIVERY: &str = "goal_courier_wait_delivery";
pub const GOAL_FINAL_POSITION: &str = "goal_courier_final_position";

// Dialog lines.
pub const SCRIPT_INTRO_1: &str = "script_courier_intro_1";
pub const SCRIPT_INTRO_2: &str = "script_courier_intro_2";
pub const SCRIPT_SHOP_DIRECTIONS: &str = "script_courier_shop_directions";
pub const SCRIPT_SHOP_ARRIVAL: &str = "script_courier_shop_arrival";
pub const SCRIPT_COMPONENTS: &str = "script_courier_components";
pub const SCRIPT_DELIVERY_1: &str = "script_courier_delivery_1";
pub const SCRIPT_DELIVERY_2: &str = "script_courier_delivery_2";
pub const SCRIPT_DELIVERY_3: &str = "script_courier_delivery_3";
pub const SCRIPT_DELIVERED_1: &str = "script_courier_delivered_1";
pub const SCRIPT_DELIVERED_2: &str = "script_courier_delivered_2";
pub const SCRIPT_FINAL_DIRECTIONS: &str = "script_courier_final_directions";

/// Every voiced line this section plays, for content lints.
pub const DIALOG_KEYS: &[&str] = &[
    SCRIPT_INTRO_1,
    SCRIPT_INTRO_2,
    SCRIPT_SHOP_DIRECTIONS,
    SCRIPT_SHOP_ARRIVAL,
    SCRIPT_COMPONENTS,
    SCRIPT_DELIVERY_1,
    SCRIPT_DELIVERY_2,
    SCRIPT_DELIVERY_3,
    SCRIPT_DELIVERED_1,
    SCRIPT_DELIVERED_2,
    SCRIPT_FINAL_DIRECTIONS,
];

// Error messages surfaced by the order filter.
pub const ERROR_BUY_BLADE: &str = "error_courier_buy_blade";
pub const ERROR_BUY_COMPONENTS: &str = "error_courier_buy_components";
pub const ERROR_REQUEST_DELIVERY: &str = "error_courier_request_delivery";

// Filter state, shared between the graph and the filter through the
// section-scoped context vars.
const VAR_MUST_BUY_BLADE: &str = "courier_must_buy_blade";
const VAR_BOUGHT_BLADE: &str = "courier_bought_blade";
const VAR_MUST_BUY_COMPONENTS: &str = "courier_must_buy_components";
const VAR_COMPONENTS_BOUGHT: &str = "courier_components_bought";
const VAR_MUST_DELIVER: &str = "courier_must_deliver";
const VAR_DELIVERY_REQUESTED: &str = "courier_delivery_requested";

fn bought_var(item: &str) -> String {
    format!("courier_bought_{item}")
}

pub fn required_state() -> RequiredState {
    RequiredState {
        hero_location: Some(Position::new(-4941.0, 5874.0, 128.0)),
        // Generous so we never yank back a player who wandered nearby.
        hero_location_tolerance: 1800.0,
        hero_level: Some(6),
        hero_ability_min_levels: vec![1, 1, 1, 1],
        require_first_guide: true,
        require_second_guide: true,
        blockades: vec![
            "jungle_stairs".to_string(),
            "base_divider".to_string(),
            "river_cliff".to_string(),
        ],
        center_camera_on_hero: true,
        ..RequiredState::default()
    }
}

fn build(
    ctx: &mut TutorialContext,
    _world: &mut dyn GameWorld,
) -> Result<SectionGraph, GraphError> {
    let hero = ctx.entity(&ContextKey::PlayerHero)?;
    ctx.entity(&ContextKey::PlayerCourier)?;

    let mut goals = GoalTracker::new();
    let goal_reach_shop = goals.add_boolean(GOAL_REACH_SHOP);
    let goal_open_shop = goals.add_boolean(GOAL_OPEN_SHOP);
    let goal_buy_blade = goals.add_boolean(GOAL_BUY_BLADE);
    let goal_buy_components = goals.add_boolean(GOAL_BUY_COMPONENTS);
    let goal_request_delivery = goals.add_boolean(GOAL_REQUEST_DELIVERY);
    let goal_wait_delivery = goals.add_boolean(GOAL_WAIT_DELIVERY);
    let goal_final_position = goals.add_boolean(GOAL_FINAL_POSITION);

    let root = with_goals(seq(vec![
        audio_dialog(SCRIPT_INTRO_1, ContextKey::FirstGuide),
        audio_dialog(SCRIPT_INTRO_2, ContextKey::SecondGuide),
        immediate(|frame| {
            frame.world.minimap_ping(SECRET_SHOP_LOCATION, 5.0);
            Ok(())
        }),
        // The shop-directions line races the player's own movement:
        // whichever finishes first silences the other branch.
        fork_any(vec![
            seq(vec![
                audio_dialog(SCRIPT_SHOP_DIRECTIONS, ContextKey::FirstGuide),
                never_complete(),
            ]),
            seq(vec![
                // Small grace so the marker doesn't collide with the ping.
                wait(3.0),
                immediate(move |frame| {
                    frame.goals.start(goal_reach_shop);
                    Ok(())
                }),
                go_to_location(
                    SHOP_FRONT_LOCATION,
                    vec![RIVER_CROSSING, SHOP_RAMP],
                    ContextKey::PlayerHero,
                ),
            ]),
        ]),
        immediate(move |frame| {
            frame.goals.complete(goal_reach_shop);
            Ok(())
        }),
        // Not forked: the line only names the blade at its very end, and
        // highlighting early just confuses people.
        audio_dialog(SCRIPT_SHOP_ARRIVAL, ContextKey::SecondGuide),
        immediate(move |frame| {
            frame.world.highlight_ui(SHOP_BUTTON_PATH);
            frame.goals.start(goal_open_shop);
            Ok(())
        }),
        complete_on_check(|frame| Ok(frame.world.shop_open()), 0.2),
        immediate(move |frame| {
            frame.world.remove_highlight(SHOP_BUTTON_PATH);
            frame.goals.complete(goal_open_shop);
            frame.goals.start(goal_buy_blade);
            frame.world.set_gold(hero, 5150);
            frame.ctx.set_flag(VAR_MUST_BUY_BLADE, true);
            frame.world.highlight_ui(BLADE_GUIDE_PATH);
            Ok(())
        }),
        complete_on_check(move |frame| Ok(frame.world.has_item(hero, KEYSTONE_BLADE)), 0.2),
        immediate(move |frame| {
            frame.ctx.set_flag(VAR_MUST_BUY_BLADE, false);
            frame.world.remove_highlight(BLADE_GUIDE_PATH);
            frame.goals.complete(goal_buy_blade);
            Ok(())
        }),
        fork_any(vec![
            seq(vec![
                audio_dialog(SCRIPT_COMPONENTS, ContextKey::FirstGuide),
                never_complete(),
            ]),
            seq(vec![
                immediate(move |frame| {
                    frame.ctx.set_flag(VAR_MUST_BUY_COMPONENTS, true);
                    frame.world.highlight_ui(COMPONENTS_GUIDE_PATH);
                    frame.goals.start(goal_buy_components);
                    Ok(())
                }),
                complete_on_check(
                    |frame| {
                        Ok(frame.ctx.count(VAR_COMPONENTS_BOUGHT)
                            >= ALLOWED_COMPONENTS.len() as f64)
                    },
                    0.2,
                ),
            ]),
        ]),
        immediate(move |frame| {
            frame.goals.complete(goal_buy_components);
            frame.world.remove_highlight(COMPONENTS_GUIDE_PATH);
            frame.ctx.set_flag(VAR_MUST_BUY_COMPONENTS, false);
            Ok(())
        }),
        // Delivery-button banter races the player actually pressing it.
        fork_any(vec![
            seq(vec![
                audio_dialog(SCRIPT_DELIVERY_1, ContextKey::SecondGuide),
                audio_dialog(SCRIPT_DELIVERY_2, ContextKey::SecondGuide),
                immediate(|frame| {
                    frame.world.highlight_ui(DELIVER_BUTTON_PATH);
                    Ok(())
                }),
                audio_dialog(SCRIPT_DELIVERY_3, ContextKey::FirstGuide),
                never_complete(),
            ]),
            seq(vec![
                immediate(move |frame| {
                    frame.ctx.set_flag(VAR_MUST_DELIVER, true);
                    frame.goals.start(goal_request_delivery);
                    Ok(())
                }),
                complete_on_check(|frame| Ok(frame.ctx.flag(VAR_DELIVERY_REQUESTED)), 0.2),
            ]),
        ]),
        immediate(move |frame| {
            frame.goals.complete(goal_request_delivery);
            frame.goals.start(goal_wait_delivery);
            frame.ctx.set_flag(VAR_MUST_DELIVER, false);
            frame.world.remove_highlight(DELIVER_BUTTON_PATH);
            frame.world.set_frozen(hero, true);
            Ok(())
        }),
        set_camera_target(Some(ContextKey::PlayerCourier.into())),
        complete_on_check(move |frame| Ok(frame.world.has_item(hero, STARFORGED_EDGE)), 0.2),
        immediate(move |frame| {
            frame.world.set_frozen(hero, false);
            frame.goals.complete(goal_wait_delivery);
            Ok(())
        }),
        set_camera_target(None),
        audio_dialog(SCRIPT_DELIVERED_1, ContextKey::SecondGuide),
        audio_dialog(SCRIPT_DELIVERED_2, ContextKey::FirstGuide),
        fork_any(vec![
            seq(vec![
                audio_dialog(SCRIPT_FINAL_DIRECTIONS, ContextKey::FirstGuide),
                never_complete(),
            ]),
            seq(vec![
                immediate(move |frame| {
                    frame.goals.start(goal_final_position);
                    Ok(())
                }),
                go_to_location(
                    FINAL_POSITION,
                    StepArg::from_fn(move |frame| {
                        let at = frame
                            .world
                            .unit_position(hero)
                            .ok_or(GraphError::UnknownEntity(hero))?;
                        // Route around the cliff when still down in the river.
                        if at.z < 10.0 {
                            Ok(vec![RIVER_CROSSING, FAR_RAMP])
                        } else {
                            Ok(vec![SHOP_RAMP, RIVER_CROSSING, FAR_RAMP])
                        }
                    }),
                    ContextKey::PlayerHero,
                ),
            ]),
        ]),
        immediate(move |frame| {
            frame.goals.complete(goal_final_position);
            Ok(())
        }),
    ]));

    Ok(SectionGraph { goals, root })
}

fn order_filter(
    ctx: &mut TutorialContext,
    _world: &mut dyn GameWorld,
    order: &PlayerOrder,
) -> OrderVerdict {
    if ctx.flag(VAR_MUST_BUY_BLADE) {
        if ctx.flag(VAR_BOUGHT_BLADE) {
            return OrderVerdict::deny_silent();
        }
        return match &order.kind {
            OrderKind::MoveToPosition(_) => OrderVerdict::Allow,
            OrderKind::PurchaseItem { item } if item == KEYSTONE_BLADE => {
                ctx.set_flag(VAR_BOUGHT_BLADE, true);
                OrderVerdict::Allow
            }
            _ => OrderVerdict::deny(ERROR_BUY_BLADE),
        };
    }

    if ctx.flag(VAR_MUST_BUY_COMPONENTS) {
        return match &order.kind {
            OrderKind::MoveToPosition(_) => OrderVerdict::Allow,
            OrderKind::PurchaseItem { item } => {
                if !ALLOWED_COMPONENTS.contains(&item.as_str()) {
                    return OrderVerdict::deny(ERROR_BUY_COMPONENTS);
                }
                let bought = bought_var(item);
                if ctx.flag(&bought) {
                    return OrderVerdict::deny(ERROR_BUY_COMPONENTS);
                }
                ctx.set_flag(&bought, true);
                ctx.bump(VAR_COMPONENTS_BOUGHT);
                OrderVerdict::Allow
            }
            _ => OrderVerdict::deny(ERROR_BUY_COMPONENTS),
        };
    }

    if ctx.flag(VAR_MUST_DELIVER) {
        return match &order.kind {
            OrderKind::MoveToPosition(_) => OrderVerdict::Allow,
            OrderKind::CourierDeliver => {
                ctx.set_flag(VAR_DELIVERY_REQUESTED, true);
                OrderVerdict::Allow
            }
            _ => OrderVerdict::deny(ERROR_REQUEST_DELIVERY),
        };
    }

    OrderVerdict::Allow
}

fn cleanup(ctx: &mut TutorialContext, world: &mut dyn GameWorld) {
    // A skipped run may leave items in flight; drop them so the next
    // section starts from a clean slate.
    if let Some(courier) = ctx.try_entity(&ContextKey::PlayerCourier) {
        world.clear_inventory(courier);
    }
    if let Some(hero) = ctx.try_entity(&ContextKey::PlayerHero) {
        world.clear_stash(hero);
        world.set_frozen(hero, false);
    }
    world.remove_highlight(SHOP_BUTTON_PATH);
    world.remove_highlight(BLADE_GUIDE_PATH);
    world.remove_highlight(COMPONENTS_GUIDE_PATH);
    world.remove_highlight(DELIVER_BUTTON_PATH);
    world.set_camera_target(None);
}

/// The courier section, ready to drop into a
/// [`crate::core::section::TutorialMachine`].
pub fn section() -> FunctionalSection {
    FunctionalSection::new(SectionName::CourierDelivery, required_state(), build)
        .with_cleanup(cleanup)
        .with_order_filter(order_filter)
}
