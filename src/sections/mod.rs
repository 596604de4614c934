//! Built-in narrative sections. Each module wires the step combinators and
//! domain leaves into one self-contained scripted sequence and exports a
//! [`crate::core::section::FunctionalSection`] factory plus the keys its
//! content references.

pub mod courier;
pub mod team_fight;

use rand::Rng;

use crate::core::context::ContextKey;
use crate::core::step::{immediate, BoxedStep, Frame};
use crate::schema::entity::{EntityId, Position, Team};

/// Squad members written into context slots by [`spawn_squad`] and still
/// alive in the world.
pub fn living_squad(frame: &Frame<'_>, team: Team) -> Vec<EntityId> {
    frame
        .ctx
        .entities_where(|key| match team {
            Team::Friendly => matches!(key, ContextKey::Ally(_)),
            Team::Enemy => matches!(key, ContextKey::Enemy(_)),
            Team::Neutral => false,
        })
        .into_iter()
        .filter(|id| frame.world.unit_alive(*id))
        .collect()
}

pub fn living_enemies(frame: &Frame<'_>) -> Vec<EntityId> {
    living_squad(frame, Team::Enemy)
}

pub fn living_allies(frame: &Frame<'_>) -> Vec<EntityId> {
    living_squad(frame, Team::Friendly)
}

/// Spawn a named squad around a point with a little positional jitter,
/// pacified until the section decides the fight starts. Each member lands
/// in its `Ally`/`Enemy` context slot before any later step can read it.
pub fn spawn_squad(names: &'static [&'static str], team: Team, around: Position, spread: f32) -> BoxedStep {
    immediate(move |frame| {
        for name in names {
            let dx = frame.ctx.rng().gen_range(-spread..=spread);
            let dy = frame.ctx.rng().gen_range(-spread..=spread);
            let id = frame.world.spawn_unit(name, around.offset(dx, dy), team);
            frame.world.set_pacifist(id, true);
            let key = match team {
                Team::Friendly => ContextKey::Ally((*name).to_string()),
                _ => ContextKey::Enemy((*name).to_string()),
            };
            frame.ctx.set_entity(key, id);
        }
        Ok(())
    })
}
