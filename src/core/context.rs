/// Tutorial context — the shared registry of live entity handles and
/// section-scoped scalars threaded through a running step tree.
use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::entity::{EntityId, Position};

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("context key not set: {0:?}")]
    Missing(ContextKey),
    #[error("context key {key:?} holds a {found}, expected a {expected}")]
    WrongKind {
        key: ContextKey,
        expected: &'static str,
        found: &'static str,
    },
}

/// The closed set of slots a section graph may reference. Slots are written
/// once by spawn/setup steps and only read afterwards; reading a slot that
/// was never populated is a programming error and aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextKey {
    PlayerHero,
    PlayerCourier,
    /// The first of the two narrator NPCs that walk the player through a
    /// tutorial (the banter pair in the stock sections).
    FirstGuide,
    SecondGuide,
    /// A scripted companion, keyed by its unit name.
    Ally(String),
    /// A scripted opponent, keyed by its unit name.
    Enemy(String),
}

/// Value stored in a context slot or section variable.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    Entity(EntityId),
    Number(f64),
    Flag(bool),
    Position(Position),
}

impl ContextValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Entity(_) => "entity",
            Self::Number(_) => "number",
            Self::Flag(_) => "flag",
            Self::Position(_) => "position",
        }
    }
}

/// Created at tutorial start, torn down with it. Entity slots persist
/// across sections (the guides stay spawned); `vars` is the section-scoped
/// scratch space shared between a section's step tree and its order filter,
/// cleared every time a section starts.
#[derive(Debug)]
pub struct TutorialContext {
    slots: FxHashMap<ContextKey, ContextValue>,
    vars: FxHashMap<String, ContextValue>,
    rng: StdRng,
}

impl TutorialContext {
    pub fn new(seed: u64) -> Self {
        TutorialContext {
            slots: FxHashMap::default(),
            vars: FxHashMap::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    // -- entity slots -------------------------------------------------------

    pub fn set_entity(&mut self, key: ContextKey, id: EntityId) {
        self.slots.insert(key, ContextValue::Entity(id));
    }

    pub fn entity(&self, key: &ContextKey) -> Result<EntityId, ContextError> {
        match self.slots.get(key) {
            Some(ContextValue::Entity(id)) => Ok(*id),
            Some(other) => Err(ContextError::WrongKind {
                key: key.clone(),
                expected: "entity",
                found: other.kind(),
            }),
            None => Err(ContextError::Missing(key.clone())),
        }
    }

    pub fn try_entity(&self, key: &ContextKey) -> Option<EntityId> {
        match self.slots.get(key) {
            Some(ContextValue::Entity(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn clear_slot(&mut self, key: &ContextKey) {
        self.slots.remove(key);
    }

    /// Entity slots matching a predicate, in no particular order.
    pub fn entities_where<F>(&self, mut pred: F) -> Vec<EntityId>
    where
        F: FnMut(&ContextKey) -> bool,
    {
        self.slots
            .iter()
            .filter_map(|(key, value)| match value {
                ContextValue::Entity(id) if pred(key) => Some(*id),
                _ => None,
            })
            .collect()
    }

    // -- section variables --------------------------------------------------

    pub fn set_flag(&mut self, name: &str, value: bool) {
        self.vars.insert(name.to_string(), ContextValue::Flag(value));
    }

    /// Section flags default to false when unset; unlike entity slots they
    /// are plain policy state, not handles.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.vars.get(name), Some(ContextValue::Flag(true)))
    }

    pub fn set_count(&mut self, name: &str, value: f64) {
        self.vars.insert(name.to_string(), ContextValue::Number(value));
    }

    pub fn count(&self, name: &str) -> f64 {
        match self.vars.get(name) {
            Some(ContextValue::Number(n)) => *n,
            _ => 0.0,
        }
    }

    pub fn bump(&mut self, name: &str) -> f64 {
        let next = self.count(name) + 1.0;
        self.set_count(name, next);
        next
    }

    /// Wipe section-scoped variables. Called by the runtime whenever a
    /// section starts so no policy flag leaks between sections.
    pub fn clear_vars(&mut self) {
        self.vars.clear();
    }

    // -- randomness ---------------------------------------------------------

    /// Seeded generator for content-level jitter (spawn spreads and the
    /// like). Reseeded only when the whole context is rebuilt.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

impl Default for TutorialContext {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn entity_slot_roundtrip() {
        let mut ctx = TutorialContext::new(1);
        ctx.set_entity(ContextKey::PlayerHero, EntityId(11));
        assert_eq!(ctx.entity(&ContextKey::PlayerHero).unwrap(), EntityId(11));
        assert_eq!(ctx.try_entity(&ContextKey::PlayerHero), Some(EntityId(11)));
    }

    #[test]
    fn missing_slot_is_an_error() {
        let ctx = TutorialContext::new(1);
        let err = ctx.entity(&ContextKey::PlayerCourier).unwrap_err();
        assert!(matches!(err, ContextError::Missing(ContextKey::PlayerCourier)));
    }

    #[test]
    fn flags_default_false_and_clear_with_vars() {
        let mut ctx = TutorialContext::new(1);
        assert!(!ctx.flag("must_buy_blade"));
        ctx.set_flag("must_buy_blade", true);
        assert!(ctx.flag("must_buy_blade"));

        ctx.set_entity(ContextKey::FirstGuide, EntityId(2));
        ctx.clear_vars();
        assert!(!ctx.flag("must_buy_blade"));
        // Entity slots survive a section handover.
        assert!(ctx.try_entity(&ContextKey::FirstGuide).is_some());
    }

    #[test]
    fn counters_bump() {
        let mut ctx = TutorialContext::new(1);
        assert_eq!(ctx.count("items_bought"), 0.0);
        ctx.bump("items_bought");
        ctx.bump("items_bought");
        assert_eq!(ctx.count("items_bought"), 2.0);
    }

    #[test]
    fn entities_where_filters_by_key() {
        let mut ctx = TutorialContext::new(1);
        ctx.set_entity(ContextKey::Ally("blademaster".into()), EntityId(1));
        ctx.set_entity(ContextKey::Enemy("frostmage".into()), EntityId(2));
        ctx.set_entity(ContextKey::Enemy("warlock".into()), EntityId(3));

        let enemies = ctx.entities_where(|k| matches!(k, ContextKey::Enemy(_)));
        assert_eq!(enemies.len(), 2);
    }

    #[test]
    fn rng_is_deterministic_per_seed() {
        let mut a = TutorialContext::new(42);
        let mut b = TutorialContext::new(42);
        let x: f32 = a.rng().gen();
        let y: f32 = b.rng().gen();
        assert_eq!(x, y);
    }
}
