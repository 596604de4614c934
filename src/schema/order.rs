/// Player order records — the structured "attempted action" shape the host
/// runtime hands to the active section's order filter before committing it.
use serde::{Deserialize, Serialize};

use super::entity::{EntityId, LocalizationKey, Position};

/// Target of an ability or item cast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CastTarget {
    NoTarget,
    Unit(EntityId),
    Point(Position),
}

/// What the player is trying to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderKind {
    MoveToPosition(Position),
    AttackMove(Position),
    PurchaseItem { item: String },
    UseItem { item: String, target: CastTarget },
    CastAbility { ability: String, target: CastTarget },
    /// Ask the courier to pick up stashed items and bring them over.
    CourierDeliver,
}

/// An order as seen by the filter, before the host commits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerOrder {
    /// Orders issued by scripted units bypass every filter.
    pub issued_by_player: bool,
    /// The unit being ordered, when the order has one.
    pub unit: Option<EntityId>,
    pub kind: OrderKind,
}

impl PlayerOrder {
    pub fn player(unit: EntityId, kind: OrderKind) -> Self {
        PlayerOrder {
            issued_by_player: true,
            unit: Some(unit),
            kind,
        }
    }
}

/// Filter decision. A denial may name a message for the host to display;
/// it never advances or rewinds any step or goal state by itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderVerdict {
    Allow,
    Deny { message: Option<LocalizationKey> },
}

impl OrderVerdict {
    pub fn deny(message: impl Into<LocalizationKey>) -> Self {
        OrderVerdict::Deny {
            message: Some(message.into()),
        }
    }

    pub fn deny_silent() -> Self {
        OrderVerdict::Deny { message: None }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, OrderVerdict::Allow)
    }
}
