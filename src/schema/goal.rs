/// Goal wire shapes — what the UI layer receives on every goal mutation.
use serde::{Deserialize, Serialize};

use super::entity::LocalizationKey;

/// Whether a goal is a simple checkbox or a counted objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalKind {
    Boolean,
    Numeric,
}

/// Display lifecycle of a goal. `Pending` goals are declared but not yet
/// shown as active; `Active` goals are the player's current objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalState {
    Pending,
    Active,
    Complete,
}

/// One entry of the ordered goal snapshot. Numeric goals carry their
/// progress pair; boolean goals leave both values unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalView {
    pub label: LocalizationKey,
    pub kind: GoalKind,
    pub state: GoalState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_value: Option<u32>,
}
