/// Section identity and required-state descriptors.
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::entity::Position;

#[derive(Debug, Error)]
pub enum RequiredStateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Names of the sections a tutorial is assembled from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionName {
    CourierDelivery,
    TeamFight,
    Custom(String),
}

impl std::fmt::Display for SectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CourierDelivery => f.write_str("courier_delivery"),
            Self::TeamFight => f.write_str("team_fight"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// Declarative world-state precondition for a section. The surrounding
/// runtime establishes this through the world bindings before `start`; the
/// engine itself never enforces it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequiredState {
    #[serde(default)]
    pub hero_location: Option<Position>,
    /// Skip the teleport when the hero is already within this range.
    #[serde(default)]
    pub hero_location_tolerance: f32,
    #[serde(default)]
    pub hero_level: Option<u32>,
    #[serde(default)]
    pub hero_ability_min_levels: Vec<u32>,
    /// Items the hero must carry, by name.
    #[serde(default)]
    pub hero_items: Vec<String>,
    #[serde(default)]
    pub require_first_guide: bool,
    #[serde(default)]
    pub require_second_guide: bool,
    /// Identifiers of terrain blockades that must be up.
    #[serde(default)]
    pub blockades: Vec<String>,
    #[serde(default)]
    pub center_camera_on_hero: bool,
}

impl RequiredState {
    /// Parse a descriptor from RON text.
    pub fn parse_ron(input: &str) -> Result<RequiredState, RequiredStateError> {
        Ok(ron::from_str(input)?)
    }

    /// Load a descriptor from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<RequiredState, RequiredStateError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }
}
