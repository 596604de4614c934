use serde::{Deserialize, Serialize};

/// Newtype wrapper for live unit/entity handles handed out by the game world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Which side of a scripted fight a unit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Friendly,
    Enemy,
    Neutral,
}

/// A key into the localization tables kept outside this crate. The engine
/// only ever routes these keys; it never renders text itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalizationKey(pub String);

impl LocalizationKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LocalizationKey {
    fn from(s: &str) -> Self {
        LocalizationKey(s.to_string())
    }
}

impl std::fmt::Display for LocalizationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A world-space position. Sections author positions in the same units the
/// host engine uses; `z` rides along for terrain-aware content.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Position { x, y, z }
    }

    /// Distance ignoring the vertical axis, which is how arrival checks and
    /// location goals are measured.
    pub fn distance_2d(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Position {
        Position::new(self.x + dx, self.y + dy, self.z)
    }
}
