/// Dialog line metadata — durations (and optional caption text) per
/// localization key, loaded from RON content files.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use super::entity::LocalizationKey;

#[derive(Debug, Error)]
pub enum DialogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Playback metadata for one voiced line. The audio itself lives in the
/// host game's asset system; the engine only needs to know how long to hold
/// the step open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogLine {
    pub duration: f32,
    #[serde(default)]
    pub text: String,
}

/// A set of dialog lines keyed by localization key. Libraries merge the way
/// the host stacks content packs: later entries override earlier ones.
#[derive(Debug, Clone, Default)]
pub struct DialogLibrary {
    pub lines: HashMap<LocalizationKey, DialogLine>,
}

impl DialogLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a library from RON text of the shape
    /// `{ "script_key": (duration: 3.5, text: "…") }`.
    pub fn parse_ron(input: &str) -> Result<DialogLibrary, DialogError> {
        let raw: HashMap<String, DialogLine> = ron::from_str(input)?;
        let lines = raw
            .into_iter()
            .map(|(key, line)| (LocalizationKey(key), line))
            .collect();
        Ok(DialogLibrary { lines })
    }

    /// Load a library from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<DialogLibrary, DialogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Merge another library into this one. Entries from `other` win.
    pub fn merge(&mut self, other: DialogLibrary) {
        self.lines.extend(other.lines);
    }

    pub fn insert(&mut self, key: impl Into<LocalizationKey>, duration: f32) {
        self.lines.insert(
            key.into(),
            DialogLine {
                duration,
                text: String::new(),
            },
        );
    }

    pub fn duration(&self, key: &LocalizationKey) -> Option<f32> {
        self.lines.get(key).map(|line| line.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_library_from_ron() {
        let lib = DialogLibrary::parse_ron(
            r#"{
                "script_courier_intro": (duration: 3.5, text: "Time to go shopping."),
                "script_courier_shop": (duration: 2.0),
            }"#,
        )
        .unwrap();

        assert_eq!(lib.lines.len(), 2);
        assert_eq!(
            lib.duration(&LocalizationKey::from("script_courier_intro")),
            Some(3.5)
        );
        assert_eq!(
            lib.duration(&LocalizationKey::from("script_courier_shop")),
            Some(2.0)
        );
        assert_eq!(lib.duration(&LocalizationKey::from("missing")), None);
    }

    #[test]
    fn merge_prefers_newer_entries() {
        let mut base = DialogLibrary::new();
        base.insert("line_a", 1.0);
        base.insert("line_b", 2.0);

        let mut patch = DialogLibrary::new();
        patch.insert("line_b", 5.0);

        base.merge(patch);
        assert_eq!(base.duration(&LocalizationKey::from("line_a")), Some(1.0));
        assert_eq!(base.duration(&LocalizationKey::from("line_b")), Some(5.0));
    }
}
