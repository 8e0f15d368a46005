// Static content for the Channel 972 canvas.
//
// Stories, comments, and map locations are data, not logic. They live in
// `data/channel_content.json` and are parsed into a `ContentLibrary` through
// `ContentLibrary::from_json()` (JSON string in, typed struct out). The
// `default_library()` convenience embeds the shipped file at compile time with
// `include_str!`.
//
// Architecture:
// - `types.rs`: `Frequency`, `Waveform`, `Story`, `Comment`, `MapLocation`.
// - `lib.rs` (this file): `ContentLibrary` and its frequency queries.
//
// Entry order from the JSON file is preserved. Overlay derivation in
// `channel972_core` picks "first matching" records, so file order is part of
// the observable behavior.

pub mod types;

pub use types::{Comment, Frequency, MapLocation, Story, UnknownFrequency, Waveform};

use serde::{Deserialize, Serialize};

/// The shipped content file, embedded at compile time.
const DEFAULT_CONTENT_JSON: &str = include_str!("../data/channel_content.json");

/// Top-level shape of a content file. Every section is optional so partial
/// files (e.g. test fixtures with only comments) still load.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentLibrary {
    #[serde(default)]
    stories: Vec<Story>,
    #[serde(default)]
    comments: Vec<Comment>,
    #[serde(default)]
    locations: Vec<MapLocation>,
}

impl ContentLibrary {
    /// Build a library directly from records, in the given order.
    pub fn new(stories: Vec<Story>, comments: Vec<Comment>, locations: Vec<MapLocation>) -> Self {
        Self {
            stories,
            comments,
            locations,
        }
    }

    /// Parse a library from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn stories(&self) -> &[Story] {
        &self.stories
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn locations(&self) -> &[MapLocation] {
        &self.locations
    }

    /// Stories tagged with `frequency`, in file order.
    pub fn stories_for(&self, frequency: Frequency) -> impl Iterator<Item = &Story> + '_ {
        self.stories.iter().filter(move |s| s.frequency == frequency)
    }

    /// Comments tagged with `frequency`, in file order.
    pub fn comments_for(&self, frequency: Frequency) -> impl Iterator<Item = &Comment> + '_ {
        self.comments.iter().filter(move |c| c.frequency == frequency)
    }

    pub fn location(&self, id: &str) -> Option<&MapLocation> {
        self.locations.iter().find(|l| l.id == id)
    }
}

/// The content shipped with the channel.
///
/// Panics only if the embedded file is malformed, which the crate's tests
/// rule out.
pub fn default_library() -> ContentLibrary {
    match ContentLibrary::from_json(DEFAULT_CONTENT_JSON) {
        Ok(lib) => lib,
        Err(e) => panic!("embedded channel_content.json is invalid: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_library_loads() {
        let lib = default_library();
        assert_eq!(lib.stories().len(), 4);
        assert_eq!(lib.comments().len(), 5);
        assert_eq!(lib.locations().len(), 5);
    }

    #[test]
    fn every_frequency_has_a_story_and_a_comment() {
        let lib = default_library();
        for f in Frequency::ALL {
            assert!(lib.stories_for(f).next().is_some(), "no story for {f}");
            assert!(lib.comments_for(f).next().is_some(), "no comment for {f}");
        }
    }

    #[test]
    fn comments_for_preserves_file_order() {
        let lib = default_library();
        let soul: Vec<&str> = lib
            .comments_for(Frequency::Soul)
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(soul, vec!["c4", "c5"]);
    }

    #[test]
    fn partial_file_loads_with_empty_sections() {
        let lib = ContentLibrary::from_json(r#"{"comments": []}"#).unwrap();
        assert!(lib.stories().is_empty());
        assert!(lib.locations().is_empty());
    }

    #[test]
    fn from_json_rejects_unknown_frequency() {
        let json = r#"{"comments": [{"id": "x", "text": "t", "author": "a",
            "timestamp": "now", "ai_score": 0.9, "frequency": "JAZZ"}]}"#;
        assert!(ContentLibrary::from_json(json).is_err());
    }

    #[test]
    fn location_lookup() {
        let lib = default_library();
        assert_eq!(lib.location("haifa").map(|l| l.name.as_str()), Some("Haifa"));
        assert!(lib.location("atlantis").is_none());
    }
}
