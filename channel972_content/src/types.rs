// Content types shared by the canvas core and its collaborators.
//
// `Frequency` is the four-way thematic tag that classifies tiles, stories,
// comments, and audio timbre. It serializes as its upper-case name
// (`"CHAOS"`, `"CREATION"`, `"CODE"`, `"SOUL"`) so JSON content files and
// replay scripts read naturally.
//
// The presentation metadata on `Frequency` (icon, tone, waveform) is what the
// frequency bar and the audio collaborator need to render a frequency; the
// core never branches on it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four fixed thematic tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Chaos,
    Creation,
    Code,
    Soul,
}

/// Oscillator shape the audio collaborator uses for a frequency's ambient tone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Frequency {
    /// Every frequency, in frequency-bar order.
    pub const ALL: [Frequency; 4] = [
        Frequency::Chaos,
        Frequency::Creation,
        Frequency::Code,
        Frequency::Soul,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Chaos => "CHAOS",
            Frequency::Creation => "CREATION",
            Frequency::Code => "CODE",
            Frequency::Soul => "SOUL",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Frequency::Chaos => "◊",
            Frequency::Creation => "❀",
            Frequency::Code => "◈",
            Frequency::Soul => "●",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Frequency::Chaos => "Electric fractals",
            Frequency::Creation => "Golden mandalas",
            Frequency::Code => "Matrix streams",
            Frequency::Soul => "Ethereal flows",
        }
    }

    /// Base tone in Hz. CHAOS is jittered upward by the audio collaborator;
    /// this is the floor of that range.
    pub fn base_hz(self) -> f32 {
        match self {
            Frequency::Chaos => 220.0,
            Frequency::Creation => 440.0,
            Frequency::Code => 880.0,
            Frequency::Soul => 110.0,
        }
    }

    pub fn waveform(self) -> Waveform {
        match self {
            Frequency::Chaos => Waveform::Sawtooth,
            Frequency::Creation => Waveform::Sine,
            Frequency::Code => Waveform::Square,
            Frequency::Soul => Waveform::Triangle,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the four frequency names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownFrequency(pub String);

impl fmt::Display for UnknownFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown frequency '{}'", self.0)
    }
}

impl std::error::Error for UnknownFrequency {}

impl FromStr for Frequency {
    type Err = UnknownFrequency;

    /// Case-insensitive, so `"soul"` and `"SOUL"` both parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Frequency::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownFrequency(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Static content records
// ---------------------------------------------------------------------------

/// A "972 Stories" narrative shown in the story panel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    pub title: String,
    pub content: String,
    pub location: String,
    pub frequency: Frequency,
    /// ISO-8601 publication time, kept as text; the core never parses it.
    pub timestamp: String,
    pub author: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub resonance_score: f32,
}

impl Story {
    /// First `max_chars` characters of the body followed by an ellipsis, for
    /// thread previews.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut out: String = self.content.chars().take(max_chars).collect();
        out.push_str("...");
        out
    }
}

/// A community comment surfaced as a floating bubble.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub author: String,
    pub timestamp: String,
    /// Quality score in [0, 1]; frequency-filtered bubbles require a minimum.
    pub ai_score: f32,
    pub frequency: Frequency,
}

/// A city on the live map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapLocation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub name_he: String,
    /// Map-relative position in percent.
    pub x: f32,
    pub y: f32,
    pub importance: f32,
    #[serde(default)]
    pub data_stamp: String,
    /// Opening prompt the chat collaborator uses when the city is picked.
    #[serde(default)]
    pub question: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Frequency::Creation).unwrap(), "\"CREATION\"");
        let f: Frequency = serde_json::from_str("\"SOUL\"").unwrap();
        assert_eq!(f, Frequency::Soul);
    }

    #[test]
    fn frequency_from_str_ignores_case() {
        assert_eq!("code".parse::<Frequency>(), Ok(Frequency::Code));
        assert_eq!("CHAOS".parse::<Frequency>(), Ok(Frequency::Chaos));
        assert!("JAZZ".parse::<Frequency>().is_err());
    }

    #[test]
    fn display_matches_wire_name() {
        for f in Frequency::ALL {
            assert_eq!(f.to_string(), f.as_str());
        }
    }

    #[test]
    fn tone_table() {
        assert_eq!(Frequency::Soul.base_hz(), 110.0);
        assert_eq!(Frequency::Code.waveform(), Waveform::Square);
    }

    #[test]
    fn story_preview_truncates_on_char_boundary() {
        let story = Story {
            id: "s".into(),
            title: "t".into(),
            content: "שלום עולם".into(),
            location: "l".into(),
            frequency: Frequency::Soul,
            timestamp: "2024-03-14T09:15:00Z".into(),
            author: "a".into(),
            tags: vec![],
            resonance_score: 1.0,
        };
        assert_eq!(story.preview(4), "שלום...");
    }
}
