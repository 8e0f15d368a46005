// Core types shared across the canvas.
//
// Defines tile identity and geometry (`TileId`, `Tile`, `Point`), the
// cinematic `TransitionPhase`, the recalibration state, and siren kinds.
// `Frequency` is re-exported from `channel972_content` so callers of this
// crate rarely need to depend on the content crate directly.
//
// All coordinates on `Tile` and `Point` are canvas percentages (0..100).
// Pointer samples and the viewport are in device pixels; only
// `transition.rs` deals in pixels.

pub use channel972_content::Frequency;

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Tiles
// ---------------------------------------------------------------------------

/// Identifier of a tile, `"tile-<index>"` for generated tiles.
///
/// Inbound inputs carry arbitrary strings, so a `TileId` is not proof that a
/// tile exists; lookups go through `TileField::get`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub String);

impl TileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id generated for the tile at `index`.
    pub fn for_index(index: usize) -> Self {
        Self(format!("tile-{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TileId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A point in canvas percent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamp both coordinates into the closed band `[low, high]`.
    pub fn clamped(self, (low, high): (f64, f64)) -> Self {
        Self {
            x: self.x.clamp(low, high),
            y: self.y.clamp(low, high),
        }
    }
}

/// One explorable node on the canvas. Immutable once generated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    /// Top-left corner, canvas percent.
    pub x: f64,
    pub y: f64,
    /// Size, canvas percent.
    pub width: f64,
    pub height: f64,
    pub frequency: Frequency,
    /// Display label, `NODE_` plus the zero-padded index.
    pub metadata: String,
}

impl Tile {
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// The hover context string handed to the chat collaborator,
    /// e.g. `"CODE - NODE_005"`.
    pub fn context(&self) -> String {
        format!("{} - {}", self.frequency, self.metadata)
    }

    /// Stereo pan for ambient audio: -1 at the left edge, +1 at the right.
    pub fn pan(&self) -> f64 {
        ((self.x - 50.0) / 50.0).clamp(-1.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// State-machine enums
// ---------------------------------------------------------------------------

/// Phase of the cinematic transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionPhase {
    /// Grid is interactive; nothing selected.
    #[default]
    Idle,
    /// Other tiles recede.
    DollyOut,
    /// The selected tile grows to fill the view.
    ZoomIn,
    /// Held full-view state; edge proximity is tracked.
    Immersive,
    /// Timed zoom-out back to the grid, driven by `exit_progress`.
    OrganicExit,
}

impl TransitionPhase {
    pub fn is_idle(self) -> bool {
        self == TransitionPhase::Idle
    }
}

/// Recalibration lock state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecalibrationState {
    #[default]
    Stable,
    Recalibrating,
}

/// Alarm sirens the audio collaborator can play over the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SirenKind {
    /// Rising and falling shelter-in-place alarm.
    Shelter,
    /// Steady memorial tone.
    Memorial,
}
