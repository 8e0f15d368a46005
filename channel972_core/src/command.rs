// Inbound inputs to the canvas.
//
// Every external influence on canvas state arrives as a `CanvasCommand`: a
// `CanvasInput` stamped with the canvas time it applies at. The canvas is a
// function `(state, commands) -> (new_state, events)`; internal changes come
// only from timers (see `event.rs`).
//
// Inputs map onto the collaborators around the canvas:
// - Tile grid: `HoverTile`, `SelectTile`.
// - Frequency bar: `SelectFrequency`.
// - Immersive view: `PointerMove`, `ExitImmersion`, `Deactivate`, `Resize`.
// - Chat affordance: `ResonanceQuery` (forwarded as an outbound event).
// - Map: `MapTileRequest` (treated as a selection), `MapLocationSelected`.
// - Comment bubbles: `DismissComment`.
// - Alarm control: `TriggerSiren`.
// - Host: `Unmount`.
//
// `ReplayScript` bundles a seed and a command list for headless runs (see
// `src/bin/replay.rs`).
//
// See also: `canvas.rs` for `CanvasState::apply_input()`, which dispatches
// these.

use crate::error::ChannelResult;
use crate::types::{Frequency, SirenKind, TileId};
use serde::{Deserialize, Serialize};

/// An input applied at a specific canvas time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasCommand {
    pub at_ms: u64,
    pub input: CanvasInput,
}

impl CanvasCommand {
    pub fn new(at_ms: u64, input: CanvasInput) -> Self {
        Self { at_ms, input }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanvasInput {
    /// Frequency-bar filter change; `None` clears the filter.
    SelectFrequency { frequency: Option<Frequency> },
    /// Click on a tile.
    SelectTile { tile_id: TileId },
    /// Pointer entered a tile (`Some`) or left the grid (`None`).
    HoverTile { tile_id: Option<TileId> },
    /// Pointer sample in viewport px.
    PointerMove { x: f64, y: f64 },
    /// The "exit immersion" control.
    ExitImmersion,
    /// The host dropped the active flag; snap back to the grid.
    Deactivate,
    Resize { width: f64, height: f64 },
    TriggerSiren { kind: SirenKind },
    ResonanceQuery { query: String },
    MapTileRequest { tile_id: TileId },
    MapLocationSelected { location_id: String },
    DismissComment { comment_id: String },
    Unmount,
}

/// A recorded session: mount with `seed`, feed `commands`, run to `until_ms`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayScript {
    pub seed: u64,
    /// Defaults to the last command time.
    #[serde(default)]
    pub until_ms: Option<u64>,
    #[serde(default)]
    pub commands: Vec<CanvasCommand>,
}

impl ReplayScript {
    pub fn from_json(json: &str) -> ChannelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Time the replay runs to.
    pub fn end_ms(&self) -> u64 {
        self.until_ms
            .unwrap_or_else(|| self.commands.iter().map(|c| c.at_ms).max().unwrap_or(0))
    }
}
