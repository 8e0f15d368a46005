// Fake-clock scenario driver for canvas integration tests.
//
// Wraps a real `CanvasState` with a `RecordingAudioSink` and provides a
// synchronous, test-friendly API: send an input "now", advance the clock,
// and inspect every event and audio call made so far. The only test-specific
// code is the bookkeeping here; every input goes through the same
// `CanvasState::step()` path a live host would use.
//
// See also: `tests/full_session.rs` for the scenarios.

use channel972_core::audio::{AudioCall, RecordingAudioSink};
use channel972_core::command::{CanvasCommand, CanvasInput};
use channel972_core::config::CanvasConfig;
use channel972_core::content::{ContentLibrary, default_library};
use channel972_core::event::{CanvasEvent, CanvasEventKind};
use channel972_core::overlay::OverlaySet;
use channel972_core::types::{Frequency, Tile, TileId};
use channel972_core::{CanvasState, InteractionState};

/// A mounted canvas plus everything it has emitted.
pub struct ScenarioDriver {
    canvas: CanvasState<RecordingAudioSink>,
    events: Vec<CanvasEvent>,
    content: ContentLibrary,
}

impl ScenarioDriver {
    /// Mount a canvas with the default config.
    pub fn new(seed: u64) -> Self {
        Self::from_canvas(CanvasState::new(seed, RecordingAudioSink::new()))
    }

    /// Mount a canvas with `config`. Panics if the config does not validate.
    pub fn with_config(seed: u64, config: CanvasConfig) -> Self {
        let canvas = CanvasState::with_config(seed, config, RecordingAudioSink::new())
            .expect("scenario config must validate");
        Self::from_canvas(canvas)
    }

    fn from_canvas(canvas: CanvasState<RecordingAudioSink>) -> Self {
        Self {
            canvas,
            events: Vec::new(),
            content: default_library(),
        }
    }

    // -----------------------------------------------------------------------
    // Driving
    // -----------------------------------------------------------------------

    pub fn now_ms(&self) -> u64 {
        self.canvas.now_ms()
    }

    /// Apply `input` at the current instant (timers due now fire after it).
    /// Returns the events this produced.
    pub fn send(&mut self, input: CanvasInput) -> &[CanvasEvent] {
        let now = self.now_ms();
        self.run(&[CanvasCommand::new(now, input)], now)
    }

    /// Advance the clock to `target_ms`, firing due timers.
    pub fn advance_to(&mut self, target_ms: u64) -> &[CanvasEvent] {
        self.run(&[], target_ms)
    }

    pub fn advance_by(&mut self, delta_ms: u64) -> &[CanvasEvent] {
        let target = self.now_ms() + delta_ms;
        self.advance_to(target)
    }

    /// Feed a batch of timed commands and run to `target_ms`.
    pub fn run(&mut self, commands: &[CanvasCommand], target_ms: u64) -> &[CanvasEvent] {
        let start = self.events.len();
        let result = self.canvas.step(commands, target_ms);
        self.events.extend(result.events);
        &self.events[start..]
    }

    pub fn unmount(&mut self) -> &[CanvasEvent] {
        let start = self.events.len();
        let result = self.canvas.unmount();
        self.events.extend(result.events);
        &self.events[start..]
    }

    // Shorthands for the common inputs.

    pub fn hover(&mut self, tile_id: &TileId) -> &[CanvasEvent] {
        self.send(CanvasInput::HoverTile {
            tile_id: Some(tile_id.clone()),
        })
    }

    pub fn unhover(&mut self) -> &[CanvasEvent] {
        self.send(CanvasInput::HoverTile { tile_id: None })
    }

    pub fn select(&mut self, tile_id: &TileId) -> &[CanvasEvent] {
        self.send(CanvasInput::SelectTile {
            tile_id: tile_id.clone(),
        })
    }

    pub fn select_frequency(&mut self, frequency: Option<Frequency>) -> &[CanvasEvent] {
        self.send(CanvasInput::SelectFrequency { frequency })
    }

    pub fn pointer(&mut self, x: f64, y: f64) -> &[CanvasEvent] {
        self.send(CanvasInput::PointerMove { x, y })
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Every event emitted since mount.
    pub fn events(&self) -> &[CanvasEvent] {
        &self.events
    }

    /// Timestamps of events matching `pred`.
    pub fn times_of(&self, pred: impl Fn(&CanvasEventKind) -> bool) -> Vec<u64> {
        self.events
            .iter()
            .filter(|e| pred(&e.kind))
            .map(|e| e.at_ms)
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&CanvasEventKind) -> bool) -> usize {
        self.events.iter().filter(|e| pred(&e.kind)).count()
    }

    pub fn snapshot(&self) -> InteractionState {
        self.canvas.snapshot()
    }

    pub fn overlays(&self) -> OverlaySet {
        self.canvas.overlays(&self.content)
    }

    pub fn audio_calls(&self) -> &[AudioCall] {
        self.canvas.audio_sink().calls()
    }

    pub fn pending_timers(&self) -> usize {
        self.canvas.pending_timers()
    }

    pub fn canvas(&self) -> &CanvasState<RecordingAudioSink> {
        &self.canvas
    }

    pub fn tile(&self, tile_id: &TileId) -> Option<&Tile> {
        self.canvas.tiles().get(tile_id)
    }

    /// Number of other tiles sharing `tile_id`'s frequency.
    pub fn same_frequency_count(&self, tile_id: &TileId) -> usize {
        self.tile(tile_id)
            .map_or(0, |t| self.canvas.tiles().same_frequency(t).count())
    }
}
