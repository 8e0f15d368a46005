// Ambient audio coordination.
//
// The canvas never synthesizes sound. It drives an injected `AudioSink`
// capability: one ambient tone that follows the hovered tile (pitched by
// frequency, panned by horizontal position) and at most one alarm siren.
//
// `AmbientAudio::sync()` is a reconciliation step: given the currently
// hovered tile it issues whatever stop/play calls bring the sink in line with
// "ambient plays the hovered tile unless a siren is sounding". The canvas
// calls it after every input and timer, so hover bookkeeping lives in one
// place (`HoverController`) and audio simply follows.
//
// A siren silences ambient for its whole lifetime (tone plus fade). A second
// trigger while one is sounding is ignored. When the siren ends, ambient
// resumes on whatever tile is hovered at that moment.

use crate::event::{CanvasEventKind, StepContext, TimerHandle, TimerKind, TimerQueue, TimerSlot};
use crate::types::{Frequency, SirenKind, Tile, TileId};
use serde::{Deserialize, Serialize};

/// Audio output capability, injected at canvas construction.
pub trait AudioSink {
    /// Start (or replace) the ambient tone for `tile_id`.
    fn play_ambient(&mut self, tile_id: &TileId, frequency: Frequency, pan: f64);
    fn stop_ambient(&mut self);
    fn play_siren(&mut self, kind: SirenKind);
    fn stop_siren(&mut self);
}

/// Sink that discards every call. Used by the headless replay tool.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentAudioSink;

impl AudioSink for SilentAudioSink {
    fn play_ambient(&mut self, _tile_id: &TileId, _frequency: Frequency, _pan: f64) {}
    fn stop_ambient(&mut self) {}
    fn play_siren(&mut self, _kind: SirenKind) {}
    fn stop_siren(&mut self) {}
}

/// One call made on an `AudioSink`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum AudioCall {
    PlayAmbient {
        tile_id: TileId,
        frequency: Frequency,
        pan: f64,
    },
    StopAmbient,
    PlaySiren { kind: SirenKind },
    StopSiren,
}

/// Sink that records every call in order, for tests.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordingAudioSink {
    calls: Vec<AudioCall>,
}

impl RecordingAudioSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[AudioCall] {
        &self.calls
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl AudioSink for RecordingAudioSink {
    fn play_ambient(&mut self, tile_id: &TileId, frequency: Frequency, pan: f64) {
        self.calls.push(AudioCall::PlayAmbient {
            tile_id: tile_id.clone(),
            frequency,
            pan,
        });
    }

    fn stop_ambient(&mut self) {
        self.calls.push(AudioCall::StopAmbient);
    }

    fn play_siren(&mut self, kind: SirenKind) {
        self.calls.push(AudioCall::PlaySiren { kind });
    }

    fn stop_siren(&mut self) {
        self.calls.push(AudioCall::StopSiren);
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct AmbientAudio<A: AudioSink> {
    sink: A,
    /// Tile whose ambient tone is currently playing.
    ambient: Option<TileId>,
    siren: Option<SirenKind>,
    siren_timer: TimerSlot,
}

impl<A: AudioSink> AmbientAudio<A> {
    pub fn new(sink: A) -> Self {
        Self {
            sink,
            ambient: None,
            siren: None,
            siren_timer: TimerSlot::default(),
        }
    }

    pub fn sink(&self) -> &A {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut A {
        &mut self.sink
    }

    pub fn ambient_tile(&self) -> Option<&TileId> {
        self.ambient.as_ref()
    }

    pub fn active_siren(&self) -> Option<SirenKind> {
        self.siren
    }

    /// Bring the ambient tone in line with `hovered`.
    pub fn sync(&mut self, hovered: Option<&Tile>) {
        let wanted = hovered.filter(|_| self.siren.is_none());
        if wanted.map(|t| &t.id) == self.ambient.as_ref() {
            return;
        }
        self.stop_ambient();
        if let Some(tile) = wanted {
            tracing::trace!(tile_id = %tile.id, frequency = %tile.frequency, "ambient tone");
            self.sink.play_ambient(&tile.id, tile.frequency, tile.pan());
            self.ambient = Some(tile.id.clone());
        }
    }

    /// Start a siren lasting `total_ms` (tone plus fade). Returns `false` if
    /// one is already sounding.
    pub fn trigger_siren(
        &mut self,
        kind: SirenKind,
        total_ms: u64,
        ctx: &mut StepContext<'_>,
    ) -> bool {
        if let Some(active) = self.siren {
            tracing::debug!(requested = ?kind, active = ?active, "siren already sounding");
            return false;
        }
        self.stop_ambient();
        self.siren = Some(kind);
        self.sink.play_siren(kind);
        ctx.arm(&mut self.siren_timer, total_ms, TimerKind::SirenEnd { kind });
        tracing::info!(kind = ?kind, total_ms, "siren started");
        ctx.emit(CanvasEventKind::SirenStarted { kind });
        true
    }

    /// The siren lifetime elapsed. Ambient resumes on `hovered`.
    pub fn on_siren_end(
        &mut self,
        fired: TimerHandle,
        kind: SirenKind,
        hovered: Option<&Tile>,
        ctx: &mut StepContext<'_>,
    ) {
        if !self.siren_timer.take_if_current(fired) {
            return;
        }
        self.siren = None;
        self.sink.stop_siren();
        tracing::info!(kind = ?kind, "siren ended");
        ctx.emit(CanvasEventKind::SirenEnded { kind });
        self.sync(hovered);
    }

    /// Silence everything and drop the siren timer.
    pub fn shutdown(&mut self, timers: &mut TimerQueue) {
        self.siren_timer.cancel(timers);
        if self.siren.take().is_some() {
            self.sink.stop_siren();
        }
        self.stop_ambient();
    }

    fn stop_ambient(&mut self) {
        if self.ambient.take().is_some() {
            self.sink.stop_ambient();
        }
    }
}
