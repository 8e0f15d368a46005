// Canvas state and step loop.
//
// `CanvasState` is the single source of truth for one mounted canvas. It owns
// the tile field, every controller, the timer queue, the audio coordinator,
// and the config. The canvas is a pure function:
// `(state, commands) -> (new_state, events)`.
//
// On construction (`new()`/`with_config()`) the tile field is generated from
// the seed and the overlay-reveal timer is scheduled. Everything afterwards
// happens inside `step()`.
//
// ## Step ordering
//
// `step(commands, target_ms)` advances the clock to `target_ms`, visiting
// every instant at which a command applies or a timer is due. At each instant
// commands are applied first (in input order), then due timers fire in
// `(due_ms, sequence)` order. Commands stamped before the current clock apply
// immediately; commands stamped after `target_ms` are dropped.
//
// ## Locks
//
// The canvas is "locked" for hover and selection while the transition phase
// is not `Idle` or a recalibration window is open. Hover inputs while locked
// are dropped whole. When a lock engages (recalibration start, accepted
// selection), hover is force-cleared so the snapshot never shows a hovered
// tile under a lock.
//
// After every input or timer the audio coordinator is reconciled with the
// hovered tile (see `audio.rs`).
//
// `unmount()` (or an `Unmount` input) cancels every timer, silences audio,
// and turns all later steps into no-ops.
//
// See also: `command.rs` for inputs, `event.rs` for timers and outbound
// events, `overlay.rs` for the derived overlays.
//
// **Critical constraint: determinism.** No wall clock and no ambient
// randomness: the seed drives tile layout, and overlay layout is seeded from
// the seed plus the current hover/filter. Same seed + same config + same
// commands = same events.

use crate::audio::{AmbientAudio, AudioSink};
use crate::command::{CanvasCommand, CanvasInput};
use crate::config::CanvasConfig;
use crate::error::ChannelResult;
use crate::event::{
    CanvasEvent, CanvasEventKind, ScheduledTimer, StepContext, TimerKind, TimerQueue, TimerSlot,
};
use crate::hover::HoverController;
use crate::overlay::{OverlaySet, derive_overlays};
use crate::recalibration::RecalibrationController;
use crate::tile_field::TileField;
use crate::transition::TransitionMachine;
use crate::types::{Frequency, SirenKind, Tile, TileId, TransitionPhase};
use channel972_content::ContentLibrary;
use channel972_prng::CanvasRng;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

/// Read-only view of the interaction state at one instant.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionState {
    pub now_ms: u64,
    pub hovered_tile_id: Option<TileId>,
    pub selected_frequency: Option<Frequency>,
    /// Present iff `transition_phase` is not `Idle`.
    pub selected_tile: Option<Tile>,
    pub transition_phase: TransitionPhase,
    pub is_recalibrating: bool,
    /// True once the initial reveal delay has elapsed.
    pub overlays_enabled: bool,
    /// Latest edge-proximity sample, 0..1.
    pub edge_proximity: f64,
    /// Organic-exit ramp, 0..1.
    pub exit_progress: f64,
    pub active_siren: Option<SirenKind>,
    /// Comment ids dismissed since the hover or filter last changed.
    pub dismissed_comments: BTreeSet<String>,
    pub mounted: bool,
}

/// Result of a `step()` call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepResult {
    /// Outbound events emitted during this step, in emission order.
    pub events: Vec<CanvasEvent>,
}

pub struct CanvasState<A: AudioSink> {
    now_ms: u64,
    seed: u64,
    config: CanvasConfig,
    tiles: TileField,
    timers: TimerQueue,
    reveal: TimerSlot,
    overlays_enabled: bool,
    hover: HoverController,
    recalibration: RecalibrationController,
    transition: TransitionMachine,
    audio: AmbientAudio<A>,
    dismissed: BTreeSet<String>,
    mounted: bool,
}

impl<A: AudioSink> CanvasState<A> {
    /// Mount a canvas with the default config.
    pub fn new(seed: u64, sink: A) -> Self {
        Self::build(seed, CanvasConfig::default(), sink)
    }

    /// Mount a canvas with `config`, which must validate.
    pub fn with_config(seed: u64, config: CanvasConfig, sink: A) -> ChannelResult<Self> {
        config.validate()?;
        Ok(Self::build(seed, config, sink))
    }

    fn build(seed: u64, config: CanvasConfig, sink: A) -> Self {
        let mut rng = CanvasRng::new(seed);
        let tiles = TileField::generate(&config.tiles, &Frequency::ALL, &mut rng);

        let mut timers = TimerQueue::new();
        let mut reveal = TimerSlot::default();
        reveal.arm(&mut timers, config.overlays.reveal_delay_ms, TimerKind::OverlayReveal);

        tracing::info!(seed, tiles = tiles.len(), "canvas mounted");

        Self {
            now_ms: 0,
            seed,
            tiles,
            timers,
            reveal,
            overlays_enabled: false,
            hover: HoverController::new(config.hover_nudge_delay_ms),
            recalibration: RecalibrationController::new(config.recalibration_window_ms),
            transition: TransitionMachine::new(
                config.transition.clone(),
                config.edge_exit.clone(),
                config.viewport,
            ),
            audio: AmbientAudio::new(sink),
            dismissed: BTreeSet::new(),
            mounted: true,
            config,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn tiles(&self) -> &TileField {
        &self.tiles
    }

    pub fn phase(&self) -> TransitionPhase {
        self.transition.phase()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Number of timers still scheduled.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn audio_sink(&self) -> &A {
        self.audio.sink()
    }

    pub fn audio_sink_mut(&mut self) -> &mut A {
        self.audio.sink_mut()
    }

    /// Hover and selection are refused while this holds.
    pub fn is_locked(&self) -> bool {
        !self.transition.phase().is_idle() || self.recalibration.is_recalibrating()
    }

    pub fn snapshot(&self) -> InteractionState {
        InteractionState {
            now_ms: self.now_ms,
            hovered_tile_id: self.hover.hovered().cloned(),
            selected_frequency: self.recalibration.frequency(),
            selected_tile: self
                .transition
                .selected()
                .and_then(|id| self.tiles.get(id))
                .cloned(),
            transition_phase: self.transition.phase(),
            is_recalibrating: self.recalibration.is_recalibrating(),
            overlays_enabled: self.overlays_enabled,
            edge_proximity: self.transition.proximity(),
            exit_progress: self.transition.exit_progress(),
            active_siren: self.audio.active_siren(),
            dismissed_comments: self.dismissed.clone(),
            mounted: self.mounted,
        }
    }

    /// Derive the overlays for the current state.
    pub fn overlays(&self, content: &ContentLibrary) -> OverlaySet {
        let state = self.snapshot();
        let mut hasher = FxHasher::default();
        self.seed.hash(&mut hasher);
        state.hovered_tile_id.as_ref().map(TileId::as_str).hash(&mut hasher);
        state.selected_frequency.map(Frequency::as_str).hash(&mut hasher);
        let mut rng = CanvasRng::new(hasher.finish());
        derive_overlays(&state, &self.tiles, content, &self.config.overlays, &mut rng)
    }

    // -----------------------------------------------------------------------
    // Step loop
    // -----------------------------------------------------------------------

    /// Apply `commands` and fire timers up to and including `target_ms`.
    pub fn step(&mut self, commands: &[CanvasCommand], target_ms: u64) -> StepResult {
        let mut events = Vec::new();
        if !self.mounted {
            return StepResult { events };
        }

        let mut queued: Vec<&CanvasCommand> = commands
            .iter()
            .filter(|c| {
                let keep = c.at_ms <= target_ms;
                if !keep {
                    tracing::warn!(at_ms = c.at_ms, target_ms, "command beyond step target dropped");
                }
                keep
            })
            .collect();
        queued.sort_by_key(|c| c.at_ms);
        let mut cmd_idx = 0;

        while self.mounted {
            let next_timer = self.timers.peek_due().filter(|&due| due <= target_ms);
            let next_cmd = queued.get(cmd_idx).map(|c| c.at_ms.max(self.now_ms));
            let next_ms = match (next_timer, next_cmd) {
                (Some(t), Some(c)) => t.min(c),
                (Some(t), None) => t,
                (None, Some(c)) => c,
                (None, None) => break,
            };
            self.now_ms = self.now_ms.max(next_ms);

            while self.mounted && cmd_idx < queued.len() && queued[cmd_idx].at_ms <= self.now_ms {
                let cmd = queued[cmd_idx];
                cmd_idx += 1;
                self.apply_input(&cmd.input, &mut events);
            }

            while self.mounted {
                let Some(timer) = self.timers.pop_if_ready(self.now_ms) else {
                    break;
                };
                self.fire_timer(timer, &mut events);
            }
        }

        self.now_ms = self.now_ms.max(target_ms);
        StepResult { events }
    }

    /// Tear the canvas down: cancel all timers and silence audio.
    pub fn unmount(&mut self) -> StepResult {
        let mut events = Vec::new();
        self.unmount_into(&mut events);
        StepResult { events }
    }

    fn unmount_into(&mut self, events: &mut Vec<CanvasEvent>) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.reveal.cancel(&mut self.timers);
        self.hover.cancel_timers(&mut self.timers);
        self.recalibration.cancel_timers(&mut self.timers);
        self.transition.cancel_timers(&mut self.timers);
        self.audio.shutdown(&mut self.timers);
        if !self.timers.is_empty() {
            tracing::warn!(left = self.timers.len(), "unowned timers dropped at unmount");
            self.timers.clear();
        }
        tracing::info!(now_ms = self.now_ms, "canvas unmounted");
        events.push(CanvasEvent {
            at_ms: self.now_ms,
            kind: CanvasEventKind::Unmounted,
        });
    }

    fn apply_input(&mut self, input: &CanvasInput, events: &mut Vec<CanvasEvent>) {
        if let CanvasInput::Unmount = input {
            self.unmount_into(events);
            return;
        }

        let locked = self.is_locked();
        let recalibrating = self.recalibration.is_recalibrating();
        let mut ctx = StepContext {
            now_ms: self.now_ms,
            timers: &mut self.timers,
            events,
        };

        match input {
            CanvasInput::SelectFrequency { frequency } => {
                if self.recalibration.on_frequency_change(*frequency, &mut ctx) {
                    self.hover.force_clear(&mut ctx);
                    self.dismissed.clear();
                }
            }
            CanvasInput::SelectTile { tile_id } | CanvasInput::MapTileRequest { tile_id } => {
                if self.tiles.get(tile_id).is_none() {
                    tracing::debug!(tile_id = %tile_id, "selection of unknown tile ignored");
                } else if self.transition.select(tile_id.clone(), recalibrating, &mut ctx) {
                    self.hover.force_clear(&mut ctx);
                    self.dismissed.clear();
                }
            }
            CanvasInput::HoverTile { tile_id } => {
                let changed = self.hover.hovered() != tile_id.as_ref();
                let accepted = match tile_id {
                    Some(id) => self.hover.on_hover_enter(id.clone(), &self.tiles, locked, &mut ctx),
                    None => self.hover.on_hover_exit(locked, &mut ctx),
                };
                if accepted && changed {
                    self.dismissed.clear();
                }
            }
            CanvasInput::PointerMove { x, y } => self.transition.pointer_move(*x, *y, &mut ctx),
            CanvasInput::ExitImmersion => {
                self.transition.external_exit(&mut ctx);
            }
            CanvasInput::Deactivate => {
                self.transition.snap_to_idle(&mut ctx);
            }
            CanvasInput::Resize { width, height } => self.transition.resize(*width, *height),
            CanvasInput::TriggerSiren { kind } => {
                let total_ms = self.config.siren_total_ms(*kind);
                self.audio.trigger_siren(*kind, total_ms, &mut ctx);
            }
            CanvasInput::ResonanceQuery { query } => {
                let query = query.trim();
                if !query.is_empty() {
                    ctx.emit(CanvasEventKind::ResonanceQuery {
                        query: query.to_string(),
                    });
                }
            }
            CanvasInput::MapLocationSelected { location_id } => {
                ctx.emit(CanvasEventKind::LocationSelected {
                    location_id: location_id.clone(),
                });
            }
            CanvasInput::DismissComment { comment_id } => {
                self.dismissed.insert(comment_id.clone());
            }
            CanvasInput::Unmount => {}
        }

        self.sync_audio();
    }

    fn fire_timer(&mut self, timer: ScheduledTimer, events: &mut Vec<CanvasEvent>) {
        let mut ctx = StepContext {
            now_ms: self.now_ms,
            timers: &mut self.timers,
            events,
        };
        let handle = timer.handle;

        match timer.kind {
            TimerKind::OverlayReveal => {
                if self.reveal.take_if_current(handle) {
                    self.overlays_enabled = true;
                    tracing::debug!("overlays enabled");
                    ctx.emit(CanvasEventKind::OverlaysEnabled);
                }
            }
            TimerKind::HoverNudge { tile_id } => self.hover.on_nudge_timer(handle, tile_id, &mut ctx),
            TimerKind::RecalibrationEnd => self.recalibration.on_window_end(handle, &mut ctx),
            TimerKind::PhaseAdvance { from } => {
                self.transition.on_phase_timer(handle, from, &mut ctx)
            }
            TimerKind::EdgeExitCheck => self.transition.on_edge_check(handle, &mut ctx),
            TimerKind::ExitProgressTick => self.transition.on_exit_tick(handle, &mut ctx),
            TimerKind::SirenEnd { kind } => {
                let hovered = self.hover.hovered().and_then(|id| self.tiles.get(id));
                self.audio.on_siren_end(handle, kind, hovered, &mut ctx);
            }
        }

        self.sync_audio();
    }

    fn sync_audio(&mut self) {
        if !self.mounted {
            return;
        }
        let hovered = self.hover.hovered().and_then(|id| self.tiles.get(id));
        self.audio.sync(hovered);
    }
}
