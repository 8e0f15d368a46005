// Cinematic transition state machine.
//
// Phases run `Idle -> DollyOut -> ZoomIn -> Immersive -> OrganicExit -> Idle`.
// The two entry hops and the organic exit are timed; leaving `Immersive` is
// triggered either by an external exit request or by the pointer lingering
// near a viewport edge.
//
// Each concern owns exactly one `TimerSlot`:
// - `phase_timer`: the timed hop out of the current phase. Its `TimerKind`
//   records the phase it was armed in, and a firing timer is dropped unless
//   both the slot and the phase still agree.
// - `edge_check`: the delayed edge-exit confirmation, debounced. Every
//   sample above `arm_proximity` restarts it and any sample at or below
//   cancels it, so it fires only after the pointer has sat still near the
//   edge for the full delay. It reads the latest proximity when it fires.
// - `exit_ticker`: the organic-exit progress ramp, re-armed one step at a
//   time until progress reaches 1.
//
// Leaving `Idle` for any reason, or snapping back to it, cancels all three.
//
// Edge proximity works in device pixels: `distance = min(x, y, w - x, h - y)`
// and `proximity = clamp(1 - distance / threshold_px, 0, 1)`.
//
// See also: `canvas.rs` which gates `select()` on the recalibration lock and
// clears hover before a selection is accepted.

use crate::config::{EdgeExitParams, TransitionParams};
use crate::event::{CanvasEventKind, StepContext, TimerHandle, TimerKind, TimerQueue, TimerSlot};
use crate::types::{TileId, TransitionPhase};

/// Progress at or above this counts as a finished ramp; absorbs float error
/// from repeated step multiplication.
const RAMP_EPSILON: f64 = 1e-9;

#[derive(Clone, Debug)]
pub struct TransitionMachine {
    phase: TransitionPhase,
    selected: Option<TileId>,
    phase_timer: TimerSlot,
    edge_check: TimerSlot,
    exit_ticker: TimerSlot,
    /// Latest edge-proximity sample while immersive.
    proximity: f64,
    /// Ramp ticks taken since entering `OrganicExit`.
    exit_steps: u32,
    viewport: (f64, f64),
    params: TransitionParams,
    edge: EdgeExitParams,
}

impl TransitionMachine {
    pub fn new(params: TransitionParams, edge: EdgeExitParams, viewport: (f64, f64)) -> Self {
        Self {
            phase: TransitionPhase::Idle,
            selected: None,
            phase_timer: TimerSlot::default(),
            edge_check: TimerSlot::default(),
            exit_ticker: TimerSlot::default(),
            proximity: 0.0,
            exit_steps: 0,
            viewport,
            params,
            edge,
        }
    }

    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    pub fn selected(&self) -> Option<&TileId> {
        self.selected.as_ref()
    }

    pub fn proximity(&self) -> f64 {
        self.proximity
    }

    pub fn viewport(&self) -> (f64, f64) {
        self.viewport
    }

    pub fn edge_check_pending(&self) -> bool {
        self.edge_check.is_armed()
    }

    /// Organic-exit ramp value in [0, 1]; 0 outside `OrganicExit`.
    pub fn exit_progress(&self) -> f64 {
        let raw = f64::from(self.exit_steps) * self.params.exit_progress_step;
        if raw >= 1.0 - RAMP_EPSILON { 1.0 } else { raw }
    }

    /// Proximity of a pointer sample to the nearest viewport edge.
    pub fn edge_proximity(&self, x: f64, y: f64) -> f64 {
        let (w, h) = self.viewport;
        let distance = x.min(y).min(w - x).min(h - y);
        (1.0 - distance / self.edge.threshold_px).clamp(0.0, 1.0)
    }

    // -----------------------------------------------------------------------
    // Inputs
    // -----------------------------------------------------------------------

    /// Begin the transition into `tile_id`. Only accepted from `Idle` while
    /// not `locked`. Returns whether the selection was accepted.
    pub fn select(&mut self, tile_id: TileId, locked: bool, ctx: &mut StepContext<'_>) -> bool {
        if locked || !self.phase.is_idle() {
            tracing::trace!(tile_id = %tile_id, phase = ?self.phase, locked, "selection dropped");
            return false;
        }
        tracing::info!(tile_id = %tile_id, "tile selected");
        self.selected = Some(tile_id.clone());
        ctx.emit(CanvasEventKind::TileSelected { tile_id });
        self.enter_timed(TransitionPhase::DollyOut, self.params.dolly_out_ms, ctx);
        true
    }

    /// A pointer sample, in px. Ignored outside `Immersive`.
    pub fn pointer_move(&mut self, x: f64, y: f64, ctx: &mut StepContext<'_>) {
        if self.phase != TransitionPhase::Immersive {
            return;
        }
        self.proximity = self.edge_proximity(x, y);
        if self.proximity > self.edge.arm_proximity {
            tracing::trace!(proximity = self.proximity, "edge check (re)armed");
            ctx.arm(
                &mut self.edge_check,
                self.edge.confirm_delay_ms,
                TimerKind::EdgeExitCheck,
            );
        } else if ctx.cancel(&mut self.edge_check) {
            tracing::trace!(proximity = self.proximity, "edge check disarmed");
        }
    }

    /// External "exit immersion" request. From `Immersive` or `OrganicExit`
    /// this returns to the grid and completes; mid-entry it takes the
    /// cancellation path. Returns whether anything changed.
    pub fn external_exit(&mut self, ctx: &mut StepContext<'_>) -> bool {
        match self.phase {
            TransitionPhase::Idle => false,
            TransitionPhase::Immersive | TransitionPhase::OrganicExit => {
                tracing::info!(phase = ?self.phase, "immersion exited");
                self.finish_to_idle(ctx);
                true
            }
            TransitionPhase::DollyOut | TransitionPhase::ZoomIn => self.snap_to_idle(ctx),
        }
    }

    /// Cancellation path: return to `Idle` from any phase, without
    /// `TransitionComplete`. Returns whether the phase changed.
    pub fn snap_to_idle(&mut self, ctx: &mut StepContext<'_>) -> bool {
        self.cancel_timers(ctx.timers);
        self.selected = None;
        self.proximity = 0.0;
        self.exit_steps = 0;
        if self.phase.is_idle() {
            return false;
        }
        tracing::info!(phase = ?self.phase, "transition cancelled");
        self.set_phase(TransitionPhase::Idle, ctx);
        true
    }

    /// New viewport size in px. Non-positive sizes are ignored.
    pub fn resize(&mut self, width: f64, height: f64) {
        if width > 0.0 && height > 0.0 {
            self.viewport = (width, height);
        }
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    /// A timed phase (`from`) elapsed.
    pub fn on_phase_timer(
        &mut self,
        fired: TimerHandle,
        from: TransitionPhase,
        ctx: &mut StepContext<'_>,
    ) {
        if !self.phase_timer.take_if_current(fired) || self.phase != from {
            return;
        }
        match from {
            TransitionPhase::DollyOut => {
                self.enter_timed(TransitionPhase::ZoomIn, self.params.zoom_in_ms, ctx);
            }
            TransitionPhase::ZoomIn => {
                self.proximity = 0.0;
                self.set_phase(TransitionPhase::Immersive, ctx);
                ctx.emit(CanvasEventKind::TransitionComplete);
            }
            TransitionPhase::OrganicExit => self.finish_to_idle(ctx),
            TransitionPhase::Idle | TransitionPhase::Immersive => {
                tracing::warn!(phase = ?from, "phase timer fired for an untimed phase");
            }
        }
    }

    /// The delayed edge-exit confirmation fired.
    pub fn on_edge_check(&mut self, fired: TimerHandle, ctx: &mut StepContext<'_>) {
        if !self.edge_check.take_if_current(fired) || self.phase != TransitionPhase::Immersive {
            return;
        }
        if self.proximity > self.edge.exit_proximity {
            tracing::info!(proximity = self.proximity, "edge exit confirmed");
            self.begin_organic_exit(ctx);
        } else {
            tracing::trace!(proximity = self.proximity, "edge exit not confirmed");
        }
    }

    /// One step of the exit-progress ramp.
    pub fn on_exit_tick(&mut self, fired: TimerHandle, ctx: &mut StepContext<'_>) {
        if !self.exit_ticker.take_if_current(fired) || self.phase != TransitionPhase::OrganicExit {
            return;
        }
        self.exit_steps += 1;
        let progress = self.exit_progress();
        ctx.emit(CanvasEventKind::ExitProgress { progress });
        if progress < 1.0 {
            ctx.arm(
                &mut self.exit_ticker,
                self.params.exit_tick_ms,
                TimerKind::ExitProgressTick,
            );
        }
    }

    /// Cancel every pending timer without changing phase or emitting.
    pub fn cancel_timers(&mut self, timers: &mut TimerQueue) {
        self.phase_timer.cancel(timers);
        self.edge_check.cancel(timers);
        self.exit_ticker.cancel(timers);
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn set_phase(&mut self, to: TransitionPhase, ctx: &mut StepContext<'_>) {
        let from = self.phase;
        self.phase = to;
        tracing::debug!(from = ?from, to = ?to, "phase changed");
        ctx.emit(CanvasEventKind::PhaseChanged { from, to });
    }

    fn enter_timed(&mut self, to: TransitionPhase, duration_ms: u64, ctx: &mut StepContext<'_>) {
        self.set_phase(to, ctx);
        ctx.arm(
            &mut self.phase_timer,
            duration_ms,
            TimerKind::PhaseAdvance { from: to },
        );
    }

    fn begin_organic_exit(&mut self, ctx: &mut StepContext<'_>) {
        ctx.cancel(&mut self.edge_check);
        self.exit_steps = 0;
        self.enter_timed(TransitionPhase::OrganicExit, self.params.organic_exit_ms, ctx);
        ctx.emit(CanvasEventKind::ExitProgress { progress: 0.0 });
        ctx.arm(
            &mut self.exit_ticker,
            self.params.exit_tick_ms,
            TimerKind::ExitProgressTick,
        );
    }

    fn finish_to_idle(&mut self, ctx: &mut StepContext<'_>) {
        self.cancel_timers(ctx.timers);
        self.selected = None;
        self.proximity = 0.0;
        self.exit_steps = 0;
        self.set_phase(TransitionPhase::Idle, ctx);
        ctx.emit(CanvasEventKind::TransitionComplete);
    }
}
