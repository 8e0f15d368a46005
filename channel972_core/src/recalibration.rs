// Frequency-filter recalibration window.
//
// The frequency bar is the single writer of `selected_frequency`; this
// controller mirrors the value and turns every change into a timed
// interaction lock. A change while already recalibrating restarts the window,
// so the lock always ends exactly `window_ms` after the most recent change.
// `RecalibrationStarted` goes out only on the stable -> recalibrating edge;
// `RecalibrationEnded` once, when the (possibly extended) window closes.
//
// Clearing hover when the lock engages is the caller's job (see
// `CanvasState::apply_input`), because hover belongs to `HoverController`.

use crate::event::{CanvasEventKind, StepContext, TimerHandle, TimerKind, TimerQueue, TimerSlot};
use crate::types::{Frequency, RecalibrationState};

#[derive(Clone, Debug, Default)]
pub struct RecalibrationController {
    frequency: Option<Frequency>,
    state: RecalibrationState,
    window: TimerSlot,
    window_ms: u64,
}

impl RecalibrationController {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            ..Self::default()
        }
    }

    pub fn frequency(&self) -> Option<Frequency> {
        self.frequency
    }

    pub fn state(&self) -> RecalibrationState {
        self.state
    }

    pub fn is_recalibrating(&self) -> bool {
        self.state == RecalibrationState::Recalibrating
    }

    /// Record a new filter value. Returns `true` if the value changed and the
    /// lock window was (re)started.
    pub fn on_frequency_change(
        &mut self,
        incoming: Option<Frequency>,
        ctx: &mut StepContext<'_>,
    ) -> bool {
        if incoming == self.frequency {
            return false;
        }
        let previous = std::mem::replace(&mut self.frequency, incoming);

        if self.state == RecalibrationState::Stable {
            self.state = RecalibrationState::Recalibrating;
            tracing::debug!(from = ?previous, to = ?incoming, "recalibration started");
            ctx.emit(CanvasEventKind::RecalibrationStarted {
                from: previous,
                to: incoming,
            });
        } else {
            tracing::debug!(from = ?previous, to = ?incoming, "recalibration window extended");
        }
        ctx.arm(&mut self.window, self.window_ms, TimerKind::RecalibrationEnd);
        true
    }

    /// The window timer fired.
    pub fn on_window_end(&mut self, fired: TimerHandle, ctx: &mut StepContext<'_>) {
        if !self.window.take_if_current(fired) {
            return;
        }
        self.state = RecalibrationState::Stable;
        tracing::debug!(frequency = ?self.frequency, "recalibration ended");
        ctx.emit(CanvasEventKind::RecalibrationEnded);
    }

    /// Drop the pending window and return to stable without emitting.
    pub fn cancel_timers(&mut self, timers: &mut TimerQueue) {
        self.window.cancel(timers);
        self.state = RecalibrationState::Stable;
    }
}
