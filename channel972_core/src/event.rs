// Canvas events: the cancellable timer queue that drives the controllers, and
// the outbound events the canvas emits to its collaborators.
//
// The canvas is a discrete-event system. Controllers never sleep or spawn;
// they schedule future work into a `TimerQueue` ordered by
// `(due_ms, sequence)`, and `CanvasState::step()` fires due timers in that
// order. Unlike a plain priority queue, every scheduled timer can be
// cancelled through its `TimerHandle`, so a superseded timer never fires.
//
// Each controller holds its pending work in `TimerSlot`s. A slot owns at most
// one handle: arming it cancels whatever it held before, and a firing timer is
// only honored if the slot still holds that exact handle. That pair of rules
// is what keeps ghost transitions out of the state machines.
//
// This file defines two related but distinct concepts:
// - `ScheduledTimer` / `TimerKind`: internal delayed work.
// - `CanvasEvent` / `CanvasEventKind`: outbound notifications.
//
// See also: `canvas.rs` for the step loop that drains the queue, `hover.rs`,
// `recalibration.rs`, `transition.rs`, and `audio.rs` for the slot owners.
//
// **Critical constraint: determinism.** Timers due at the same millisecond
// fire in scheduling order; the `(due_ms, sequence)` key is a total order.

use crate::types::{Frequency, SirenKind, TileId, TransitionPhase};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Internal timers
// ---------------------------------------------------------------------------

/// Handle to a scheduled timer; unique for the life of a queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(u64);

/// Delayed work the controllers can schedule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TimerKind {
    /// Initial-load delay before overlays may appear.
    OverlayReveal,
    /// Hover dwell elapsed on `tile_id`.
    HoverNudge { tile_id: TileId },
    /// The recalibration window closed.
    RecalibrationEnd,
    /// A timed transition phase (`from`) has run its course.
    PhaseAdvance { from: TransitionPhase },
    /// Delayed confirmation of an edge-proximity exit.
    EdgeExitCheck,
    /// One step of the organic-exit progress ramp.
    ExitProgressTick,
    /// A siren (including its fade) has finished.
    SirenEnd { kind: SirenKind },
}

/// A timer popped from the queue, ready to be dispatched.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledTimer {
    pub due_ms: u64,
    pub handle: TimerHandle,
    pub kind: TimerKind,
}

/// Cancellable min-queue of timers keyed by `(due_ms, sequence)`.
#[derive(Clone, Debug, Default)]
pub struct TimerQueue {
    by_deadline: BTreeMap<(u64, u64), TimerKind>,
    /// sequence -> due_ms, for cancellation by handle.
    deadlines: BTreeMap<u64, u64>,
    next_sequence: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` to fire at `due_ms`.
    pub fn schedule(&mut self, due_ms: u64, kind: TimerKind) -> TimerHandle {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        tracing::trace!(due_ms, sequence, kind = ?kind, "timer scheduled");
        self.by_deadline.insert((due_ms, sequence), kind);
        self.deadlines.insert(sequence, due_ms);
        TimerHandle(sequence)
    }

    /// Cancel a pending timer. Returns `false` if it already fired or was
    /// cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.deadlines.remove(&handle.0) {
            Some(due_ms) => {
                self.by_deadline.remove(&(due_ms, handle.0));
                tracing::trace!(due_ms, sequence = handle.0, "timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.deadlines.contains_key(&handle.0)
    }

    /// Deadline of the earliest pending timer.
    pub fn peek_due(&self) -> Option<u64> {
        self.by_deadline.keys().next().map(|&(due, _)| due)
    }

    /// Pop the earliest timer if it is due at or before `up_to_ms`.
    pub fn pop_if_ready(&mut self, up_to_ms: u64) -> Option<ScheduledTimer> {
        let (&(due_ms, sequence), _) = self.by_deadline.first_key_value()?;
        if due_ms > up_to_ms {
            return None;
        }
        let kind = self.by_deadline.remove(&(due_ms, sequence))?;
        self.deadlines.remove(&sequence);
        Some(ScheduledTimer {
            due_ms,
            handle: TimerHandle(sequence),
            kind,
        })
    }

    /// Drop every pending timer.
    pub fn clear(&mut self) {
        self.by_deadline.clear();
        self.deadlines.clear();
    }

    pub fn len(&self) -> usize {
        self.by_deadline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_deadline.is_empty()
    }
}

/// Holder for the single pending timer of one concern (one phase machine,
/// one debounce window, one ticker).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimerSlot {
    handle: Option<TimerHandle>,
}

impl TimerSlot {
    /// Cancel whatever the slot holds, then schedule `kind` at `due_ms`.
    pub fn arm(&mut self, queue: &mut TimerQueue, due_ms: u64, kind: TimerKind) -> TimerHandle {
        self.cancel(queue);
        let handle = queue.schedule(due_ms, kind);
        self.handle = Some(handle);
        handle
    }

    /// Cancel the held timer, if any. Returns whether one was pending.
    pub fn cancel(&mut self, queue: &mut TimerQueue) -> bool {
        match self.handle.take() {
            Some(handle) => queue.cancel(handle),
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Freshness check for a firing timer. If the slot holds `fired`, the
    /// slot is emptied and `true` is returned; otherwise the timer is stale
    /// and must be ignored.
    pub fn take_if_current(&mut self, fired: TimerHandle) -> bool {
        if self.handle == Some(fired) {
            self.handle = None;
            true
        } else {
            tracing::trace!(sequence = fired.0, "stale timer ignored");
            false
        }
    }
}

/// What a controller needs while handling one input or timer: the clock, the
/// queue to schedule into, and the sink for outbound events.
pub struct StepContext<'a> {
    pub now_ms: u64,
    pub timers: &'a mut TimerQueue,
    pub events: &'a mut Vec<CanvasEvent>,
}

impl StepContext<'_> {
    pub fn emit(&mut self, kind: CanvasEventKind) {
        self.events.push(CanvasEvent {
            at_ms: self.now_ms,
            kind,
        });
    }

    /// Arm `slot` to fire `kind` after `delay_ms`.
    pub fn arm(&mut self, slot: &mut TimerSlot, delay_ms: u64, kind: TimerKind) -> TimerHandle {
        slot.arm(self.timers, self.now_ms + delay_ms, kind)
    }

    pub fn cancel(&mut self, slot: &mut TimerSlot) -> bool {
        slot.cancel(self.timers)
    }
}

// ---------------------------------------------------------------------------
// Outbound events
// ---------------------------------------------------------------------------

/// A notification emitted by the canvas, stamped with the canvas clock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasEvent {
    pub at_ms: u64,
    pub kind: CanvasEventKind,
}

/// Everything the canvas tells its collaborators.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanvasEventKind {
    /// Hover context for the chat collaborator; `None` when nothing (or an
    /// unknown id) is hovered.
    TileHoverContext { context: Option<String> },
    /// The hover dwell elapsed; the chat collaborator may nudge.
    ProactiveNudge { tile_id: TileId },
    /// A selection was accepted and the transition began.
    TileSelected { tile_id: TileId },
    PhaseChanged { from: TransitionPhase, to: TransitionPhase },
    /// Immersion reached, or the canvas returned to the grid after immersion.
    TransitionComplete,
    /// Organic-exit ramp value in [0, 1].
    ExitProgress { progress: f64 },
    RecalibrationStarted {
        from: Option<Frequency>,
        to: Option<Frequency>,
    },
    RecalibrationEnded,
    /// The initial-load delay elapsed; overlays may now appear.
    OverlaysEnabled,
    /// Forwarded from the chat affordance.
    ResonanceQuery { query: String },
    /// Forwarded from the map.
    LocationSelected { location_id: String },
    SirenStarted { kind: SirenKind },
    SirenEnded { kind: SirenKind },
    Unmounted,
}
