// Hover tracking and the proactive-nudge timer.
//
// `HoverController` is the single writer of `hovered_tile_id`. Entering a tile
// records it, emits the tile's context string for the chat collaborator, and
// (re)starts the nudge timer; leaving clears all three. When the dwell timer
// expires on a tile that is still hovered, a `ProactiveNudge` goes out. What
// the nudge turns into is the chat collaborator's business.
//
// Lock policy: while the canvas is mid-transition or recalibrating, hover
// inputs are dropped whole (no state change, no event). The caller computes
// `locked`; this controller does not know about the other machines.
//
// An id with no matching tile is still recorded as hovered (the grid reported
// it) and still arms the nudge, but its context is `None`.

use crate::event::{CanvasEventKind, StepContext, TimerHandle, TimerKind, TimerQueue, TimerSlot};
use crate::tile_field::TileField;
use crate::types::TileId;

#[derive(Clone, Debug, Default)]
pub struct HoverController {
    hovered: Option<TileId>,
    nudge: TimerSlot,
    nudge_delay_ms: u64,
}

impl HoverController {
    pub fn new(nudge_delay_ms: u64) -> Self {
        Self {
            hovered: None,
            nudge: TimerSlot::default(),
            nudge_delay_ms,
        }
    }

    pub fn hovered(&self) -> Option<&TileId> {
        self.hovered.as_ref()
    }

    pub fn nudge_pending(&self) -> bool {
        self.nudge.is_armed()
    }

    /// Pointer entered `tile_id`. Returns whether the input was accepted.
    pub fn on_hover_enter(
        &mut self,
        tile_id: TileId,
        tiles: &TileField,
        locked: bool,
        ctx: &mut StepContext<'_>,
    ) -> bool {
        if locked {
            tracing::trace!(tile_id = %tile_id, "hover dropped while locked");
            return false;
        }

        ctx.cancel(&mut self.nudge);
        let context = tiles.get(&tile_id).map(|t| t.context());
        ctx.arm(
            &mut self.nudge,
            self.nudge_delay_ms,
            TimerKind::HoverNudge {
                tile_id: tile_id.clone(),
            },
        );
        tracing::debug!(tile_id = %tile_id, known = context.is_some(), "tile hovered");
        self.hovered = Some(tile_id);
        ctx.emit(CanvasEventKind::TileHoverContext { context });
        true
    }

    /// Pointer left the grid (or the hovered tile). Returns whether the input
    /// was accepted.
    pub fn on_hover_exit(&mut self, locked: bool, ctx: &mut StepContext<'_>) -> bool {
        if locked {
            return false;
        }
        ctx.cancel(&mut self.nudge);
        self.hovered = None;
        ctx.emit(CanvasEventKind::TileHoverContext { context: None });
        true
    }

    /// Clear hover on behalf of another machine that is taking the lock
    /// (recalibration start, tile selection). Emits the cleared context only
    /// if something was hovered.
    pub fn force_clear(&mut self, ctx: &mut StepContext<'_>) {
        ctx.cancel(&mut self.nudge);
        if let Some(tile_id) = self.hovered.take() {
            tracing::debug!(tile_id = %tile_id, "hover cleared by lock");
            ctx.emit(CanvasEventKind::TileHoverContext { context: None });
        }
    }

    /// The nudge timer fired.
    pub fn on_nudge_timer(
        &mut self,
        fired: TimerHandle,
        tile_id: TileId,
        ctx: &mut StepContext<'_>,
    ) {
        if !self.nudge.take_if_current(fired) {
            return;
        }
        if self.hovered.as_ref() == Some(&tile_id) {
            tracing::debug!(tile_id = %tile_id, "proactive nudge");
            ctx.emit(CanvasEventKind::ProactiveNudge { tile_id });
        }
    }

    /// Cancel the nudge without touching hover state or emitting.
    pub fn cancel_timers(&mut self, timers: &mut TimerQueue) {
        self.nudge.cancel(timers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TileLayoutParams;
    use crate::event::CanvasEvent;
    use crate::types::Frequency;
    use channel972_prng::CanvasRng;

    struct Rig {
        timers: TimerQueue,
        events: Vec<CanvasEvent>,
        tiles: TileField,
        hover: HoverController,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                timers: TimerQueue::new(),
                events: Vec::new(),
                tiles: TileField::generate(
                    &TileLayoutParams::default(),
                    &Frequency::ALL,
                    &mut CanvasRng::new(42),
                ),
                hover: HoverController::new(5000),
            }
        }

        fn enter(&mut self, now_ms: u64, id: &str, locked: bool) -> bool {
            let mut ctx = StepContext {
                now_ms,
                timers: &mut self.timers,
                events: &mut self.events,
            };
            self.hover.on_hover_enter(TileId::from(id), &self.tiles, locked, &mut ctx)
        }

        fn exit(&mut self, now_ms: u64, locked: bool) -> bool {
            let mut ctx = StepContext {
                now_ms,
                timers: &mut self.timers,
                events: &mut self.events,
            };
            self.hover.on_hover_exit(locked, &mut ctx)
        }

        /// Fire every timer due by `up_to_ms`.
        fn fire(&mut self, up_to_ms: u64) {
            while let Some(timer) = self.timers.pop_if_ready(up_to_ms) {
                if let TimerKind::HoverNudge { tile_id } = timer.kind {
                    let mut ctx = StepContext {
                        now_ms: timer.due_ms,
                        timers: &mut self.timers,
                        events: &mut self.events,
                    };
                    self.hover.on_nudge_timer(timer.handle, tile_id, &mut ctx);
                }
            }
        }

        fn nudges(&self) -> Vec<(u64, TileId)> {
            self.events
                .iter()
                .filter_map(|e| match &e.kind {
                    CanvasEventKind::ProactiveNudge { tile_id } => Some((e.at_ms, tile_id.clone())),
                    _ => None,
                })
                .collect()
        }
    }

    #[test]
    fn enter_emits_context_and_arms_nudge() {
        let mut rig = Rig::new();
        assert!(rig.enter(0, "tile-5", false));
        let tile = rig.tiles.get(&TileId::from("tile-5")).unwrap().clone();
        assert_eq!(rig.hover.hovered(), Some(&tile.id));
        assert_eq!(
            rig.events[0].kind,
            CanvasEventKind::TileHoverContext {
                context: Some(tile.context())
            }
        );
        assert!(rig.hover.nudge_pending());
    }

    #[test]
    fn nudge_fires_after_dwell() {
        let mut rig = Rig::new();
        rig.enter(100, "tile-2", false);
        rig.fire(5099);
        assert!(rig.nudges().is_empty());
        rig.fire(5100);
        assert_eq!(rig.nudges(), vec![(5100, TileId::from("tile-2"))]);
    }

    #[test]
    fn moving_to_another_tile_restarts_dwell() {
        let mut rig = Rig::new();
        rig.enter(0, "tile-1", false);
        rig.enter(3000, "tile-2", false);
        rig.fire(7999);
        assert!(rig.nudges().is_empty());
        rig.fire(8000);
        assert_eq!(rig.nudges(), vec![(8000, TileId::from("tile-2"))]);
        assert_eq!(rig.timers.len(), 0);
    }

    #[test]
    fn exit_cancels_nudge_and_clears_context() {
        let mut rig = Rig::new();
        rig.enter(0, "tile-1", false);
        assert!(rig.exit(1000, false));
        assert_eq!(rig.hover.hovered(), None);
        assert_eq!(
            rig.events.last().unwrap().kind,
            CanvasEventKind::TileHoverContext { context: None }
        );
        rig.fire(10_000);
        assert!(rig.nudges().is_empty());
    }

    #[test]
    fn locked_inputs_are_dropped_whole() {
        let mut rig = Rig::new();
        rig.enter(0, "tile-1", false);
        let before = rig.events.len();
        assert!(!rig.enter(10, "tile-2", true));
        assert!(!rig.exit(20, true));
        assert_eq!(rig.hover.hovered(), Some(&TileId::from("tile-1")));
        assert_eq!(rig.events.len(), before);
    }

    #[test]
    fn unknown_tile_has_no_context_but_still_nudges() {
        let mut rig = Rig::new();
        rig.enter(0, "tile-404", false);
        assert_eq!(
            rig.events[0].kind,
            CanvasEventKind::TileHoverContext { context: None }
        );
        assert!(rig.hover.nudge_pending());
        rig.fire(4999);
        assert!(rig.nudges().is_empty());
        rig.fire(5000);
        assert_eq!(rig.nudges(), vec![(5000, TileId::from("tile-404"))]);
    }

    #[test]
    fn force_clear_emits_only_when_hovered() {
        let mut rig = Rig::new();
        {
            let mut ctx = StepContext {
                now_ms: 0,
                timers: &mut rig.timers,
                events: &mut rig.events,
            };
            rig.hover.force_clear(&mut ctx);
        }
        assert!(rig.events.is_empty());

        rig.enter(0, "tile-3", false);
        {
            let mut ctx = StepContext {
                now_ms: 5,
                timers: &mut rig.timers,
                events: &mut rig.events,
            };
            rig.hover.force_clear(&mut ctx);
        }
        assert_eq!(rig.hover.hovered(), None);
        assert!(rig.timers.is_empty());
        assert_eq!(rig.events.len(), 2);
    }
}
