// channel972_core: breathing-canvas orchestration library.
//
// This crate contains the interaction logic of the Channel 972 canvas: tile
// generation, hover and selection lifecycle, the frequency recalibration
// lock, the cinematic zoom transition with edge-triggered exit, overlay
// derivation, and audio coordination. It renders nothing and plays nothing;
// collaborators (grid renderer, audio engine, chat agent, map) consume its
// events and feed it inputs.
//
// Module overview:
// - `canvas.rs`:        Top-level CanvasState, step loop, input dispatch, snapshots.
// - `command.rs`:       CanvasCommand / CanvasInput: all inbound inputs.
// - `event.rs`:         Cancellable TimerQueue + TimerSlot, outbound CanvasEvents.
// - `tile_field.rs`:    Tile generation and lookup.
// - `hover.rs`:         HoverController: hovered tile and proactive nudge.
// - `recalibration.rs`: Frequency-filter lock window.
// - `transition.rs`:    Cinematic transition state machine and edge exit.
// - `overlay.rs`:       Pure overlay derivation (threads, bubbles, story panel).
// - `audio.rs`:         AudioSink capability and the ambient/siren coordinator.
// - `config.rs`:        CanvasConfig: every tunable, with validation.
// - `error.rs`:         ChannelError for the fallible edges (config, I/O).
// - `types.rs`:         TileId, Tile, Point, phase and siren enums.
// - `prng` / `content`: Re-exported `channel972_prng` and `channel972_content`.
//
// The `channel972_replay` binary (src/bin/replay.rs) drives a canvas
// headless from a JSON script.
//
// **Critical constraint: determinism.** The canvas is a pure function:
// `(state, commands) -> (new_state, events)`. All randomness comes from a
// seeded xoshiro256++ PRNG. No `HashMap`, no system time, no OS entropy.

pub mod audio;
pub mod canvas;
pub mod command;
pub mod config;
pub use channel972_content as content;
pub mod error;
pub mod event;
pub mod hover;
pub mod overlay;
pub use channel972_prng as prng;
pub mod recalibration;
pub mod tile_field;
pub mod transition;
pub mod types;

pub use canvas::{CanvasState, InteractionState, StepResult};
pub use error::{ChannelError, ChannelResult};
