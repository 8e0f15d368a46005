// Error types for the fallible edges of the canvas.
//
// The interaction core itself has no error paths: unknown tile ids resolve to
// "no match", locked inputs are dropped, and stale timers are no-ops. Errors
// only arise where the canvas touches the outside world: parsing a config,
// content file, or replay script, validating a config, and file I/O in the
// replay binary.

use thiserror::Error;

/// Root error type for everything in this crate that can fail.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Reading a config, content, or script file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON document did not match the expected shape.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A config parsed but holds values the canvas cannot run with.
    #[error("invalid config field `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

pub type ChannelResult<T> = Result<T, ChannelError>;
