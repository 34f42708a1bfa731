//! Error kinds carried on the wire, plus the engine/IO failures that wrap them.

use thiserror::Error;

/// Every error a command handler, the wire codec, or startup can produce.
///
/// `wire_message` is the single place that owns the `-ERROR ...` text so
/// handlers never hand-roll a string that has to match byte-for-byte.
#[derive(Debug, Error)]
pub enum RockdisError {
    #[error("unknown command")]
    MethodNotSupported,
    #[error("wrong number of arguments (not enough)")]
    NotEnoughArgs,
    #[error("wrong number of arguments (too many)")]
    TooManyArgs,
    #[error("wrong number of arguments")]
    WrongArgsNumber,
    #[error("value is not an integer or out of range")]
    ExpectInteger,
    #[error("Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("the engine is closed")]
    EngineDead,
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error(transparent)]
    Engine(#[from] rocksdb::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RockdisError {
    /// Renders the text that follows `-ERROR ` on the wire (no CRLF, no prefix).
    pub fn wire_message(&self) -> String {
        match self {
            RockdisError::Engine(e) => format!("engine error: {e}"),
            RockdisError::Io(e) => format!("io error: {e}"),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RockdisError>;
