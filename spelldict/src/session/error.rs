use std::path::PathBuf;

use crate::dictionary::error::DictionaryError;
use crate::engine::EngineStatus;

/// Errors raised by a [`Session`](super::Session).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The session has been closed
    #[error("Cannot {operation}: the session is closed")]
    InvalidState {
        /// What was attempted
        operation: &'static str,
    },

    /// A word is longer than the engine accepts
    #[error("Argument '{name}' is {len} bytes long, more than the limit of {max}")]
    InvalidArgument {
        /// Name of the argument
        name: &'static str,
        /// Its length in bytes of the dictionary encoding
        len: usize,
        /// The configured limit
        max: usize,
    },

    /// The engine refused a mutation
    #[error("Spell engine failed to {operation}")]
    Engine {
        /// What was attempted
        operation: &'static str,
        /// Status the engine returned
        #[source]
        source: EngineStatus,
    },

    /// Reading, patching or sorting the dictionary failed
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),

    /// The session configuration could not be loaded
    #[error("Invalid session configuration '{path}'")]
    Config {
        /// The configuration file
        path: PathBuf,
        /// Why it could not be read
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
