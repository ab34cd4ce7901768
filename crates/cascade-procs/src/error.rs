//! Error type carried on processor result streams.

use cascade_core::{Hash, HashError};
use thiserror::Error;

/// Errors carried on processor result streams.
///
/// Cloneable and comparable so that stream composers can retain a copy for
/// end-of-stream hooks while forwarding the original downstream; I/O errors
/// are therefore captured by message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcError {
    /// Underlying store I/O failed.
    #[error("I/O error: {msg}")]
    Io {
        /// Description of the failure.
        msg: String,
    },

    /// A store was asked to read back content it does not hold.
    #[error("missing data for hash {hash}")]
    MissingData {
        /// The hash that could not be found.
        hash: Hash,
    },

    /// A chunk payload required by the stage was not materialized.
    #[error("materialized data required")]
    DataRequired,

    /// A hash could not be constructed from external input.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// Failure signalled by an embedding program's processor.
    #[error("{msg}")]
    Other {
        /// Description of the failure.
        msg: String,
    },
}

impl ProcError {
    /// An [`ProcError::Other`] with the given message.
    pub fn other(msg: impl Into<String>) -> Self {
        ProcError::Other { msg: msg.into() }
    }
}

impl From<std::io::Error> for ProcError {
    fn from(err: std::io::Error) -> Self {
        ProcError::Io {
            msg: err.to_string(),
        }
    }
}
