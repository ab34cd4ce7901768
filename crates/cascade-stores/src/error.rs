//! Error types for the stores subsystem.

use cascade_procs::ProcError;
use cascade_stripe::ShortPlacement;
use thiserror::Error;

/// Errors from planning placements and bootstrapping stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The placement constraints cannot be met by the admissible
    /// destinations.
    #[error(transparent)]
    Short(#[from] ShortPlacement),

    /// A chunk in the working set does not expose its payload size, so its
    /// quota charge cannot be computed.
    #[error("sized data required for calculating data use")]
    SizedDataRequired,

    /// A processor failed while listing or flushing.
    #[error(transparent)]
    Proc(#[from] ProcError),
}
