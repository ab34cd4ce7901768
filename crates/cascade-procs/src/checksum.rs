//! Hash stamping and integrity verification stages.

use cascade_core::{sum, Chunk};

use crate::error::ProcError;
use crate::proc::{InplaceFunc, Proc};

/// Content hashing as a pipeline stage.
///
/// The forward direction stamps `chunk.hash` from the payload; the reverse
/// direction verifies the payload against the carried hash and records the
/// outcome on the chunk's integrity tag.
pub struct Checksum;

impl Checksum {
    /// Forward stage: hash the payload and stamp it on the chunk.
    pub fn proc(&self) -> impl Proc {
        InplaceFunc(|chunk: &mut Chunk| {
            let bytes = chunk.data().bytes().ok_or(ProcError::DataRequired)?;
            let hash = sum(bytes);
            chunk.set_hash(hash);
            Ok(())
        })
    }

    /// Reverse stage: verify the payload against the carried hash.
    pub fn unproc(&self) -> impl Proc {
        InplaceFunc(|chunk: &mut Chunk| {
            let bytes = chunk.data().bytes().ok_or(ProcError::DataRequired)?;
            let ok = sum(bytes) == chunk.hash();
            chunk.meta_mut().set_integrity_check(ok);
            Ok(())
        })
    }
}
