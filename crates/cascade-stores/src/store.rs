//! Backing-store surface.

use std::sync::Arc;

use cascade_procs::Proc;

/// A backing store exposed as a pair of pipeline stages.
///
/// The forward stage (`proc`) persists a chunk keyed by its hash; the
/// reverse stage (`unproc`) loads the bytes for a chunk's hash back into
/// its payload, surfacing a missing-data error when the store does not
/// hold the content.
pub trait Store {
    /// The write path.
    fn proc(&self) -> Arc<dyn Proc>;

    /// The read path.
    fn unproc(&self) -> Arc<dyn Proc>;
}
