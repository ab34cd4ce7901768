//! Replica registry: which destinations hold which content.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use cascade_core::Hash;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::copier::CopierId;

/// Per-hash replica record: the owner set plus the placement lock that
/// serializes placement decisions for this content.
///
/// The placement lock is held from the owner snapshot at the start of a
/// placement until every copy dispatched for it has settled, so at most one
/// placement per hash is ever in flight.
pub struct Copies {
    lock: Arc<AsyncMutex<()>>,
    owners: Mutex<BTreeSet<CopierId>>,
}

impl Copies {
    fn new() -> Self {
        Self {
            lock: Arc::new(AsyncMutex::new(())),
            owners: Mutex::new(BTreeSet::new()),
        }
    }

    /// Acquire the placement lock. The guard is owned so completion hooks
    /// running on other tasks can release it.
    pub async fn lock_placement(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.lock).lock_owned().await
    }

    /// Snapshot of the current owner set.
    pub fn owners(&self) -> BTreeSet<CopierId> {
        self.owners.lock().unwrap().clone()
    }

    /// Record a new owner.
    pub fn add(&self, id: CopierId) {
        self.owners.lock().unwrap().insert(id);
    }

    /// Drop an owner, if present.
    pub fn remove(&self, id: &CopierId) {
        self.owners.lock().unwrap().remove(id);
    }

    /// Number of owners.
    pub fn len(&self) -> usize {
        self.owners.lock().unwrap().len()
    }

    /// True when nothing holds this content.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lazily-populated map of hash → replica record. Records are created on
/// first lookup and persist for the life of the registry.
#[derive(Default)]
pub struct CopiesReg {
    entries: Mutex<HashMap<Hash, Arc<Copies>>>,
}

impl CopiesReg {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the record for `hash`, creating it if absent.
    pub fn entry(&self, hash: Hash) -> Arc<Copies> {
        let mut entries = self.entries.lock().unwrap();
        Arc::clone(entries.entry(hash).or_insert_with(|| Arc::new(Copies::new())))
    }
}
