//! Per-destination capacity tracking and admissibility.

use std::collections::BTreeMap;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::copier::{Copier, CopierId};

struct ResEntry {
    copier: Copier,
    cap: Option<u64>,
    used: u64,
}

impl ResEntry {
    fn admits(&self, reserve: u64) -> bool {
        match self.cap {
            None => true,
            Some(cap) => self.used.saturating_add(reserve) <= cap,
        }
    }
}

/// Registry of live destinations with byte budgets.
///
/// A destination admits a prospective write of `n` bytes when
/// `used + n <= capacity`; unlimited destinations admit anything. Deleting
/// a destination removes it from every future admissibility answer. All
/// operations take a consistent snapshot under an internal mutex.
#[derive(Default)]
pub struct QuotaManager {
    inner: Mutex<BTreeMap<CopierId, ResEntry>>,
}

impl QuotaManager {
    /// An empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a destination with unlimited capacity.
    pub fn add_res(&self, copier: Copier) {
        self.insert(copier, None);
    }

    /// Register a destination with a byte cap.
    pub fn add_res_quota(&self, copier: Copier, cap: u64) {
        self.insert(copier, Some(cap));
    }

    fn insert(&self, copier: Copier, cap: Option<u64>) {
        let mut inner = self.inner.lock().unwrap();
        inner.insert(
            copier.id().clone(),
            ResEntry {
                copier,
                cap,
                used: 0,
            },
        );
    }

    /// Live destinations that admit a further `reserve` bytes, in id order.
    /// A reserve of zero lists every live destination.
    pub fn resources(&self, reserve: u64) -> Vec<Copier> {
        let inner = self.inner.lock().unwrap();
        inner
            .values()
            .filter(|entry| entry.admits(reserve))
            .map(|entry| entry.copier.clone())
            .collect()
    }

    /// Charge `n` bytes against a destination. Unknown ids are ignored: the
    /// destination may have been evicted while one of its copies was still
    /// in flight.
    pub fn add_use(&self, id: &CopierId, n: u64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(entry) = inner.get_mut(id) {
            entry.used = entry.used.saturating_add(n);
            debug!(copier = %id, used = entry.used, "charged quota");
        }
    }

    /// Bytes currently charged against a destination, if it is live.
    pub fn used(&self, id: &CopierId) -> Option<u64> {
        let inner = self.inner.lock().unwrap();
        inner.get(id).map(|entry| entry.used)
    }

    /// Remove a destination from rotation. Idempotent.
    pub fn delete(&self, id: &CopierId) {
        let mut inner = self.inner.lock().unwrap();
        if inner.remove(id).is_some() {
            warn!(copier = %id, "destination evicted");
        }
    }
}
