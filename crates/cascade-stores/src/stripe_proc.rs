//! The stripe processor: plans and dispatches replica copies per chunk.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cascade_core::{Chunk, Hash};
use cascade_procs::{finish_first_err, DiscardChunks, OnEnd, Proc, ProcError, Res, ResStream};
use cascade_stripe::{Locs, RoundRobin, Striper, S};
use tokio::sync::{mpsc, OwnedMutexGuard};

use crate::copier::{ChunkArg, Copier, CopierId};
use crate::copies::CopiesReg;
use crate::error::StoreError;
use crate::ls::{CopiesEntryAdder, MultiLister, QuotaEntryAdder};
use crate::quota::QuotaManager;

/// Plans one placement per incoming chunk (or chunk group) and returns the
/// processors that execute it.
#[async_trait]
pub trait DynProc: Send + Sync {
    /// Plan the processors for `chunk`. The first emits the working-set
    /// chunks downstream; the rest perform the copies and are driven for
    /// effect.
    async fn procs(&self, chunk: &Chunk) -> Result<Vec<Arc<dyn Proc>>, StoreError>;

    /// Flush every underlying destination; first error wins.
    async fn finish(&self) -> Result<(), ProcError>;
}

/// The stripe processor.
///
/// Construction snapshots the registered destinations, seeds the shared
/// round-robin sequence from their ids, and indexes each destination's
/// existing replicas into the quota manager and the replica registry.
pub struct StripeProc {
    striper: Arc<dyn Striper<Hash, CopierId>>,
    qman: Arc<QuotaManager>,
    reg: Arc<CopiesReg>,
    seq: Mutex<RoundRobin<CopierId>>,
    finishers: Vec<Arc<dyn Proc>>,
}

impl StripeProc {
    /// Build the processor over the destinations currently registered with
    /// `qman`. A lister error aborts construction.
    pub async fn new(
        striper: Arc<dyn Striper<Hash, CopierId>>,
        qman: Arc<QuotaManager>,
    ) -> Result<Self, StoreError> {
        let reg = Arc::new(CopiesReg::new());
        let ress = qman.resources(0);
        let ids: Vec<CopierId> = ress.iter().map(|c| c.id().clone()).collect();
        let finishers: Vec<Arc<dyn Proc>> = ress
            .iter()
            .map(|c| Arc::new(c.clone()) as Arc<dyn Proc>)
            .collect();

        MultiLister::new(ress)
            .add_entries_to(&[
                &QuotaEntryAdder {
                    qman: Arc::clone(&qman),
                },
                &CopiesEntryAdder {
                    reg: Arc::clone(&reg),
                },
            ])
            .await
            .map_err(StoreError::from)?;

        Ok(Self {
            striper,
            qman,
            reg,
            seq: Mutex::new(RoundRobin::new(ids)),
            finishers,
        })
    }
}

#[async_trait]
impl DynProc for StripeProc {
    async fn procs(&self, chunk: &Chunk) -> Result<Vec<Arc<dyn Proc>>, StoreError> {
        // Working set: the group members when the chunk is a carrier,
        // otherwise the chunk itself. Sorted by hash so multi-chunk lock
        // acquisition is totally ordered across concurrent placements.
        let mut chunks: BTreeMap<Hash, Chunk> = BTreeMap::new();
        match chunk.meta().group() {
            Some(group) => {
                for member in group {
                    chunks.insert(member.hash(), member.clone());
                }
            }
            None => {
                chunks.insert(chunk.hash(), chunk.clone());
            }
        }

        // Lock each entry for the whole placement and snapshot its owners.
        // The guards drop on every early-error path below.
        let mut guards: Vec<OwnedMutexGuard<()>> = Vec::with_capacity(chunks.len());
        let mut cur: S<Hash, CopierId> = S::new();
        for hash in chunks.keys() {
            let copies = self.reg.entry(*hash);
            guards.push(copies.lock_placement().await);
            cur.insert(*hash, copies.owners());
        }

        // Bytes charged against destination budgets for this placement.
        let mut data_use: u64 = 0;
        for member in chunks.values() {
            let size = member
                .data()
                .size()
                .ok_or(StoreError::SizedDataRequired)?;
            data_use += size;
        }

        let admissible = self.qman.resources(data_use);
        let mut by_id: BTreeMap<CopierId, Copier> = BTreeMap::new();
        for copier in admissible {
            by_id.insert(copier.id().clone(), copier);
        }
        let dests: Locs<CopierId> = by_id.keys().cloned().collect();

        let new_stripe = {
            let mut seq = self.seq.lock().unwrap();
            self.striper.stripe(&cur, &dests, &mut *seq)?
        };

        let copy_count: usize = new_stripe.values().map(|locs| locs.len()).sum();
        let release = PlacementRelease::arm(guards, copy_count);

        let mut procs: Vec<Arc<dyn Proc>> = Vec::with_capacity(copy_count + 1);
        procs.push(Arc::new(SliceProc(chunks.values().cloned().collect())));

        for (hash, locs) in &new_stripe {
            let member = match chunks.get(hash) {
                Some(member) => member,
                None => panic!("unknown chunk"),
            };
            let copies = self.reg.entry(*hash);
            for id in locs {
                let copier = match by_id.get(id) {
                    Some(copier) => copier,
                    None => panic!("unknown copier ID"),
                };
                let qman = Arc::clone(&self.qman);
                let copies = Arc::clone(&copies);
                let release = Arc::clone(&release);
                let copier_id = id.clone();
                let hook = move |err: Option<&ProcError>| {
                    if err.is_some() {
                        qman.delete(&copier_id);
                    } else {
                        copies.add(copier_id.clone());
                        release.charge_once(&copier_id, |dest| qman.add_use(dest, data_use));
                    }
                    release.done();
                };
                let bound: Arc<dyn Proc> =
                    Arc::new(ChunkArg::new(Arc::new(copier.clone()), member.clone()));
                let discarded: Arc<dyn Proc> = Arc::new(DiscardChunks::new(bound));
                procs.push(Arc::new(OnEnd::new(discarded, hook)));
            }
        }

        Ok(procs)
    }

    async fn finish(&self) -> Result<(), ProcError> {
        finish_first_err(&self.finishers).await
    }
}

/// Holds the placement locks of one working set until every dispatched copy
/// has settled, and tracks which destinations have already been charged for
/// this placement.
struct PlacementRelease {
    guards: Mutex<Vec<OwnedMutexGuard<()>>>,
    charged: Mutex<std::collections::BTreeSet<CopierId>>,
    remaining: AtomicUsize,
}

impl PlacementRelease {
    fn arm(guards: Vec<OwnedMutexGuard<()>>, copies: usize) -> Arc<Self> {
        let release = Arc::new(Self {
            guards: Mutex::new(guards),
            charged: Mutex::new(Default::default()),
            remaining: AtomicUsize::new(copies),
        });
        if copies == 0 {
            release.unlock();
        }
        release
    }

    /// Charge a destination at most once per placement: a group fans one
    /// data-use total out to several copies of the same destination.
    fn charge_once(&self, id: &CopierId, charge: impl FnOnce(&CopierId)) {
        if self.charged.lock().unwrap().insert(id.clone()) {
            charge(id);
        }
    }

    fn done(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.unlock();
        }
    }

    fn unlock(&self) {
        self.guards.lock().unwrap().clear();
    }
}

/// Emits a fixed set of chunks, ignoring its input: the working set flows
/// downstream exactly once while the copy fan-out runs for effect.
struct SliceProc(Vec<Chunk>);

#[async_trait]
impl Proc for SliceProc {
    async fn process(&self, _chunk: Chunk) -> ResStream {
        let (tx, rx) = mpsc::channel(self.0.len().max(1));
        for member in &self.0 {
            let _ = tx.send(Res::chunk(member.clone())).await;
        }
        rx
    }

    async fn finish(&self) -> Result<(), ProcError> {
        Ok(())
    }
}
