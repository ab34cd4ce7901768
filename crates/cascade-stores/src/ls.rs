//! Bootstrap scan: feed existing replicas into quota and replica state.

use std::sync::Arc;

use cascade_procs::ProcError;
use tracing::info;

use crate::copier::{Copier, LsEntry};
use crate::copies::CopiesReg;
use crate::quota::QuotaManager;

/// Receives one listing entry attributed to a copier.
pub trait LsEntryAdder: Send + Sync {
    /// Record `entry` as held by `copier`.
    fn add_ls_entry(&self, copier: &Copier, entry: &LsEntry);
}

/// Feeds the quota manager: held bytes count against the copier's budget.
pub struct QuotaEntryAdder {
    /// The manager to charge.
    pub qman: Arc<QuotaManager>,
}

impl LsEntryAdder for QuotaEntryAdder {
    fn add_ls_entry(&self, copier: &Copier, entry: &LsEntry) {
        self.qman.add_use(copier.id(), entry.size);
    }
}

/// Feeds the replica registry: the copier owns the hash.
pub struct CopiesEntryAdder {
    /// The registry to populate.
    pub reg: Arc<CopiesReg>,
}

impl LsEntryAdder for CopiesEntryAdder {
    fn add_ls_entry(&self, copier: &Copier, entry: &LsEntry) {
        self.reg.entry(entry.hash).add(copier.id().clone());
    }
}

/// Enumerates a set of copiers and pushes every entry into each adder.
pub struct MultiLister {
    copiers: Vec<Copier>,
}

impl MultiLister {
    /// Scan the given copiers.
    pub fn new(copiers: Vec<Copier>) -> Self {
        Self { copiers }
    }

    /// Run every lister and feed each entry to every adder. The first
    /// lister error aborts the whole scan.
    pub async fn add_entries_to(&self, adders: &[&dyn LsEntryAdder]) -> Result<(), ProcError> {
        for copier in &self.copiers {
            let entries = copier.lister().ls().await?;
            info!(copier = %copier.id(), entries = entries.len(), "indexed existing replicas");
            for entry in &entries {
                for adder in adders {
                    adder.add_ls_entry(copier, entry);
                }
            }
        }
        Ok(())
    }
}
