#![warn(missing_docs)]

//! Cascade stores: copiers, quota, replica tracking, and the stripe
//! processor that plans replica placement per chunk.
//!
//! A [`Copier`] is a destination that can store chunks and enumerate what it
//! holds. The [`QuotaManager`] tracks byte budgets per destination and
//! filters admissibility; the [`CopiesReg`] tracks which destinations hold
//! which content; the [`StripeProc`] ties both to the placement algorithm
//! and synthesizes the copy fan-out per incoming chunk.

pub mod copier;
pub mod copies;
pub mod dir;
pub mod error;
pub mod ls;
pub mod mem;
pub mod quota;
pub mod store;
pub mod stripe_proc;

pub use copier::{ChunkArg, Copier, CopierId, Lister, LsEntry, SliceLister};
pub use copies::{Copies, CopiesReg};
pub use dir::DirStore;
pub use error::StoreError;
pub use ls::{CopiesEntryAdder, LsEntryAdder, MultiLister, QuotaEntryAdder};
pub use mem::MemStore;
pub use quota::QuotaManager;
pub use store::Store;
pub use stripe_proc::{DynProc, StripeProc};
