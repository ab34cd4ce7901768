//! Copiers: destinations that can store chunks and enumerate their holdings.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use cascade_core::{Chunk, Hash};
use cascade_procs::{Proc, ProcError, ResStream};
use serde::{Deserialize, Serialize};

/// Identity of one copier. Chosen by the embedding configuration; opaque to
/// the engine beyond equality, ordering and hashing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CopierId(String);

impl CopierId {
    /// Wrap a configured name.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The configured name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CopierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CopierId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One entry a copier reports it currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LsEntry {
    /// Content hash of the stored chunk.
    pub hash: Hash,
    /// Stored size in bytes.
    pub size: u64,
}

/// Enumerates the chunks a destination currently holds.
///
/// Implementations skip entries of their own that do not identify a chunk
/// (someone else's files); an error aborts the caller's whole scan.
#[async_trait]
pub trait Lister: Send + Sync {
    /// List every held entry.
    async fn ls(&self) -> Result<Vec<LsEntry>, ProcError>;
}

/// A fixed, pre-materialized listing.
#[derive(Debug, Clone, Default)]
pub struct SliceLister(pub Vec<LsEntry>);

#[async_trait]
impl Lister for SliceLister {
    async fn ls(&self) -> Result<Vec<LsEntry>, ProcError> {
        Ok(self.0.clone())
    }
}

/// A destination: a writer (`proc`) and an enumerator (`lister`) under one
/// id. Registered once with the quota manager at startup and never created
/// mid-run.
#[derive(Clone)]
pub struct Copier {
    id: CopierId,
    lister: Arc<dyn Lister>,
    proc: Arc<dyn Proc>,
}

impl Copier {
    /// Assemble a destination.
    pub fn new(id: CopierId, lister: Arc<dyn Lister>, proc: Arc<dyn Proc>) -> Self {
        Self { id, lister, proc }
    }

    /// The destination's identity.
    pub fn id(&self) -> &CopierId {
        &self.id
    }

    /// The destination's enumerator.
    pub fn lister(&self) -> &Arc<dyn Lister> {
        &self.lister
    }
}

impl fmt::Debug for Copier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Copier").field("id", &self.id).finish()
    }
}

#[async_trait]
impl Proc for Copier {
    async fn process(&self, chunk: Chunk) -> ResStream {
        self.proc.process(chunk).await
    }

    async fn finish(&self) -> Result<(), ProcError> {
        self.proc.finish().await
    }
}

/// Substitutes a bound chunk for whatever chunk drives the pipeline, so a
/// copy operation targets its own chunk even when driven by a bare group
/// carrier.
pub struct ChunkArg {
    inner: Arc<dyn Proc>,
    chunk: Chunk,
}

impl ChunkArg {
    /// Bind `chunk` as the argument `inner` will actually process.
    pub fn new(inner: Arc<dyn Proc>, chunk: Chunk) -> Self {
        Self { inner, chunk }
    }
}

#[async_trait]
impl Proc for ChunkArg {
    async fn process(&self, _chunk: Chunk) -> ResStream {
        self.inner.process(self.chunk.clone()).await
    }

    async fn finish(&self) -> Result<(), ProcError> {
        self.inner.finish().await
    }
}
