//! In-memory store, the simplest conforming backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use cascade_core::{Chunk, Data, Hash};
use cascade_procs::{Proc, ProcError, Res, ResStream};
use tokio::sync::mpsc;

use crate::copier::{Lister, LsEntry};
use crate::store::Store;

/// A store keeping chunk bytes in a shared map. Useful in tests and as the
/// reference for the store surface.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    inner: Arc<Mutex<HashMap<Hash, Bytes>>>,
}

impl MemStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed content, bypassing the write path.
    pub fn set(&self, hash: Hash, bytes: impl Into<Bytes>) {
        self.inner.lock().unwrap().insert(hash, bytes.into());
    }

    /// The stored bytes for `hash`, if any.
    pub fn get(&self, hash: Hash) -> Option<Bytes> {
        self.inner.lock().unwrap().get(&hash).cloned()
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemStore {
    fn proc(&self) -> Arc<dyn Proc> {
        Arc::new(MemWriter {
            store: self.clone(),
        })
    }

    fn unproc(&self) -> Arc<dyn Proc> {
        Arc::new(MemReader {
            store: self.clone(),
        })
    }
}

#[async_trait]
impl Lister for MemStore {
    async fn ls(&self) -> Result<Vec<LsEntry>, ProcError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .iter()
            .map(|(hash, bytes)| LsEntry {
                hash: *hash,
                size: bytes.len() as u64,
            })
            .collect())
    }
}

struct MemWriter {
    store: MemStore,
}

#[async_trait]
impl Proc for MemWriter {
    async fn process(&self, chunk: Chunk) -> ResStream {
        let (tx, rx) = mpsc::channel(1);
        let err = match chunk.data().bytes() {
            Some(bytes) => {
                self.store.set(chunk.hash(), bytes.clone());
                None
            }
            None => Some(ProcError::DataRequired),
        };
        let _ = tx
            .send(Res {
                chunk: Some(chunk),
                err,
            })
            .await;
        rx
    }

    async fn finish(&self) -> Result<(), ProcError> {
        Ok(())
    }
}

struct MemReader {
    store: MemStore,
}

#[async_trait]
impl Proc for MemReader {
    async fn process(&self, mut chunk: Chunk) -> ResStream {
        let (tx, rx) = mpsc::channel(1);
        let res = match self.store.get(chunk.hash()) {
            Some(bytes) => {
                chunk.set_data(Data::Bytes(bytes));
                Res::chunk(chunk)
            }
            None => {
                let hash = chunk.hash();
                Res {
                    chunk: Some(chunk),
                    err: Some(ProcError::MissingData { hash }),
                }
            }
        };
        let _ = tx.send(res).await;
        rx
    }

    async fn finish(&self) -> Result<(), ProcError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_core::sum;
    use cascade_procs::read_chunks;

    #[tokio::test]
    async fn missing_data_still_forwards_the_chunk() {
        let mem = MemStore::new();
        let chunk = Chunk::with_data(Data::Unsized);
        let hash = chunk.hash();
        let (chunks, err) = read_chunks(mem.unproc().process(chunk).await).await;
        assert_eq!(err, Some(ProcError::MissingData { hash }));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].hash(), hash);
    }

    #[tokio::test]
    async fn set_then_read_back() {
        let mem = MemStore::new();
        let chunk = Chunk::with_data(Data::Unsized);
        mem.set(chunk.hash(), &b"xxx"[..]);
        let (chunks, err) = read_chunks(mem.unproc().process(chunk).await).await;
        assert!(err.is_none());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].data().bytes().unwrap().as_ref(), b"xxx");
    }

    #[tokio::test]
    async fn write_path_stores_bytes() {
        let mem = MemStore::new();
        let payload = b"written".to_vec();
        let chunk = Chunk::new(sum(&payload), Data::from(payload.clone()));
        let (_, err) = read_chunks(mem.proc().process(chunk.clone()).await).await;
        assert!(err.is_none());
        assert_eq!(mem.get(chunk.hash()).unwrap().as_ref(), payload.as_slice());
        assert_eq!(mem.ls().await.unwrap().len(), 1);
    }
}
