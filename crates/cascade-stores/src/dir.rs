//! Directory-backed store: one file per chunk, named by content hash.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use cascade_core::{Chunk, Data, Hash};
use cascade_procs::{Proc, ProcError, Res, ResStream};
use tokio::sync::mpsc;

use crate::copier::{Lister, LsEntry};
use crate::store::Store;

/// A store rooted at a directory. Each chunk is one file whose name is the
/// lowercase hex of its hash and whose contents are the chunk bytes.
#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    /// Use `dir` as the storage root. The directory must exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, hash: Hash) -> PathBuf {
        self.dir.join(hash.to_hex())
    }
}

impl Store for DirStore {
    fn proc(&self) -> Arc<dyn Proc> {
        Arc::new(DirWriter {
            store: self.clone(),
        })
    }

    fn unproc(&self) -> Arc<dyn Proc> {
        Arc::new(DirReader {
            store: self.clone(),
        })
    }
}

#[async_trait]
impl Lister for DirStore {
    /// Scan the directory. Names that do not parse as full-width hex are
    /// someone else's files and are skipped; everything else is fatal.
    async fn ls(&self) -> Result<Vec<LsEntry>, ProcError> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let hash = match name.to_str().map(Hash::from_hex) {
                Some(Ok(hash)) => hash,
                _ => continue,
            };
            let meta = entry.metadata().await?;
            entries.push(LsEntry {
                hash,
                size: meta.len(),
            });
        }
        Ok(entries)
    }
}

struct DirWriter {
    store: DirStore,
}

#[async_trait]
impl Proc for DirWriter {
    async fn process(&self, chunk: Chunk) -> ResStream {
        let (tx, rx) = mpsc::channel(1);
        let err = match chunk.data().bytes() {
            Some(bytes) => tokio::fs::write(self.store.path_for(chunk.hash()), bytes)
                .await
                .err()
                .map(ProcError::from),
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

struct DirReader {
    store: DirStore,
}

#[async_trait]
impl Proc for DirReader {
    async fn process(&self, mut chunk: Chunk) -> ResStream {
        let (tx, rx) = mpsc::channel(1);
        let res = match tokio::fs::read(self.store.path_for(chunk.hash())).await {
            Ok(bytes) => {
                chunk.set_data(Data::from(bytes));
                Res::chunk(chunk)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let hash = chunk.hash();
                Res {
                    chunk: Some(chunk),
                    err: Some(ProcError::MissingData { hash }),
                }
            }
            Err(err) => Res {
                chunk: Some(chunk),
                err: Some(err.into()),
            },
        };
        let _ = tx.send(res).await;
        rx
    }

    async fn finish(&self) -> Result<(), ProcError> {
        Ok(())
    }
}
