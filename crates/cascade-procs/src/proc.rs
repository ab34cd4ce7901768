//! Result streams and the `Proc` trait.

use std::fmt;

use async_trait::async_trait;
use cascade_core::Chunk;
use tokio::sync::mpsc;

use crate::error::ProcError;

/// One result on a processor's stream. A result may carry a chunk, an
/// error, or both: a failed read-back still forwards its chunk so
/// downstream stages can account for it.
#[derive(Debug)]
pub struct Res {
    /// Chunk produced, if any.
    pub chunk: Option<Chunk>,
    /// Error encountered, if any.
    pub err: Option<ProcError>,
}

impl Res {
    /// A successful result carrying `chunk`.
    pub fn chunk(chunk: Chunk) -> Self {
        Self {
            chunk: Some(chunk),
            err: None,
        }
    }

    /// An error-only result.
    pub fn err(err: ProcError) -> Self {
        Self {
            chunk: None,
            err: Some(err),
        }
    }
}

/// A finite stream of processor results. The sender side closing signals
/// completion; buffers are bounded so an undrained stream exerts
/// backpressure instead of growing.
pub type ResStream = mpsc::Receiver<Res>;

/// A pipeline stage: turns one chunk into a stream of results.
#[async_trait]
pub trait Proc: Send + Sync {
    /// Process one chunk. The returned stream is finite. An in-place stage
    /// yields exactly one result carrying the (possibly mutated) input.
    async fn process(&self, chunk: Chunk) -> ResStream;

    /// Flush and release resources. Called exactly once per processor,
    /// after every stream it produced has been drained.
    async fn finish(&self) -> Result<(), ProcError>;
}

impl fmt::Debug for dyn Proc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn Proc")
    }
}

/// In-place processor built from a closure. Emits exactly one result
/// carrying the mutated input chunk and the closure's error, if any.
pub struct InplaceFunc<F>(pub F);

#[async_trait]
impl<F> Proc for InplaceFunc<F>
where
    F: Fn(&mut Chunk) -> Result<(), ProcError> + Send + Sync,
{
    async fn process(&self, mut chunk: Chunk) -> ResStream {
        let (tx, rx) = mpsc::channel(1);
        let err = (self.0)(&mut chunk).err();
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

/// Forwards the input chunk untouched.
pub struct Nop;

#[async_trait]
impl Proc for Nop {
    async fn process(&self, chunk: Chunk) -> ResStream {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.send(Res::chunk(chunk)).await;
        rx
    }

    async fn finish(&self) -> Result<(), ProcError> {
        Ok(())
    }
}

/// Drain `stream`, collecting every chunk and the first error.
pub async fn read_chunks(mut stream: ResStream) -> (Vec<Chunk>, Option<ProcError>) {
    let mut chunks = Vec::new();
    let mut first_err = None;
    while let Some(res) = stream.recv().await {
        if let Some(chunk) = res.chunk {
            chunks.push(chunk);
        }
        if let Some(err) = res.err {
            first_err.get_or_insert(err);
        }
    }
    (chunks, first_err)
}
