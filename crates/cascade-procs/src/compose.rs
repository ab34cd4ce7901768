//! Composers wrapping one processor into another.

use std::sync::Arc;

use async_trait::async_trait;
use cascade_core::Chunk;
use tokio::sync::mpsc;

use crate::error::ProcError;
use crate::proc::{Proc, Res, ResStream};

/// Drains the inner processor's stream and forwards only its errors, with
/// chunks stripped. Lets a fan-out stage run for effect without flooding
/// downstream with copies of the driving chunk.
pub struct DiscardChunks {
    inner: Arc<dyn Proc>,
}

impl DiscardChunks {
    /// Wrap `inner`.
    pub fn new(inner: Arc<dyn Proc>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Proc for DiscardChunks {
    async fn process(&self, chunk: Chunk) -> ResStream {
        let mut inner = self.inner.process(chunk).await;
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move {
            while let Some(res) = inner.recv().await {
                if let Some(err) = res.err {
                    if tx.send(Res::err(err)).await.is_err() {
                        return;
                    }
                }
            }
        });
        rx
    }

    async fn finish(&self) -> Result<(), ProcError> {
        self.inner.finish().await
    }
}

/// Hook fired when a wrapped stream terminates, with the first error the
/// stream carried (if any).
pub type EndHook = Arc<dyn Fn(Option<&ProcError>) + Send + Sync>;

/// Forwards the inner stream unchanged and fires a hook exactly once when
/// it terminates, before the downstream channel closes.
pub struct OnEnd {
    inner: Arc<dyn Proc>,
    hook: EndHook,
}

impl OnEnd {
    /// Wrap `inner`; `hook` fires at the end of each stream `process`
    /// produces.
    pub fn new(inner: Arc<dyn Proc>, hook: impl Fn(Option<&ProcError>) + Send + Sync + 'static) -> Self {
        Self {
            inner,
            hook: Arc::new(hook),
        }
    }
}

#[async_trait]
impl Proc for OnEnd {
    async fn process(&self, chunk: Chunk) -> ResStream {
        let mut inner = self.inner.process(chunk).await;
        let (tx, rx) = mpsc::channel(1);
        let hook = Arc::clone(&self.hook);
        tokio::spawn(async move {
            let mut first_err: Option<ProcError> = None;
            while let Some(res) = inner.recv().await {
                if first_err.is_none() {
                    first_err = res.err.clone();
                }
                if tx.send(res).await.is_err() {
                    // downstream stopped draining; the hook still owes its
                    // one invocation
                    break;
                }
            }
            hook(first_err.as_ref());
        });
        rx
    }

    async fn finish(&self) -> Result<(), ProcError> {
        self.inner.finish().await
    }
}
