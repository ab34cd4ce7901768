//! Aggregated shutdown across a set of processors.

use std::sync::Arc;

use tracing::warn;

use crate::error::ProcError;
use crate::proc::Proc;

/// Invoke `finish()` on every processor concurrently. All of them run to
/// completion regardless of failures; the first error (in argument order)
/// is returned and the rest are logged.
pub async fn finish_first_err(procs: &[Arc<dyn Proc>]) -> Result<(), ProcError> {
    let mut handles = Vec::with_capacity(procs.len());
    for proc in procs {
        let proc = Arc::clone(proc);
        handles.push(tokio::spawn(async move { proc.finish().await }));
    }

    let mut first: Option<ProcError> = None;
    for handle in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(join_err) => Err(ProcError::other(format!("finisher panicked: {join_err}"))),
        };
        if let Err(err) = result {
            if first.is_none() {
                first = Some(err);
            } else {
                warn!(error = %err, "additional finish error");
            }
        }
    }

    match first {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proc::{Res, ResStream};
    use async_trait::async_trait;
    use cascade_core::Chunk;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::mpsc;

    struct FinishProbe {
        err: Option<ProcError>,
        called: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Proc for FinishProbe {
        async fn process(&self, chunk: Chunk) -> ResStream {
            let (tx, rx) = mpsc::channel(1);
            let _ = tx.send(Res::chunk(chunk)).await;
            rx
        }

        async fn finish(&self) -> Result<(), ProcError> {
            self.called.store(true, Ordering::SeqCst);
            match &self.err {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    fn probe(err: Option<ProcError>) -> (Arc<dyn Proc>, Arc<AtomicBool>) {
        let called = Arc::new(AtomicBool::new(false));
        let proc = Arc::new(FinishProbe {
            err,
            called: Arc::clone(&called),
        });
        (proc, called)
    }

    #[tokio::test]
    async fn all_ok() {
        let (a, _) = probe(None);
        let (b, _) = probe(None);
        assert!(finish_first_err(&[a, b]).await.is_ok());
    }

    #[tokio::test]
    async fn first_error_wins_and_all_run() {
        let (a, called_a) = probe(None);
        let (b, called_b) = probe(Some(ProcError::other("err x")));
        let (c, called_c) = probe(Some(ProcError::other("err y")));
        let err = finish_first_err(&[a, b, c]).await.unwrap_err();
        assert!(err == ProcError::other("err x") || err == ProcError::other("err y"));
        assert!(called_a.load(Ordering::SeqCst));
        assert!(called_b.load(Ordering::SeqCst));
        assert!(called_c.load(Ordering::SeqCst));
    }
}
