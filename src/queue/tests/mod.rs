//! Test modules for the queue system
//!
//! Tests are organized by queue flavour, with the shared helpers below.

mod pool;

use crate::queue::error::QueueError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Error type used by test operations
#[derive(Debug, PartialEq, thiserror::Error)]
pub(crate) enum TestError {
    #[error("operation {0} failed")]
    Failed(usize),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Poll `condition` until it holds, failing the test after five seconds
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached within 5s");
}

/// Tracks how many operations run at once and the highest value seen
#[derive(Debug, Default, Clone)]
pub(crate) struct ConcurrencyProbe {
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyProbe {
    pub(crate) fn enter(&self) -> ProbeGuard {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ProbeGuard {
            running: Arc::clone(&self.running),
        }
    }

    pub(crate) fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub(crate) struct ProbeGuard {
    running: Arc<AtomicUsize>,
}

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}
