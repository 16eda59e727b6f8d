//! Minimum-interval gate
//!
//! Operations pass one at a time through a capacity-1 [`CapacityQueue`]. Before
//! an operation starts, the gate sleeps until `interval` has elapsed since the
//! previous completion. Spacing is therefore measured from completions, not
//! from a fixed clock grid.

use crate::core::sync::lock_or_recover;
use crate::core::time::{Clock, TokioClock};
use crate::queue::capacity::CapacityQueue;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::traits::{self, AsyncQueue, BoxOperation};
use async_trait::async_trait;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

pub struct IntervalGate {
    interval: Duration,
    clock: Arc<dyn Clock>,
    last_completion: Mutex<Instant>,
    queue: CapacityQueue,
}

impl std::fmt::Debug for IntervalGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalGate")
            .field("interval", &self.interval)
            .field("queue", &self.queue)
            .finish()
    }
}

impl Default for IntervalGate {
    fn default() -> Self {
        Self::unchecked(DEFAULT_INTERVAL, Arc::new(TokioClock))
    }
}

impl IntervalGate {
    /// Create a gate enforcing `interval` between completion and next start
    ///
    /// The clock starts at construction, so the first operation also waits
    /// one full interval.
    pub fn new(interval: Duration) -> QueueResult<Self> {
        Self::with_clock(interval, Arc::new(TokioClock))
    }

    pub fn with_clock(interval: Duration, clock: Arc<dyn Clock>) -> QueueResult<Self> {
        if interval.is_zero() {
            return Err(QueueError::invalid_config("interval must be positive"));
        }
        Ok(Self::unchecked(interval, clock))
    }

    fn unchecked(interval: Duration, clock: Arc<dyn Clock>) -> Self {
        let started = clock.now();
        Self {
            interval,
            clock,
            last_completion: Mutex::new(started),
            queue: CapacityQueue::default(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 1 while an operation is waiting out the interval or running
    pub fn active(&self) -> usize {
        self.queue.active()
    }

    pub fn waiting(&self) -> usize {
        self.queue.waiting()
    }

    /// Time left before the next operation may start
    pub fn remaining(&self) -> Duration {
        let last = *lock_or_recover(&self.last_completion, "interval gate");
        let elapsed = self.clock.now().saturating_duration_since(last);
        self.interval.saturating_sub(elapsed)
    }

    async fn gated(&self, operation: BoxOperation<'_>) {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            log::trace!("Interval gate delaying dispatch by {:?}", remaining);
            tokio::time::sleep(remaining).await;
        }

        operation.await;

        *lock_or_recover(&self.last_completion, "interval gate") = self.clock.now();
    }

    pub async fn exec<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: From<QueueError> + Send,
    {
        traits::exec(self, operation).await
    }
}

#[async_trait]
impl AsyncQueue for IntervalGate {
    async fn run(&self, operation: BoxOperation<'_>) -> QueueResult<()> {
        self.queue.run(Box::pin(self.gated(operation))).await
    }

    async fn cancel(&self) {
        self.queue.cancel().await;
    }
}
