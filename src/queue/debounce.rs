//! Debounce gate: interval timing in front of a delegate queue
//!
//! A call first passes an [`IntervalGate`] with an empty body, which only
//! spaces out dispatches. The real operation then runs through the delegate
//! queue, so debounced calls honour the delegate's own admission limits as
//! well.

use crate::queue::error::{QueueError, QueueResult};
use crate::queue::interval::IntervalGate;
use crate::queue::traits::{self, AsyncQueue, BoxOperation};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub struct DebounceGate {
    gate: IntervalGate,
    delegate: Arc<dyn AsyncQueue>,
}

impl DebounceGate {
    pub fn new(interval: Duration, delegate: Arc<dyn AsyncQueue>) -> QueueResult<Self> {
        Ok(Self::with_gate(IntervalGate::new(interval)?, delegate))
    }

    pub fn with_gate(gate: IntervalGate, delegate: Arc<dyn AsyncQueue>) -> Self {
        Self { gate, delegate }
    }

    pub fn interval(&self) -> Duration {
        self.gate.interval()
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
impl AsyncQueue for DebounceGate {
    async fn run(&self, operation: BoxOperation<'_>) -> QueueResult<()> {
        self.gate.run(Box::pin(async {})).await?;
        self.delegate.run(operation).await
    }

    async fn cancel(&self) {
        self.gate.cancel().await;
        self.delegate.cancel().await;
    }
}
