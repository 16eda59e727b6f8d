//! Capacity-bounded FIFO concurrency gate
//!
//! At most `capacity` operations run at once. Callers beyond that wait in
//! arrival order. When a running operation finishes, its slot is handed
//! straight to the oldest live waiter instead of being released and
//! re-acquired, so the active count never dips while others wait.
//!
//! A waiter that was handed a slot but had not started when `cancel()` ran is
//! refused by the registry and passes the slot on.

use crate::core::sync::lock_or_recover;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::registry::CancellationRegistry;
use crate::queue::traits::{AsyncQueue, BoxOperation};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

#[derive(Debug, Default)]
struct SlotState {
    active: usize,
    waiters: VecDeque<oneshot::Sender<SlotPermit>>,
}

#[derive(Debug)]
struct Slots {
    capacity: usize,
    state: Mutex<SlotState>,
}

impl Slots {
    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState> {
        lock_or_recover(&self.state, "capacity queue")
    }

    /// Hand the slot to the oldest live waiter, or free it
    fn release(self: &Arc<Self>) {
        let mut state = self.lock();

        while let Some(waiter) = state.waiters.pop_front() {
            match waiter.send(SlotPermit::new(Arc::clone(self))) {
                Ok(()) => {
                    log::trace!(
                        "Slot handed to next waiter ({} still queued)",
                        state.waiters.len()
                    );
                    return;
                }
                // Waiter gave up; the permit must not release a second time
                Err(permit) => permit.disarm(),
            }
        }

        state.active -= 1;
    }
}

/// One occupied slot; dropping it hands the slot on
#[derive(Debug)]
pub(crate) struct SlotPermit {
    slots: Option<Arc<Slots>>,
}

impl SlotPermit {
    fn new(slots: Arc<Slots>) -> Self {
        Self { slots: Some(slots) }
    }

    fn disarm(mut self) {
        self.slots = None;
    }
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        if let Some(slots) = self.slots.take() {
            slots.release();
        }
    }
}

/// FIFO queue admitting at most `capacity` concurrent operations
///
/// # Example
/// ```rust
/// use taskgate::queue::api::{CapacityQueue, QueueError};
///
/// # async fn example() -> Result<(), QueueError> {
/// let queue = CapacityQueue::new(2)?;
/// let answer = queue.exec(|| async { Ok::<_, QueueError>(42) }).await?;
/// assert_eq!(answer, 42);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CapacityQueue {
    slots: Arc<Slots>,
    registry: CancellationRegistry,
}

impl Default for CapacityQueue {
    /// Capacity 1, i.e. mutual exclusion
    fn default() -> Self {
        Self::bounded(1)
    }
}

impl CapacityQueue {
    /// Create a queue admitting `capacity` concurrent operations
    ///
    /// Fails with [`QueueError::InvalidConfig`] when `capacity` is zero.
    pub fn new(capacity: usize) -> QueueResult<Self> {
        if capacity == 0 {
            return Err(QueueError::invalid_config(
                "capacity must be at least 1",
            ));
        }
        Ok(Self::bounded(capacity))
    }

    pub(crate) fn bounded(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Slots {
                capacity: capacity.max(1),
                state: Mutex::new(SlotState::default()),
            }),
            registry: CancellationRegistry::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity
    }

    /// Operations currently holding a slot
    pub fn active(&self) -> usize {
        self.slots.lock().active
    }

    /// Callers currently suspended waiting for a slot
    pub fn waiting(&self) -> usize {
        self.slots.lock().waiters.len()
    }

    pub(crate) async fn acquire(&self) -> QueueResult<SlotPermit> {
        let receiver = {
            let mut state = self.slots.lock();
            if state.active < self.slots.capacity {
                state.active += 1;
                return Ok(SlotPermit::new(Arc::clone(&self.slots)));
            }

            let (sender, receiver) = oneshot::channel();
            state.waiters.push_back(sender);
            log::trace!(
                "Queue at capacity {}, caller waiting (position {})",
                self.slots.capacity,
                state.waiters.len()
            );
            receiver
        };

        // A dropped sender means cancel() discarded this waiter
        receiver.await.map_err(|_| QueueError::Cancelled)
    }

    /// Run `operation` once it is admitted, returning its own result
    pub async fn exec<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<QueueError>,
    {
        let ticket = self.registry.ticket();
        let permit = self.acquire().await?;
        let outcome = self
            .registry
            .run(ticket, async move { operation().await })
            .await;
        drop(permit);
        outcome?
    }
}

#[async_trait]
impl AsyncQueue for CapacityQueue {
    async fn run(&self, operation: BoxOperation<'_>) -> QueueResult<()> {
        let ticket = self.registry.ticket();
        let permit = self.acquire().await?;
        let outcome = self.registry.run(ticket, operation).await;
        drop(permit);
        outcome
    }

    async fn cancel(&self) {
        let waiters = std::mem::take(&mut self.slots.lock().waiters);
        let dropped = waiters.len();
        drop(waiters);

        let interrupted = self.registry.cancel_all().await;
        log::debug!(
            "Capacity queue cancelled: {} waiters failed, {} running operations interrupted",
            dropped,
            interrupted
        );
    }
}
