//! Fixed pool of exclusively borrowed resources
//!
//! An admitted operation borrows one resource mutably for as long as it runs.
//! The pool keeps the resource in a [`Lease`] for the whole run, so the
//! resource is held exactly while the operation is in flight. When the run
//! ends the lease hands the resource straight to the oldest live waiter, or
//! puts it back at the end of the available set. Resources are never created
//! or destroyed after construction.

use crate::core::sync::lock_or_recover;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::registry::CancellationRegistry;
use crate::queue::traits::{AsyncQueue, BoxOperation};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

struct PoolState<R: Send + 'static> {
    available: VecDeque<R>,
    waiters: VecDeque<oneshot::Sender<Lease<R>>>,
}

struct PoolShared<R: Send + 'static> {
    size: usize,
    state: Mutex<PoolState<R>>,
}

impl<R: Send + 'static> PoolShared<R> {
    fn lock(&self) -> MutexGuard<'_, PoolState<R>> {
        lock_or_recover(&self.state, "resource pool")
    }

    fn release(self: &Arc<Self>, mut resource: R) {
        let mut state = self.lock();

        while let Some(waiter) = state.waiters.pop_front() {
            match waiter.send(Lease::new(resource, Arc::clone(self))) {
                Ok(()) => {
                    log::trace!("Resource handed to next waiter");
                    return;
                }
                // Waiter gave up; take the resource back without releasing it
                Err(mut lease) => match lease.resource.take() {
                    Some(returned) => resource = returned,
                    None => return,
                },
            }
        }

        state.available.push_back(resource);
    }
}

/// One resource taken out of the pool; dropping it returns the resource
pub(crate) struct Lease<R: Send + 'static> {
    resource: Option<R>,
    pool: Arc<PoolShared<R>>,
}

impl<R: Send + 'static> Lease<R> {
    fn new(resource: R, pool: Arc<PoolShared<R>>) -> Self {
        Self {
            resource: Some(resource),
            pool,
        }
    }
}

impl<R: Send + 'static> Drop for Lease<R> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            self.pool.release(resource);
        }
    }
}

/// Multiplexes a fixed set of resources among concurrent callers
///
/// # Example
/// ```rust
/// use taskgate::queue::api::{QueueError, ResourcePool};
///
/// # async fn example() -> Result<(), QueueError> {
/// let pool = ResourcePool::new(vec!["conn-a", "conn-b"])?;
/// let name = pool
///     .exec(|conn| Box::pin(async move { Ok::<_, QueueError>(conn.to_string()) }))
///     .await?;
/// assert!(name.starts_with("conn-"));
/// # Ok(())
/// # }
/// ```
pub struct ResourcePool<R: Send + 'static> {
    shared: Arc<PoolShared<R>>,
    registry: CancellationRegistry,
}

impl<R: Send + 'static> fmt::Debug for ResourcePool<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("size", &self.shared.size)
            .field("available", &self.available())
            .field("waiting", &self.waiting())
            .finish()
    }
}

impl<R: Send + 'static> ResourcePool<R> {
    /// Create a pool owning `resources`; an empty list is rejected
    pub fn new(resources: impl IntoIterator<Item = R>) -> QueueResult<Self> {
        let available: VecDeque<R> = resources.into_iter().collect();
        if available.is_empty() {
            return Err(QueueError::invalid_config(
                "resource pool needs at least one resource",
            ));
        }

        Ok(Self {
            shared: Arc::new(PoolShared {
                size: available.len(),
                state: Mutex::new(PoolState {
                    available,
                    waiters: VecDeque::new(),
                }),
            }),
            registry: CancellationRegistry::new(),
        })
    }

    /// Total number of resources, available or held
    pub fn len(&self) -> usize {
        self.shared.size
    }

    pub fn is_empty(&self) -> bool {
        self.shared.size == 0
    }

    pub fn available(&self) -> usize {
        self.shared.lock().available.len()
    }

    pub fn waiting(&self) -> usize {
        self.shared.lock().waiters.len()
    }

    pub(crate) async fn acquire(&self) -> QueueResult<Lease<R>> {
        let receiver = {
            let mut state = self.shared.lock();
            if let Some(resource) = state.available.pop_front() {
                return Ok(Lease::new(resource, Arc::clone(&self.shared)));
            }

            let (sender, receiver) = oneshot::channel();
            state.waiters.push_back(sender);
            log::trace!(
                "All {} resources held, caller waiting (position {})",
                self.shared.size,
                state.waiters.len()
            );
            receiver
        };

        receiver.await.map_err(|_| QueueError::Cancelled)
    }

    /// Run `operation` with exclusive use of one resource
    ///
    /// The operation borrows the resource and cannot keep it: the pool takes
    /// it back as soon as the returned future completes, fails or is
    /// cancelled.
    pub async fn exec<F, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: for<'r> FnOnce(&'r mut R) -> BoxFuture<'r, Result<T, E>>,
        E: From<QueueError>,
    {
        let ticket = self.registry.ticket();
        let mut lease = self.acquire().await?;
        let outcome = match lease.resource.as_mut() {
            Some(resource) => {
                self.registry
                    .run(ticket, async move { operation(resource).await })
                    .await
            }
            None => Err(QueueError::Cancelled),
        };
        drop(lease);
        outcome?
    }
}

#[async_trait]
impl<R: Send + 'static> AsyncQueue for ResourcePool<R> {
    async fn run(&self, operation: BoxOperation<'_>) -> QueueResult<()> {
        let ticket = self.registry.ticket();
        let lease = self.acquire().await?;
        let outcome = self.registry.run(ticket, operation).await;
        drop(lease);
        outcome
    }

    async fn cancel(&self) {
        let waiters = std::mem::take(&mut self.shared.lock().waiters);
        let dropped = waiters.len();
        drop(waiters);

        let interrupted = self.registry.cancel_all().await;
        log::debug!(
            "Resource pool cancelled: {} waiters failed, {} running operations interrupted",
            dropped,
            interrupted
        );
    }
}
