//! Queue capability shared by every admission-control flavour
//!
//! [`AsyncQueue`] is object safe so that heterogeneous queues can be composed
//! (see [`QueueChain`](crate::queue::chain::QueueChain)). The typed entry point
//! is [`exec`], which erases the caller's operation into a [`BoxOperation`],
//! runs it through [`AsyncQueue::run`] and hands the operation's own result
//! back unchanged.

use crate::queue::error::QueueError;
use crate::queue::error::QueueResult;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;

/// Type-erased operation admitted by a queue
pub type BoxOperation<'a> = BoxFuture<'a, ()>;

/// Admission-control capability
///
/// `run` admits the operation, drives it to completion and releases whatever
/// the queue granted (slot, resource, timing window). It fails only with
/// [`QueueError::Cancelled`] when the queue is cancelled while the caller is
/// waiting or while the operation is in flight.
///
/// `cancel` fails every queued waiter, asks every in-flight operation to stop
/// and returns once all of them have unwound. The queue stays usable.
/// Calling `cancel` from inside an operation admitted by the same queue never
/// completes.
#[async_trait]
pub trait AsyncQueue: Send + Sync {
    async fn run(&self, operation: BoxOperation<'_>) -> QueueResult<()>;

    async fn cancel(&self);
}

/// Run `operation` exactly once through `queue`
///
/// The operation's error is returned as-is; a queue cancellation is converted
/// into the caller's error type through `From<QueueError>`.
pub async fn exec<Q, F, Fut, T, E>(queue: &Q, operation: F) -> Result<T, E>
where
    Q: AsyncQueue + ?Sized,
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = Result<T, E>> + Send,
    T: Send,
    E: From<QueueError> + Send,
{
    let mut outcome = None;
    let slot = &mut outcome;

    queue
        .run(Box::pin(async move {
            *slot = Some(operation().await);
        }))
        .await?;

    outcome.unwrap_or_else(|| Err(QueueError::Cancelled.into()))
}

impl dyn AsyncQueue {
    /// Typed execution through a queue trait object
    pub async fn exec<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: From<QueueError> + Send,
    {
        exec(self, operation).await
    }
}
