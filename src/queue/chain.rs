//! Nested composition of queues
//!
//! A chain admits one operation through every member in order: the first
//! member is the outermost gate and the last the innermost. Each member keeps
//! its slot or resource until everything nested inside it has finished.

use crate::queue::error::{QueueError, QueueResult};
use crate::queue::traits::{self, AsyncQueue, BoxOperation};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct QueueChain {
    members: Vec<Arc<dyn AsyncQueue>>,
}

impl std::fmt::Debug for QueueChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueChain")
            .field("members", &self.members.len())
            .finish()
    }
}

impl QueueChain {
    /// Chain `members`, outermost first; an empty chain runs operations directly
    pub fn new(members: Vec<Arc<dyn AsyncQueue>>) -> Self {
        Self { members }
    }

    /// Append an innermost member
    pub fn then(mut self, member: Arc<dyn AsyncQueue>) -> Self {
        self.members.push(member);
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
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

fn run_nested<'a>(
    members: &'a [Arc<dyn AsyncQueue>],
    operation: BoxOperation<'a>,
) -> BoxFuture<'a, QueueResult<()>> {
    match members.split_first() {
        None => Box::pin(async move {
            operation.await;
            Ok(())
        }),
        Some((outer, inner)) => Box::pin(async move {
            let mut nested = Ok(());
            let slot = &mut nested;
            outer
                .run(Box::pin(async move {
                    *slot = run_nested(inner, operation).await;
                }))
                .await?;
            nested
        }),
    }
}

#[async_trait]
impl AsyncQueue for QueueChain {
    async fn run(&self, operation: BoxOperation<'_>) -> QueueResult<()> {
        run_nested(&self.members, operation).await
    }

    async fn cancel(&self) {
        for member in &self.members {
            member.cancel().await;
        }
    }
}
