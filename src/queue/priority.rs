//! Priority routing across independent capacity lanes
//!
//! The router owns one [`CapacityQueue`] per configured priority class. Each
//! call is routed by the ambient priority of the calling task, set with
//! [`with_priority`], and admission is delegated entirely to that lane. Lanes
//! never share slots, so a backlog in one lane cannot starve another.
//!
//! The ambient priority is task-local: it follows the future passed to
//! [`with_priority`] but is not inherited by tasks spawned from it.

use crate::queue::capacity::CapacityQueue;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::traits::{AsyncQueue, BoxOperation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use strum_macros::{Display, EnumIter, EnumString};

/// Priority class of the calling context
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

tokio::task_local! {
    static CURRENT_PRIORITY: Priority;
}

/// Run `future` with `priority` as its ambient priority
pub async fn with_priority<F: Future>(priority: Priority, future: F) -> F::Output {
    CURRENT_PRIORITY.scope(priority, future).await
}

/// Ambient priority of the current task, [`Priority::Medium`] when unset
pub fn current_priority() -> Priority {
    CURRENT_PRIORITY.try_with(|priority| *priority).unwrap_or_default()
}

/// Default lanes: low = 10, medium = 5, high = 2
pub const DEFAULT_LANES: [(Priority, usize); 3] = [
    (Priority::Low, 10),
    (Priority::Medium, 5),
    (Priority::High, 2),
];

#[derive(Debug)]
pub struct PriorityRouter {
    /// Sorted by ascending priority, never empty
    lanes: Vec<(Priority, CapacityQueue)>,
}

impl Default for PriorityRouter {
    fn default() -> Self {
        Self {
            lanes: DEFAULT_LANES
                .iter()
                .map(|&(priority, capacity)| (priority, CapacityQueue::bounded(capacity)))
                .collect(),
        }
    }
}

impl PriorityRouter {
    /// Build a router from `(priority, capacity)` pairs
    ///
    /// Rejects an empty lane list, a duplicated priority and a zero capacity.
    pub fn new(lanes: impl IntoIterator<Item = (Priority, usize)>) -> QueueResult<Self> {
        let mut built: Vec<(Priority, CapacityQueue)> = Vec::new();

        for (priority, capacity) in lanes {
            if built.iter().any(|(existing, _)| *existing == priority) {
                return Err(QueueError::invalid_config(format!(
                    "lane '{}' is configured more than once",
                    priority
                )));
            }
            let queue = CapacityQueue::new(capacity).map_err(|_| {
                QueueError::invalid_config(format!("lane '{}' needs a capacity of at least 1", priority))
            })?;
            built.push((priority, queue));
        }

        if built.is_empty() {
            return Err(QueueError::invalid_config(
                "priority router needs at least one lane",
            ));
        }

        built.sort_by_key(|(priority, _)| *priority);
        Ok(Self { lanes: built })
    }

    /// Configured priorities, lowest first
    pub fn priorities(&self) -> Vec<Priority> {
        self.lanes.iter().map(|(priority, _)| *priority).collect()
    }

    /// Lane serving `priority`
    ///
    /// An exact match wins; otherwise the closest lower lane, then the
    /// closest higher one.
    pub fn lane(&self, priority: Priority) -> &CapacityQueue {
        let (_, queue) = self
            .lanes
            .iter()
            .rev()
            .find(|(lane, _)| *lane <= priority)
            .unwrap_or(&self.lanes[0]);
        queue
    }

    /// Run `operation` in the lane selected by the ambient priority
    pub async fn exec<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<QueueError>,
    {
        let priority = current_priority();
        log::trace!("Routing operation to the {} lane", priority);
        self.lane(priority).exec(operation).await
    }
}

#[async_trait]
impl AsyncQueue for PriorityRouter {
    async fn run(&self, operation: BoxOperation<'_>) -> QueueResult<()> {
        self.lane(current_priority()).run(operation).await
    }

    async fn cancel(&self) {
        futures::future::join_all(self.lanes.iter().map(|(_, queue)| queue.cancel())).await;
    }
}
