//! Admission-Control Queue Component
//!
//! A family of composable queues that decide how many asynchronous operations
//! may run at once, in which order waiting callers are admitted, how a fixed
//! set of exclusive resources is shared, and how far apart successive
//! operations must be.
//!
//! # Overview
//!
//! - **CapacityQueue**: FIFO gate admitting at most `capacity` operations
//! - **IntervalGate**: minimum spacing between a completion and the next start
//! - **ResourcePool**: exclusive leases on a fixed set of resources
//! - **PriorityRouter**: independent capacity lanes selected by ambient priority
//! - **DebounceGate**: interval gate in front of a delegate queue
//! - **QueueChain**: nested admission through an ordered list of queues
//!
//! Waiting callers are suspended futures, not blocked threads. A finished
//! operation hands its slot or resource directly to the oldest waiter.
//!
//! # Architecture
//!
//! ```text
//!   caller ──exec──▶ QueueChain
//!                     │ run (outermost)
//!                     ▼
//!                 ResourcePool ──lease──┐
//!                     │ run             │ held until the
//!                     ▼                 │ nested operation
//!                 PriorityRouter        │ completes
//!                 ┌────┼─────┐          │
//!                low  medium high       │
//!                 │ run                 │
//!                 ▼                     │
//!             operation ◀───────────────┘
//! ```
//!
//! # Cancellation
//!
//! `cancel()` fails every waiting caller with [`QueueError::Cancelled`],
//! interrupts every running operation at its next suspension point, waits for
//! them to unwind and leaves the queue open for new calls.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskgate::queue::api::*;
//!
//! # async fn example() -> Result<(), QueueError> {
//! let pool: Arc<dyn AsyncQueue> = Arc::new(ResourcePool::new(vec![(); 4])?);
//! let limit: Arc<dyn AsyncQueue> = Arc::new(CapacityQueue::new(2)?);
//! let chain = QueueChain::new(vec![pool, limit]);
//!
//! let value = chain.exec(|| async { Ok::<_, QueueError>(1 + 1) }).await?;
//! assert_eq!(value, 2);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod capacity;
pub mod chain;
pub mod config;
pub mod debounce;
mod error;
pub mod interval;
pub mod pool;
pub mod priority;
pub mod registry;
pub mod timeout;
pub mod traits;

pub use error::{QueueError, QueueResult};

#[cfg(test)]
mod tests;
