//! Public API for the queue system
//!
//! External modules should import from here rather than directly from the
//! individual queue modules. See the module documentation for architecture
//! details.

// Capability and typed execution
pub use crate::queue::traits::{exec, AsyncQueue, BoxOperation};

// Queue flavours
pub use crate::queue::capacity::CapacityQueue;
pub use crate::queue::chain::QueueChain;
pub use crate::queue::debounce::DebounceGate;
pub use crate::queue::interval::{IntervalGate, DEFAULT_INTERVAL};
pub use crate::queue::pool::ResourcePool;
pub use crate::queue::priority::{
    current_priority, with_priority, Priority, PriorityRouter, DEFAULT_LANES,
};

// Cancellation bookkeeping
pub use crate::queue::registry::{CancellationRegistry, Ticket};

// Companion utilities
pub use crate::queue::timeout::with_timeout;

// Configuration
pub use crate::queue::config::{ConfigError, LaneConfig, QueueConfig};

// Error handling
pub use crate::queue::error::{QueueError, QueueResult};
