//! TOML configuration for the queue family
//!
//! A [`QueueConfig`] describes the construction parameters of every queue
//! flavour. Missing keys fall back to the same defaults as the constructors,
//! and unknown keys are rejected so that typos surface early.

use crate::queue::capacity::CapacityQueue;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::interval::{IntervalGate, DEFAULT_INTERVAL};
use crate::queue::pool::ResourcePool;
use crate::queue::priority::{Priority, PriorityRouter, DEFAULT_LANES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors raised while loading a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] QueueError),
}

/// One `(priority, capacity)` lane of a priority router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaneConfig {
    pub priority: Priority,
    pub capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    /// Concurrent operations admitted by a capacity queue
    pub capacity: usize,
    /// Minimum spacing for interval and debounce gates, in milliseconds
    pub interval_ms: u64,
    /// Number of resources created for a resource pool
    pub resources: usize,
    /// Priority router lanes
    pub lanes: Vec<LaneConfig>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 1,
            interval_ms: DEFAULT_INTERVAL.as_millis() as u64,
            resources: 5,
            lanes: DEFAULT_LANES
                .iter()
                .map(|&(priority, capacity)| LaneConfig { priority, capacity })
                .collect(),
        }
    }
}

impl QueueConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: QueueConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_toml_str(&contents)?;
        log::debug!("Loaded queue configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> QueueResult<()> {
        if self.capacity == 0 {
            return Err(QueueError::invalid_config("capacity must be at least 1"));
        }
        if self.interval_ms == 0 {
            return Err(QueueError::invalid_config("interval_ms must be positive"));
        }
        if self.resources == 0 {
            return Err(QueueError::invalid_config("resources must be at least 1"));
        }
        // Lane rules are owned by the router itself
        PriorityRouter::new(self.lane_pairs()).map(|_| ())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    fn lane_pairs(&self) -> Vec<(Priority, usize)> {
        self.lanes
            .iter()
            .map(|lane| (lane.priority, lane.capacity))
            .collect()
    }

    pub fn capacity_queue(&self) -> QueueResult<CapacityQueue> {
        CapacityQueue::new(self.capacity)
    }

    pub fn interval_gate(&self) -> QueueResult<IntervalGate> {
        IntervalGate::new(self.interval())
    }

    pub fn priority_router(&self) -> QueueResult<PriorityRouter> {
        PriorityRouter::new(self.lane_pairs())
    }

    /// Build a pool of `resources` values produced by `factory(index)`
    pub fn resource_pool<R, F>(&self, factory: F) -> QueueResult<ResourcePool<R>>
    where
        R: Send + 'static,
        F: FnMut(usize) -> R,
    {
        ResourcePool::new((0..self.resources).map(factory))
    }
}
