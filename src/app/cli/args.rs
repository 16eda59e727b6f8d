//! Command-line arguments
//!
//! Global options control logging, colour and report format; the subcommand
//! picks the scenario to drive and carries its own sizing flags. Queue
//! parameters given here override the configuration file.

use crate::core::styles::palette_to_clap;
use crate::core::validation::{validate_interval_ms, validate_positive_int};
use crate::core::version;
use crate::queue::api::QueueConfig;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "taskgate")]
#[command(about = "Drive admission-control queues through stress scenarios")]
#[command(version = version::version(), long_version = version::long_version())]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", global = true,
          value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", global = true,
          value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Log file path (use 'none' to log to stderr)
    #[arg(short = 'f', long = "log-file", value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Force coloured output
    #[arg(long = "color", conflicts_with = "no_color", global = true)]
    pub color: bool,

    /// Disable coloured output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Print the report as JSON
    #[arg(long = "json", global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub scenario: Scenario,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Scenario {
    /// Bounded concurrency: odd operations fail, even ones count
    Capacity {
        /// Operations to submit
        #[arg(short = 'n', long, default_value_t = 100_000, value_parser = validate_positive_int)]
        operations: usize,

        /// Concurrent operations admitted
        #[arg(long, value_parser = validate_positive_int)]
        capacity: Option<usize>,
    },

    /// Resource pool shared by several launchers under a time budget
    Pool {
        #[arg(short = 'n', long, default_value_t = 200, value_parser = validate_positive_int)]
        operations: usize,

        /// Tasks submitting operations concurrently
        #[arg(long, default_value_t = 2, value_parser = validate_positive_int)]
        launchers: usize,

        /// Resources in the pool
        #[arg(long, value_parser = validate_positive_int)]
        resources: Option<usize>,

        /// Milliseconds each operation holds its resource
        #[arg(long = "hold-ms", default_value_t = 5)]
        hold_ms: u64,

        /// Seconds allowed for the whole run
        #[arg(long = "budget-secs", default_value_t = 10, value_parser = validate_positive_int)]
        budget_secs: usize,
    },

    /// Low, medium and high priority traffic through independent lanes
    Priority {
        /// Operations per priority
        #[arg(short = 'n', long, default_value_t = 20, value_parser = validate_positive_int)]
        operations: usize,

        #[arg(long = "hold-ms", default_value_t = 5)]
        hold_ms: u64,
    },

    /// Minimum spacing between completion and next dispatch
    Interval {
        #[arg(short = 'n', long, default_value_t = 5, value_parser = validate_positive_int)]
        operations: usize,

        /// Minimum spacing in milliseconds
        #[arg(long = "interval-ms", value_parser = validate_interval_ms)]
        interval_ms: Option<u64>,

        #[arg(long = "hold-ms", default_value_t = 0)]
        hold_ms: u64,
    },

    /// Pool, capacity queue and priority router nested in one chain
    Chain {
        #[arg(short = 'n', long, default_value_t = 30, value_parser = validate_positive_int)]
        operations: usize,

        #[arg(long, value_parser = validate_positive_int)]
        capacity: Option<usize>,

        #[arg(long, value_parser = validate_positive_int)]
        resources: Option<usize>,

        #[arg(long = "hold-ms", default_value_t = 2)]
        hold_ms: u64,
    },
}

impl Args {
    /// Parse the process arguments with coloured help when stdout is a terminal
    pub fn parse_with_styles() -> Self {
        let plain = std::env::args().any(|arg| arg == "--no-color");
        let styled = !plain && std::io::stdout().is_terminal();
        let matches = Self::command().styles(palette_to_clap(styled)).get_matches();
        Self::from_arg_matches(&matches).unwrap_or_else(|err| err.exit())
    }

    /// `--color` and `--no-color` win; otherwise colour follows the terminal
    pub fn use_color(&self) -> bool {
        if self.no_color {
            false
        } else if self.color {
            true
        } else {
            std::io::stdout().is_terminal()
        }
    }
}

impl Scenario {
    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Capacity { .. } => "capacity",
            Scenario::Pool { .. } => "pool",
            Scenario::Priority { .. } => "priority",
            Scenario::Interval { .. } => "interval",
            Scenario::Chain { .. } => "chain",
        }
    }

    pub fn operations(&self) -> usize {
        match self {
            Scenario::Capacity { operations, .. }
            | Scenario::Pool { operations, .. }
            | Scenario::Priority { operations, .. }
            | Scenario::Interval { operations, .. }
            | Scenario::Chain { operations, .. } => *operations,
        }
    }

    /// Copy queue parameters given on the command line into `config`
    pub fn apply_overrides(&self, config: &mut QueueConfig) {
        match self {
            Scenario::Capacity { capacity, .. } => {
                if let Some(capacity) = capacity {
                    config.capacity = *capacity;
                }
            }
            Scenario::Pool { resources, .. } => {
                if let Some(resources) = resources {
                    config.resources = *resources;
                }
            }
            Scenario::Priority { .. } => {}
            Scenario::Interval { interval_ms, .. } => {
                if let Some(interval_ms) = interval_ms {
                    config.interval_ms = *interval_ms;
                }
            }
            Scenario::Chain {
                capacity,
                resources,
                ..
            } => {
                if let Some(capacity) = capacity {
                    config.capacity = *capacity;
                }
                if let Some(resources) = resources {
                    config.resources = *resources;
                }
            }
        }
    }
}
