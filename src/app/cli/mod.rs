//! Argument parsing and configuration discovery

pub mod args;
pub mod config;
