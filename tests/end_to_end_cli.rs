//! CLI Integration Tests
//!
//! Tests are organized by functionality:
//! - `cli::argument_parsing` - global options and scenario subcommands
//! - `cli::toml_config` - configuration files and command-line overrides
//! - `cli::scenarios` - scenario runs through the library entry points

mod cli;
