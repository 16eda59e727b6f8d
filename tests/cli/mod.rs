//! CLI Integration Test Modules

pub mod argument_parsing;
pub mod scenarios;
pub mod toml_config;
