//! Command-line application

pub mod cli;
pub mod error;
pub mod report;
pub mod scenarios;
pub mod startup;
