//! CLI argument parsing tests

use clap::Parser;
use taskgate::app::cli::args::{Args, Scenario};

fn parse(args: &[&str]) -> Result<Args, clap::Error> {
    Args::try_parse_from(std::iter::once("taskgate").chain(args.iter().copied()))
}

#[test]
fn test_scenario_is_required() {
    assert!(parse(&[]).is_err());
    assert!(parse(&["--json"]).is_err());
}

#[test]
fn test_every_scenario_parses_with_defaults() {
    for name in ["capacity", "pool", "priority", "interval", "chain"] {
        let args = parse(&[name]).unwrap();
        assert_eq!(args.scenario.name(), name);
    }
}

#[test]
fn test_pool_defaults() {
    let args = parse(&["pool"]).unwrap();

    assert_eq!(
        args.scenario,
        Scenario::Pool {
            operations: 200,
            launchers: 2,
            resources: None,
            hold_ms: 5,
            budget_secs: 10,
        }
    );
}

#[test]
fn test_global_options_before_subcommand() {
    let args = parse(&[
        "--log-format",
        "json",
        "--log-file",
        "none",
        "-c",
        "/tmp/taskgate.toml",
        "interval",
        "--interval-ms",
        "20",
    ])
    .unwrap();

    assert_eq!(args.log_format.as_deref(), Some("json"));
    assert_eq!(args.log_file.as_deref(), Some(std::path::Path::new("none")));
    assert_eq!(
        args.config_file.as_deref(),
        Some(std::path::Path::new("/tmp/taskgate.toml"))
    );
    assert_eq!(
        args.scenario,
        Scenario::Interval {
            operations: 5,
            interval_ms: Some(20),
            hold_ms: 0,
        }
    );
}

#[test]
fn test_invalid_numbers_rejected() {
    assert!(parse(&["capacity", "-n", "zero"]).is_err());
    assert!(parse(&["capacity", "-n", "0"]).is_err());
    assert!(parse(&["chain", "--resources", "-2"]).is_err());
}

#[test]
fn test_unknown_scenario_rejected() {
    let err = parse(&["fairness"]).unwrap_err();

    assert!(err.to_string().contains("fairness"), "{}", err);
}
