//! Configuration file and override tests

use clap::Parser;
use std::io::Write;
use taskgate::app::cli::args::Args;
use taskgate::app::cli::config::resolve_config;
use taskgate::app::error::AppError;
use taskgate::queue::api::{Priority, QueueConfig};
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_lanes_from_file() {
    let file = config_file(
        r#"
capacity = 3

[[lanes]]
priority = "low"
capacity = 4

[[lanes]]
priority = "high"
capacity = 1
"#,
    );

    let config = resolve_config(Some(file.path())).await.unwrap();
    let router = config.priority_router().unwrap();

    assert_eq!(router.priorities(), vec![Priority::Low, Priority::High]);
    assert_eq!(router.lane(Priority::Medium).capacity(), 4);
    assert_eq!(router.lane(Priority::High).capacity(), 1);
}

#[tokio::test]
async fn test_command_line_overrides_file() {
    let file = config_file("capacity = 3\nresources = 9\n");
    let args = Args::try_parse_from([
        "taskgate",
        "--config-file",
        file.path().to_str().unwrap(),
        "chain",
        "--capacity",
        "5",
    ])
    .unwrap();

    let mut config = resolve_config(args.config_file.as_deref()).await.unwrap();
    args.scenario.apply_overrides(&mut config);

    assert_eq!(config.capacity, 5);
    assert_eq!(config.resources, 9);
    assert!(config.validate().is_ok());
}

#[tokio::test]
async fn test_unknown_key_rejected() {
    let file = config_file("capacty = 3\n");

    let err = resolve_config(Some(file.path())).await.unwrap_err();

    assert!(matches!(err, AppError::Config { .. }));
}

#[tokio::test]
async fn test_duplicate_lane_rejected() {
    let file = config_file(
        r#"
[[lanes]]
priority = "low"
capacity = 4

[[lanes]]
priority = "low"
capacity = 2
"#,
    );

    let err = resolve_config(Some(file.path())).await.unwrap_err();

    assert!(err.to_string().contains("more than once"), "{}", err);
}

#[tokio::test]
async fn test_missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("taskgate.toml");

    let err = resolve_config(Some(&missing)).await.unwrap_err();

    assert!(matches!(err, AppError::Usage(_)));
}

#[test]
fn test_default_config_round_trips_through_toml() {
    let config = QueueConfig::default();
    let encoded = toml::to_string(&config).unwrap();

    assert_eq!(QueueConfig::from_toml_str(&encoded).unwrap(), config);
}
