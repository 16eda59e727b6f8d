//! Scenario runs driven from parsed arguments

use clap::Parser;
use taskgate::app::cli::args::Args;
use taskgate::app::report::{render_json, report_table};
use taskgate::app::scenarios::run_scenario;
use taskgate::core::shutdown::ShutdownCoordinator;
use taskgate::queue::api::QueueConfig;

async fn run(argv: &[&str]) -> taskgate::app::scenarios::ScenarioReport {
    let args = Args::try_parse_from(std::iter::once("taskgate").chain(argv.iter().copied())).unwrap();
    let mut config = QueueConfig::default();
    args.scenario.apply_overrides(&mut config);
    config.validate().unwrap();
    let (coordinator, _rx) = ShutdownCoordinator::new();

    run_scenario(&args.scenario, &config, &coordinator).await.unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_capacity_scenario_from_arguments() {
    let report = run(&["capacity", "-n", "2000", "--capacity", "3"]).await;

    assert_eq!(report.operations, 2000);
    assert_eq!(report.successes, 1000);
    assert_eq!(report.failures, 1000);
    assert_eq!(report.limit, 3);
    assert!(report.peak_concurrency <= 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_scenario_within_budget() {
    let report = run(&["pool", "--resources", "5", "--hold-ms", "1"]).await;

    assert_eq!(report.successes, 200);
    assert!(report.peak_concurrency <= 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_chain_report_renders() {
    let report = run(&["chain", "-n", "12", "--capacity", "2"]).await;

    let table = report_table(&report, false).to_string();
    assert!(table.contains("chain"));

    let json: serde_json::Value = serde_json::from_str(&render_json(&report).unwrap()).unwrap();
    assert_eq!(json["successes"], 12);
    assert_eq!(json["limit"], 2);
}

#[tokio::test]
async fn test_interval_scenario_spacing() {
    let report = run(&["interval", "-n", "3", "--interval-ms", "15"]).await;

    assert_eq!(report.successes, 3);
    assert!(report.min_spacing_ms.unwrap() >= 15);
}
