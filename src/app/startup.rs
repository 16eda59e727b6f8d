//! Application entry point
//!
//! Parses arguments, starts logging, resolves the queue configuration and runs
//! the selected scenario under shutdown coordination. Returns the process
//! exit status.

use crate::app::cli::args::Args;
use crate::app::cli::config::resolve_config;
use crate::app::error::AppError;
use crate::app::report::print_report;
use crate::app::scenarios::run_scenario;
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::init_logging;
use crate::core::shutdown::{ShutdownCoordinator, INTERRUPTED_EXIT_CODE};
use crate::core::version;
use crate::queue::api::QueueConfig;

pub async fn startup() -> i32 {
    let args = Args::parse_with_styles();

    match run(args).await {
        Ok(code) => code,
        Err(AppError::Logging(message)) => {
            // No logger to report through
            eprintln!("Error: {}", message);
            1
        }
        Err(err) => {
            log_error_with_context(&err, "Scenario run failed");
            1
        }
    }
}

/// Run the command described by `args`
pub async fn run(args: Args) -> Result<i32, AppError> {
    let use_color = args.use_color();
    let log_file = args.log_file.as_ref().map(|path| path.to_string_lossy());
    init_logging(
        args.log_level.as_deref(),
        args.log_format.as_deref(),
        log_file.as_deref(),
        use_color,
    )
    .map_err(|err| AppError::Logging(err.to_string()))?;

    log::info!("taskgate {} starting", version::long_version());

    let mut config = resolve_config(args.config_file.as_deref()).await?;
    args.scenario.apply_overrides(&mut config);
    config.validate()?;
    log::debug!("Queue configuration: {:?}", config);

    execute(&args, &config, use_color).await
}

async fn execute(args: &Args, config: &QueueConfig, use_color: bool) -> Result<i32, AppError> {
    ShutdownCoordinator::guard_with_coordinator(|coordinator, _shutdown_rx| async move {
        let report = run_scenario(&args.scenario, config, &coordinator).await?;
        print_report(&report, args.json, use_color)?;

        if coordinator.is_shutdown_requested() {
            log::warn!("Scenario interrupted");
            Ok(INTERRUPTED_EXIT_CODE)
        } else {
            Ok(0)
        }
    })
    .await
}
