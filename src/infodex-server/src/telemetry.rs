//! File and console logging for the development engine
//!
//! - JSON formatted logs to a rolling file under the configured log directory
//! - Human-readable console output
//! - Size-based rotation (10MB per file) on top of daily rotation

use anyhow::Result;
use rolling_file::{RollingConditionBasic, RollingFileAppender};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const LOG_FILE: &str = "infodex-engine.log";
const DEFAULT_FILTER: &str = "infodex_server=debug,tracing_actix_web=info,actix_web=info";

/// Install the global subscriber
///
/// Returns a guard that must be kept alive to ensure logs are flushed
pub fn init_telemetry(log_dir: &str) -> Result<WorkerGuard> {
    let log_dir = Path::new(log_dir);
    std::fs::create_dir_all(log_dir)?;

    // Rotates daily or at 10MB, keeping up to 10 files per day
    let file_appender = RollingFileAppender::new(
        log_dir.join(LOG_FILE),
        RollingConditionBasic::new()
            .daily()
            .max_size(10 * 1024 * 1024),
        9,
    )?;

    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_layer = fmt::layer()
        .json()
        .with_writer(non_blocking_file)
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_target(true)
        .with_thread_ids(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    tracing::info!(
        "Logging to {:?}, rotating daily or at 10MB as {}.YYYY-MM-DD",
        log_dir,
        LOG_FILE
    );

    Ok(guard)
}

pub fn shutdown_telemetry() {
    tracing::info!("Telemetry shutdown complete");
}
