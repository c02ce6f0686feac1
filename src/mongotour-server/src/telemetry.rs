//! Tracing setup for the sample server
//!
//! Two outputs share one filter:
//! - JSON lines in `<log_dir>/mongotour.log`, rotated daily or at 10MB
//! - Plain console output, so each `/databasetest` run shows up live
//!
//! Set `RUST_LOG` to override the default filter.

use anyhow::{Context, Result};
use rolling_file::{RollingConditionBasic, RollingFileAppender};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const LOG_FILE: &str = "mongotour.log";
const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;
const MAX_ROTATED_FILES: usize = 9;
const DEFAULT_FILTER: &str = "mongotour_server=debug,mongotour_core=debug,actix_web=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber writing under `log_dir`
///
/// The returned guard flushes the file writer when dropped; keep it alive
/// for the lifetime of the server.
pub fn init_telemetry(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {:?}", log_dir))?;

    let file_appender = RollingFileAppender::new(
        log_dir.join(LOG_FILE),
        RollingConditionBasic::new().daily().max_size(MAX_LOG_BYTES),
        MAX_ROTATED_FILES,
    )?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Closed spans carry the run_id and timing of every sequence run
    let file_layer = fmt::layer()
        .json()
        .with_writer(file_writer)
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_target(true);

    let console_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    tracing::info!(dir = ?log_dir, file = LOG_FILE, "Telemetry initialized");

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
