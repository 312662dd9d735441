use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::Config;

/// Install the global subscriber.
///
/// Text goes to stdout; with `log_file` set, JSON lines go to that file
/// through a non-blocking writer. Keep the returned guard alive for as long
/// as file logging is wanted, dropping it flushes the writer.
pub fn setup_logging(
    log_level: &str,
    log_file: Option<&Path>,
    session_id: Option<&str>,
) -> Option<WorkerGuard> {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // ISO 8601 (RFC 3339) timestamps
    let timer = fmt::time::ChronoLocal::rfc_3339();

    let guard = if let Some(path) = log_file {
        let directory = path.parent().unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "stagelink.log".into());
        let appender = tracing_appender::rolling::never(directory, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let layer = fmt::layer().with_timer(timer).json().with_writer(writer);
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init();
        Some(guard)
    } else {
        let layer = fmt::layer().with_timer(timer).with_writer(std::io::stdout);
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init();
        None
    };

    if let Some(id) = session_id {
        // Long identifiers are cut for readability
        let truncated_id = if id.len() > 16 { id.get(..16).unwrap_or(id) } else { id };
        tracing::info!(session_id = %truncated_id, "Logging initialized");
    }

    guard
}

/// [`setup_logging`] driven by the `log_level` and `log_file` settings.
pub fn setup_from_config(config: &Config, session_id: Option<&str>) -> Option<WorkerGuard> {
    setup_logging(&config.log_level, config.log_file.as_deref(), session_id)
}
