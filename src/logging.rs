//! Logging initialisation for Callpilot
//!
//! Embedders call [`init_logging`] once at startup. Output goes to stdout
//! and, when the log directory is writable, to an append-only debug log at
//! `~/.callpilot/logs/callpilot-debug.log`. Filtering follows `RUST_LOG`
//! with an `info` default.

use tracing_subscriber::prelude::*;

use crate::config::get_config_dir;

/// Format timestamps using the system's local time via chrono
struct LocalTimer;

impl tracing_subscriber::fmt::time::FormatTime for LocalTimer {
    fn format_time(
        &self,
        w: &mut tracing_subscriber::fmt::format::Writer<'_>,
    ) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Set up file-based logging for debugging (local time for readability)
///
/// Safe to call only once per process; a second call panics inside
/// tracing-subscriber's global registry.
pub fn init_logging() {
    let log_dir = get_config_dir().join("logs");
    let _ = std::fs::create_dir_all(&log_dir);
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("callpilot-debug.log"))
        .ok();

    if let Some(file) = log_file {
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::sync::Mutex::new(file))
            .with_timer(LocalTimer)
            .with_ansi(false);
        let stdout_layer = tracing_subscriber::fmt::layer().with_timer(LocalTimer);
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with(stdout_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::fmt().with_timer(LocalTimer).init();
    }
}
