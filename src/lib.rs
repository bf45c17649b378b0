pub mod catalog;
pub mod classifier;
pub mod dashboard;
pub mod db;
pub mod errors;
pub mod models;
pub mod periods;
pub mod remote;
pub mod store;
pub mod transfer;

#[cfg(feature = "desktop")]
mod commands;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

#[cfg(feature = "desktop")]
pub use commands::run;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// JSON logs, rolled daily under `<app data>/logs`. Filter comes from
/// `RUST_LOG` and defaults to `info`.
pub fn init_tracing(app_data_dir: &Path) -> Result<(), String> {
    let log_dir = app_data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "dashboard.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
