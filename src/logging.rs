//! File-based logging setup.
//!
//! The TUI owns the terminal, so diagnostics go to a log file instead of
//! stderr. Filtering follows the `DATALENS_LOG` environment variable with a
//! `warn` default.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_ENV: &str = "DATALENS_LOG";

/// Install the global subscriber, writing to `custom_log_path` or to
/// `datalens-cli.log` in the working directory.
pub fn init(custom_log_path: Option<PathBuf>) -> Result<()> {
    let log_path = match custom_log_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("create log directory {}", parent.display()))?;
                }
            }
            path
        }
        None => std::env::current_dir()
            .context("get current directory")?
            .join(concat!(env!("CARGO_PKG_NAME"), ".log")),
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::WARN.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("open log file {}", log_path.display()))?;

    let file_layer = fmt::layer()
        .with_writer(Arc::new(file))
        .with_target(false)
        .with_ansi(false)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .try_init()
        .context("install tracing subscriber")?;

    Ok(())
}
