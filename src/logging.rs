use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::chat_core::storage::{default_state_dir, expand_home};
use crate::model::AppConfig;

const LOG_FILE: &str = "equilibria-tui.log";

/// The terminal belongs to the UI, so logs go to a file.
pub fn log_file_path(cfg: &AppConfig) -> PathBuf {
    cfg.log_file
        .as_deref()
        .map(expand_home)
        .unwrap_or_else(|| default_state_dir().join(LOG_FILE))
}

/// `EQUILIBRIA_LOG` takes precedence over `RUST_LOG`; default level is `info`.
fn env_filter() -> EnvFilter {
    std::env::var("EQUILIBRIA_LOG")
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| "info".into())
}

pub fn init_file_logging(cfg: &AppConfig) -> Result<PathBuf> {
    let log_path = log_file_path(cfg);
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create log directory '{}'", parent.display())
            })?;
        }
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file '{}'", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;
    Ok(log_path)
}
