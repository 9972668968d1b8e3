use crate::config;
use anyhow::Result;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "chime.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

// The terminal is owned by the picker UI, so logs go to a file only.
pub fn init() -> Result<()> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }

    let root = config::ensure_config_dir()?;
    let appender = tracing_appender::rolling::never(&root, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))?;

    let _ = LOG_GUARD.set(guard);
    tracing::info!("logging to {}", root.join(LOG_FILE).display());
    Ok(())
}
