//! Logging to stderr and a per-session file.
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Keeps the file writer flushing; drop it last.
pub struct LoggingGuard {
    _file: WorkerGuard,
    pub session_id: String,
    pub session_dir: PathBuf,
}

/// Platform cache directory for logs, e.g. `~/.cache/ledger/logs` on Linux.
pub fn default_log_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "ledger")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp/ledger"))
        .join("logs")
}

pub fn session_id_or_timestamp(session_id: Option<&str>) -> String {
    session_id.map(str::to_owned).unwrap_or_else(|| {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        format!("session_{timestamp}")
    })
}

/// Setup logging to both stderr and `<log_dir>/<session>/server.log`
pub fn setup_logging(session_id: Option<&str>, log_dir: Option<&Path>) -> Result<LoggingGuard> {
    let log_dir = log_dir.map_or_else(default_log_dir, Path::to_path_buf);
    let session_id = session_id_or_timestamp(session_id);

    let session_dir = log_dir.join(&session_id);
    std::fs::create_dir_all(&session_dir)
        .with_context(|| format!("Failed to create log directory {}", session_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&session_dir, "server.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!("Logging initialized: session={}", session_id);
    tracing::info!("Log file: {}/server.log", session_dir.display());

    Ok(LoggingGuard {
        _file: guard,
        session_id,
        session_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_session_id_wins() {
        assert_eq!(session_id_or_timestamp(Some("demo")), "demo");
        assert!(session_id_or_timestamp(None).starts_with("session_"));
    }
}
