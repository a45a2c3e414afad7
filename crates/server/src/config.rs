//! Server configuration read from the process environment.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use runtime::RuntimeConfig;

/// Content bundled with the workspace, used when `LEDGER_DATA_DIR` is unset.
const BUNDLED_DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../ledger/content/data");

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub session_id: Option<String>,
    pub log_dir: Option<PathBuf>,
    /// Wall-clock tick length; `None` advances the clock once per demo round.
    pub tick_interval: Option<Duration>,
    pub event_buffer: usize,
    pub command_buffer: usize,
    pub demo_ticks: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let runtime = RuntimeConfig::default();
        Self {
            data_dir: PathBuf::from(BUNDLED_DATA_DIR),
            session_id: None,
            log_dir: None,
            tick_interval: None,
            event_buffer: runtime.event_buffer_size,
            command_buffer: runtime.command_buffer_size,
            demo_ticks: 12,
        }
    }
}

impl ServerConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `LEDGER_DATA_DIR` - Directory holding `items.ron` and `config.toml`
    /// - `LEDGER_SESSION_ID` - Session identifier for logs (default: timestamp)
    /// - `LEDGER_LOG_DIR` - Log root (default: platform cache dir)
    /// - `LEDGER_TICK_MS` - Run the clock worker at this period (default: off)
    /// - `LEDGER_EVENT_BUFFER` - Per-topic event capacity (default: 256)
    /// - `LEDGER_COMMAND_BUFFER` - Authority command queue size (default: 32)
    /// - `LEDGER_DEMO_TICKS` - Rounds the demonstration session runs (default: 12)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(dir) = read("LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        config.session_id = read("LEDGER_SESSION_ID");
        config.log_dir = read("LEDGER_LOG_DIR").map(PathBuf::from);

        config.tick_interval = parse::<u64>(read("LEDGER_TICK_MS"))
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);
        if let Some(capacity) = parse::<usize>(read("LEDGER_EVENT_BUFFER")) {
            config.event_buffer = capacity.max(1);
        }
        if let Some(capacity) = parse::<usize>(read("LEDGER_COMMAND_BUFFER")) {
            config.command_buffer = capacity.max(1);
        }
        if let Some(ticks) = parse::<u64>(read("LEDGER_DEMO_TICKS")) {
            config.demo_ticks = ticks;
        }

        config
    }
}

fn parse<T>(raw: Option<String>) -> Option<T>
where
    T: std::str::FromStr,
{
    raw?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]);
        assert!(config.data_dir.ends_with("data"));
        assert_eq!(config.tick_interval, None);
        assert_eq!(config.demo_ticks, 12);
        assert_eq!(config.event_buffer, 256);
    }

    #[test]
    fn environment_overrides() {
        let config = config_from(&[
            ("LEDGER_DATA_DIR", "/srv/content"),
            ("LEDGER_SESSION_ID", "nightly"),
            ("LEDGER_TICK_MS", "50"),
            ("LEDGER_COMMAND_BUFFER", "0"),
            ("LEDGER_DEMO_TICKS", "3"),
        ]);
        assert_eq!(config.data_dir, PathBuf::from("/srv/content"));
        assert_eq!(config.session_id.as_deref(), Some("nightly"));
        assert_eq!(config.tick_interval, Some(Duration::from_millis(50)));
        assert_eq!(config.command_buffer, 1);
        assert_eq!(config.demo_ticks, 3);
    }

    #[test]
    fn malformed_values_are_ignored() {
        let config = config_from(&[("LEDGER_TICK_MS", "soon"), ("LEDGER_EVENT_BUFFER", "")]);
        assert_eq!(config.tick_interval, None);
        assert_eq!(config.event_buffer, 256);
    }
}
