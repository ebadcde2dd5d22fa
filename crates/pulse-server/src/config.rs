//! Server configuration.
//!
//! Compiled defaults overridden by `PULSE_*` environment variables; invalid
//! values are logged and ignored rather than failing startup.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Configuration for the subscription server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `9000`).
    pub port: u16,
    /// Keep-alive interval in seconds; `0` disables the timer.
    pub keep_alive_interval_secs: u64,
    /// Address of the external pub/sub backend.
    pub backend_addr: String,
    /// Channel every server process publishes and subscribes on.
    pub channel: String,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Interval for the subscription-diagnostics log; `0` disables it.
    pub subscription_log_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9000,
            keep_alive_interval_secs: 0,
            backend_addr: "127.0.0.1:6379".into(),
            channel: "graphql.subscription".into(),
            max_connections: 1024,
            subscription_log_interval_secs: 0,
        }
    }
}

impl ServerConfig {
    /// Defaults with `PULSE_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("PULSE_HOST") {
            self.host = host;
        }
        if let Some(port) = parse_env("PULSE_PORT") {
            self.port = port;
        }
        if let Some(secs) = parse_env("PULSE_KEEP_ALIVE") {
            self.keep_alive_interval_secs = secs;
        }
        if let Ok(addr) = std::env::var("PULSE_BACKEND_ADDR") {
            self.backend_addr = addr;
        }
        if let Ok(channel) = std::env::var("PULSE_CHANNEL") {
            self.channel = channel;
        }
        if let Some(max) = parse_env("PULSE_MAX_CONNECTIONS") {
            self.max_connections = max;
        }
        if let Some(secs) = parse_env("PULSE_SUBSCRIPTION_LOG_INTERVAL") {
            self.subscription_log_interval_secs = secs;
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, raw, "ignoring unparseable environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_port_is_9000() {
        assert_eq!(ServerConfig::default().port, 9000);
    }

    #[test]
    fn default_keep_alive_disabled() {
        assert_eq!(ServerConfig::default().keep_alive_interval_secs, 0);
    }

    #[test]
    fn default_channel() {
        assert_eq!(ServerConfig::default().channel, "graphql.subscription");
    }

    #[test]
    fn default_subscription_log_disabled() {
        assert_eq!(ServerConfig::default().subscription_log_interval_secs, 0);
    }

    #[test]
    fn serde_roundtrip() {
        let config = ServerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.port, config.port);
        assert_eq!(back.channel, config.channel);
        assert_eq!(back.max_connections, config.max_connections);
    }

    #[test]
    fn parse_env_missing_key_is_none() {
        assert_eq!(parse_env::<u16>("PULSE_TEST_UNSET_KEY"), None);
    }
}
