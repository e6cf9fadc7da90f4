//! Configuration for ZapCast

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// WhatsApp bridge configuration
    #[serde(default)]
    pub wa: WaBridgeConfig,

    /// Campaign scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Hostname
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            bind_address: default_bind_address(),
        }
    }
}

fn default_hostname() -> String {
    "localhost".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database backend: currently only "postgres"
    #[serde(default = "default_db_backend")]
    pub backend: String,

    /// Database URL
    pub url: Option<String>,

    /// Maximum connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_db_backend() -> String {
    "postgres".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API port
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_api_port() -> u16 {
    8080
}

/// WhatsApp bridge configuration
///
/// The bridge is the external WhatsApp Web automation process; ZapCast talks
/// to it over HTTP and receives delivery acknowledgements on a webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaBridgeConfig {
    /// Base URL of the bridge HTTP API
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,

    /// Request timeout for bridge calls (seconds)
    #[serde(default = "default_bridge_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for WaBridgeConfig {
    fn default() -> Self {
        Self {
            bridge_url: default_bridge_url(),
            request_timeout_secs: default_bridge_timeout_secs(),
        }
    }
}

fn default_bridge_url() -> String {
    "http://127.0.0.1:3001".to_string()
}

fn default_bridge_timeout_secs() -> u64 {
    30
}

/// Campaign scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between scheduler ticks (seconds)
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// Lookahead horizon for due schedules (seconds)
    #[serde(default = "default_lookahead_secs")]
    pub lookahead_secs: u64,

    /// Minimum delay between consecutive sends (milliseconds)
    #[serde(default = "default_pace_min_ms")]
    pub pace_min_ms: u64,

    /// Maximum delay between consecutive sends (milliseconds)
    #[serde(default = "default_pace_max_ms")]
    pub pace_max_ms: u64,

    /// Per-send timeout (seconds); a timed-out send counts as failed
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Age after which a campaign stuck in `running` is swept (seconds)
    #[serde(default = "default_stall_after_secs")]
    pub stall_after_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            lookahead_secs: default_lookahead_secs(),
            pace_min_ms: default_pace_min_ms(),
            pace_max_ms: default_pace_max_ms(),
            send_timeout_secs: default_send_timeout_secs(),
            stall_after_secs: default_stall_after_secs(),
        }
    }
}

fn default_tick_secs() -> u64 {
    60
}

fn default_lookahead_secs() -> u64 {
    60
}

fn default_pace_min_ms() -> u64 {
    2000
}

fn default_pace_max_ms() -> u64 {
    5000
}

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_stall_after_secs() -> u64 {
    900
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load() -> crate::Result<Self> {
        let paths = [
            std::path::PathBuf::from("./config.toml"),
            std::path::PathBuf::from("/etc/zapcast/config.toml"),
        ];

        for path in paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(crate::Error::Config(
            "No configuration file found".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let scheduler = SchedulerConfig::default();
        assert_eq!(scheduler.tick_secs, 60);
        assert_eq!(scheduler.lookahead_secs, 60);
        assert_eq!(scheduler.pace_min_ms, 2000);
        assert_eq!(scheduler.pace_max_ms, 5000);

        let wa = WaBridgeConfig::default();
        assert_eq!(wa.bridge_url, "http://127.0.0.1:3001");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[server]
hostname = "wa.example.com"

[database]
backend = "postgres"
url = "postgres://localhost/zapcast"

[wa]
bridge_url = "http://bridge:3001"

[scheduler]
tick_secs = 30
pace_min_ms = 1000
pace_max_ms = 1500
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.hostname, "wa.example.com");
        assert_eq!(config.database.backend, "postgres");
        assert_eq!(config.wa.bridge_url, "http://bridge:3001");
        assert_eq!(config.scheduler.tick_secs, 30);
        assert_eq!(config.scheduler.pace_max_ms, 1500);
        assert_eq!(config.scheduler.send_timeout_secs, 30);
    }
}
