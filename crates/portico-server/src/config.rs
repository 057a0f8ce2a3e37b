// Configuration module
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub limits: LimitsSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// 0 means one worker per CPU core.
    #[serde(default)]
    pub workers: usize,
}

/// Request size limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsSettings {
    /// Maximum accepted request body size in bytes. Large SQL literals
    /// ride in the body, so this defaults generously.
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
}

/// Session store bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_connection_capacity")]
    pub connection_capacity: u64,
    #[serde(default = "default_statement_capacity")]
    pub statement_capacity: u64,
    /// Idle seconds before a cached connection or statement expires.
    #[serde(default = "default_idle_ttl_seconds")]
    pub idle_ttl_seconds: u64,
    /// Period of the active eviction sweep.
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
    /// Per-frame row cap applied when a request does not name one.
    #[serde(default = "default_frame_size")]
    pub default_frame_size: i32,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file_path: String,
    #[serde(default = "default_true")]
    pub log_to_console: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            limits: LimitsSettings::default(),
            session: SessionSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for LimitsSettings {
    fn default() -> Self {
        Self {
            max_request_bytes: default_max_request_bytes(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            connection_capacity: default_connection_capacity(),
            statement_capacity: default_statement_capacity(),
            idle_ttl_seconds: default_idle_ttl_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
            default_frame_size: default_frame_size(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_path: default_log_file(),
            log_to_console: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8765
}

fn default_max_request_bytes() -> usize {
    16 * 1024 * 1024 // 16MB
}

fn default_connection_capacity() -> u64 {
    100
}

fn default_statement_capacity() -> u64 {
    1000
}

fn default_idle_ttl_seconds() -> u64 {
    600 // 10 minutes
}

fn default_sweep_interval_seconds() -> u64 {
    60
}

fn default_frame_size() -> i32 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "./logs/portico.log".to_string()
}

fn default_true() -> bool {
    true
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        let mut config: ServerConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - PORTICO_HOST: Override server.host
    /// - PORTICO_PORT: Override server.port
    /// - PORTICO_LOG_FILE_PATH: Override logging.file_path
    fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        use std::env;

        if let Ok(host) = env::var("PORTICO_HOST") {
            self.server.host = host;
        }
        if let Ok(port_str) = env::var("PORTICO_PORT") {
            self.server.port = port_str
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid PORTICO_PORT value: {}", port_str))?;
        }
        if let Ok(path) = env::var("PORTICO_LOG_FILE_PATH") {
            self.logging.file_path = path;
        }

        Ok(())
    }

    /// Validate configuration settings
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            ));
        }

        if self.limits.max_request_bytes == 0 {
            return Err(anyhow::anyhow!("max_request_bytes cannot be 0"));
        }
        if self.session.connection_capacity == 0 || self.session.statement_capacity == 0 {
            return Err(anyhow::anyhow!("session cache capacities cannot be 0"));
        }
        if self.session.default_frame_size <= 0 {
            return Err(anyhow::anyhow!("default_frame_size must be positive"));
        }

        Ok(())
    }

    /// The `<hostname>:<port>` reported to clients in response metadata.
    /// Uses the bound interface when specific, else the resolved local
    /// hostname.
    pub fn advertised_address(&self) -> String {
        let host = match self.server.host.as_str() {
            "0.0.0.0" | "::" | "[::]" => hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "localhost".to_string()),
            other => other.to_string(),
        };
        format!("{}:{}", host, self.server.port)
    }

    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.session.idle_ttl_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session.sweep_interval_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_port() {
        let mut config = ServerConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = ServerConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_advertised_address_uses_specific_host() {
        let mut config = ServerConfig::default();
        config.server.host = "10.1.2.3".to_string();
        config.server.port = 4444;
        assert_eq!(config.advertised_address(), "10.1.2.3:4444");
    }

    #[test]
    fn test_advertised_address_resolves_wildcard_host() {
        let mut config = ServerConfig::default();
        config.server.host = "0.0.0.0".to_string();
        let address = config.advertised_address();
        assert!(!address.starts_with("0.0.0.0"));
        assert!(address.ends_with(":8765"));
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: ServerConfig = toml::from_str(
            "[server]\nhost = \"0.0.0.0\"\nport = 9000\n\n[session]\nidle_ttl_seconds = 30\n",
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.session.idle_ttl_seconds, 30);
        assert_eq!(config.session.connection_capacity, 100);
        assert_eq!(config.limits.max_request_bytes, 16 * 1024 * 1024);
    }
}
