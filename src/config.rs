//! Configuration management for subrecon
//!
//! Configuration is loaded from `./config/subrecon.toml` (or a path given on
//! the command line). The embedded copy of that file is the only place
//! defaults exist.

use serde::Deserialize;
use std::fs;
use std::io::{self, Write};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/subrecon.toml";

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = include_str!("../config/subrecon.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid URL in '{field}': {url}")]
    InvalidUrl { field: String, url: String },

    #[error("Invalid nameserver address in '{field}': {address} (expected an IP address)")]
    InvalidAddress { field: String, address: String },

    #[error("Configuration field '{field}' cannot be empty or zero")]
    EmptyRequired { field: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub dns: DnsConfig,
    pub discovery: DiscoveryConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// DNS resolution configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DnsConfig {
    pub timeout_secs: u64,
    pub concurrency: usize,
    /// Explicit nameserver IPs; empty means the system configuration
    #[serde(default)]
    pub nameservers: Vec<String>,
}

impl DnsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Source collector configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_true")]
    pub bruteforce_enabled: bool,
    #[serde(default = "default_true")]
    pub ct_enabled: bool,
    #[serde(default = "default_true")]
    pub passive_enabled: bool,
    pub wordlist: Vec<String>,
    pub crtsh_url: String,
    pub hostsearch_url: String,
    pub collector_timeout_secs: u64,
    #[serde(default)]
    pub strip_wildcards: bool,
}

fn default_true() -> bool {
    true
}

impl DiscoveryConfig {
    pub fn collector_timeout(&self) -> Duration {
        Duration::from_secs(self.collector_timeout_secs)
    }
}

/// Result persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

/// Backoff strategy for retried lookups
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    Linear,
    Exponential,
}

impl std::str::FromStr for BackoffStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(BackoffStrategy::Linear),
            "exponential" => Ok(BackoffStrategy::Exponential),
            other => Err(format!(
                "unknown backoff strategy '{}' (expected linear or exponential)",
                other
            )),
        }
    }
}

/// DNS rate limiting and retry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// 0 = unlimited
    pub dns_queries_per_second: u32,
    pub backoff_strategy: BackoffStrategy,
    pub max_retries: u32,
    pub backoff_base_delay_ms: u64,
    pub backoff_max_delay_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            dns_queries_per_second: 0,
            backoff_strategy: BackoffStrategy::Exponential,
            max_retries: 0,
            backoff_base_delay_ms: 250,
            backoff_max_delay_ms: 2000,
        }
    }
}

impl RateLimitConfig {
    /// Delay before retry number `attempt` (1-indexed). Attempt 0 never waits.
    pub fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay_ms = match self.backoff_strategy {
            BackoffStrategy::Linear => self.backoff_base_delay_ms.saturating_mul(attempt as u64),
            BackoffStrategy::Exponential => {
                let factor = 2u64.saturating_pow(attempt - 1);
                self.backoff_base_delay_ms.saturating_mul(factor)
            }
        };

        Duration::from_millis(delay_ms.min(self.backoff_max_delay_ms))
    }
}

impl AppConfig {
    /// Parse the embedded default configuration
    pub fn embedded_default() -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to the embedded defaults when the file
    /// does not exist. Any other error is returned.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load_from_path(path) {
            Err(ConfigError::FileNotFound(_)) => Self::embedded_default(),
            other => other,
        }
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.user_agent.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "http.user_agent".to_string(),
            });
        }
        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "http.request_timeout_secs".to_string(),
            });
        }
        if self.dns.timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "dns.timeout_secs".to_string(),
            });
        }
        if self.dns.concurrency == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "dns.concurrency".to_string(),
            });
        }
        if self.discovery.collector_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "discovery.collector_timeout_secs".to_string(),
            });
        }
        if self.output.directory.as_os_str().is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "output.directory".to_string(),
            });
        }

        for (field, url) in [
            ("discovery.crtsh_url", &self.discovery.crtsh_url),
            ("discovery.hostsearch_url", &self.discovery.hostsearch_url),
        ] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(ConfigError::InvalidUrl {
                    field: field.to_string(),
                    url: url.clone(),
                });
            }
        }

        for (i, address) in self.dns.nameservers.iter().enumerate() {
            if address.parse::<IpAddr>().is_err() {
                return Err(ConfigError::InvalidAddress {
                    field: format!("dns.nameservers[{}]", i),
                    address: address.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn create_default_config_at(path: &Path) -> Result<PathBuf, ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }
}
