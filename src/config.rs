use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "Compliance Console";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory name used under the platform config dir.
const CONFIG_DIR_NAME: &str = "compliance-console";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TREND_DAYS: u32 = 30;
const DEFAULT_UPLOAD_SUCCESS_TTL_MS: u64 = 3000;

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,compliance_console_lib=debug"
}

/// Get the configuration directory
/// `<platform config dir>/compliance-console/`
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME))
}

/// Get the default configuration file path
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.json"))
}

// ═══════════════════════════════════════════════════════════
// ConsoleConfig
// ═══════════════════════════════════════════════════════════

/// Runtime configuration for the console.
///
/// Layering: built-in defaults, then the JSON config file (if present),
/// then environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Base URL of the backend API, including the version prefix.
    pub api_base_url: String,
    /// Whole-request timeout applied by the HTTP client.
    pub request_timeout_secs: u64,
    /// TCP connect timeout applied by the HTTP client.
    pub connect_timeout_secs: u64,
    /// Window passed to the compliance trends endpoint.
    pub trend_days: u32,
    /// How long the upload success banner stays up.
    pub upload_success_ttl_ms: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            trend_days: DEFAULT_TREND_DAYS,
            upload_success_ttl_ms: DEFAULT_UPLOAD_SUCCESS_TTL_MS,
        }
    }
}

/// Errors from configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

impl ConsoleConfig {
    /// Load defaults, the default config file and environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_file() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Read a config file. Missing fields fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides through a lookup function.
    ///
    /// Taking the lookup as a parameter keeps tests off the process env.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("COMPLIANCE_API_URL") {
            let url = url.trim();
            if url.is_empty() {
                return Err(ConfigError::InvalidEnv {
                    var: "COMPLIANCE_API_URL",
                    value: url.to_string(),
                });
            }
            self.api_base_url = url.to_string();
        }
        if let Some(v) = lookup("COMPLIANCE_API_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_env("COMPLIANCE_API_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("COMPLIANCE_API_CONNECT_TIMEOUT_SECS") {
            self.connect_timeout_secs = parse_env("COMPLIANCE_API_CONNECT_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("COMPLIANCE_TREND_DAYS") {
            self.trend_days = parse_env("COMPLIANCE_TREND_DAYS", &v)?;
        }
        if let Some(v) = lookup("COMPLIANCE_UPLOAD_BANNER_MS") {
            self.upload_success_ttl_ms = parse_env("COMPLIANCE_UPLOAD_BANNER_MS", &v)?;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn upload_success_ttl(&self) -> Duration {
        Duration::from_millis(self.upload_success_ttl_ms)
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}
