//! Service Configuration - server, storage, judgment backend and rule tuning
//!
//! Each struct implements `Default`, so any subset of keys may be given.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "TXN_GUARDIAN_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "txn_guardian.toml";

// ============================================================================
// Errors
// ============================================================================

/// Configuration loading / validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("failed to parse {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Where final records are persisted
    #[serde(default)]
    pub storage: StorageConfig,

    /// Judgment oracle selection and call policy
    #[serde(default)]
    pub judgment: JudgmentConfig,

    /// Tuning for the rule-based judge
    #[serde(default)]
    pub rules: RulesConfig,
}

impl ServiceConfig {
    /// Load configuration using the standard search order:
    /// 1. `$TXN_GUARDIAN_CONFIG`
    /// 2. `./txn_guardian.toml`
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded service config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded service config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate cross-field consistency.
    ///
    /// Rules:
    /// - `judgment.timeout_ms` and `judgment.max_attempts` must be positive
    /// - the `http` backend needs an endpoint
    /// - every suspicious-metadata pattern must compile
    /// - the body limit must leave room for a payload
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.judgment.timeout_ms == 0 {
            return Err(ConfigError::Invalid("judgment.timeout_ms must be > 0".into()));
        }
        if self.judgment.max_attempts == 0 {
            return Err(ConfigError::Invalid("judgment.max_attempts must be >= 1".into()));
        }
        if self.judgment.backend == JudgmentBackend::Http
            && self.judgment.endpoint.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::Invalid(
                "judgment.endpoint is required when judgment.backend = \"http\"".into(),
            ));
        }
        for pattern in &self.rules.suspicious_patterns {
            regex::Regex::new(pattern).map_err(|e| {
                ConfigError::Invalid(format!("rules.suspicious_patterns: '{pattern}': {e}"))
            })?;
        }
        if self.server.body_limit_bytes < 1024 {
            return Err(ConfigError::Invalid(
                "server.body_limit_bytes must be at least 1024".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Sections
// ============================================================================

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Maximum accepted request body
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_body_limit() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// Persistence backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sled,
    Memory,
}

/// Persistence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Sled database directory
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./data/transactions.db")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

/// Judgment oracle implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgmentBackend {
    /// Deterministic rules, no external calls
    #[default]
    Rules,
    /// OpenAI-compatible chat-completions endpoint
    Http,
}

/// Judgment oracle selection and call policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgmentConfig {
    #[serde(default)]
    pub backend: JudgmentBackend,
    /// Per-attempt deadline for one oracle call
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Attempts per oracle call (1 = no retry)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Chat-completions URL for the `http` backend
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Model name sent to the `http` backend
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the env var holding the bearer token
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_timeout_ms() -> u64 {
    30_000
}
fn default_max_attempts() -> u32 {
    1
}
fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_api_key_env() -> String {
    "TXN_GUARDIAN_API_KEY".to_string()
}

impl Default for JudgmentConfig {
    fn default() -> Self {
        Self {
            backend: JudgmentBackend::default(),
            timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
            endpoint: None,
            model: default_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Rule-based judge tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Amounts (minor units) at or above this are flagged as fraud
    #[serde(default = "default_fraud_amount_threshold")]
    pub fraud_amount_threshold: u64,
    /// Regexes matched against string metadata values
    #[serde(default = "default_suspicious_patterns")]
    pub suspicious_patterns: Vec<String>,
    /// Statuses the validation rubric accepts
    #[serde(default = "default_allowed_statuses")]
    pub allowed_statuses: Vec<String>,
}

fn default_fraud_amount_threshold() -> u64 {
    10_000
}
fn default_suspicious_patterns() -> Vec<String> {
    vec!["(?i)^suspicious".to_string()]
}
fn default_allowed_statuses() -> Vec<String> {
    vec!["PENDING".to_string(), "SUCCESS".to_string(), "FAILED".to_string()]
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            fraud_amount_threshold: default_fraud_amount_threshold(),
            suspicious_patterns: default_suspicious_patterns(),
            allowed_statuses: default_allowed_statuses(),
        }
    }
}
