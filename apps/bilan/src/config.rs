//! # Configuration
//!
//! Server configuration from an optional TOML file, overlaid by environment
//! variables and finally by CLI flags.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [storage]
//! backend = "redb"          # or "memory"
//! database = "bilan.redb"
//!
//! [limits]
//! rate_limit = 100          # requests per second, 0 disables
//! body_limit_bytes = 2097152
//!
//! [cors]
//! origins = ["http://localhost:3000"]   # or ["*"]
//!
//! [auth]
//! api_key = "change-me"     # omit to disable bearer authentication
//! ```
//!
//! ## Environment Variables
//!
//! - `BILAN_RATE_LIMIT`: overrides `limits.rate_limit`
//! - `BILAN_CORS_ORIGINS`: comma-separated, overrides `cors.origins`
//! - `BILAN_API_KEY`: overrides `auth.api_key`

use bilan_core::BilanError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default requests per second.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Default maximum request body size (2 MB).
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Volatile in-memory store.
    Memory,
    /// Disk-backed redb store.
    #[default]
    Redb,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: BackendKind,
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Redb,
            database: PathBuf::from("bilan.redb"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub rate_limit: u32,
    pub body_limit_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            rate_limit: DEFAULT_RATE_LIMIT,
            body_limit_bytes: DEFAULT_BODY_LIMIT,
        }
    }
}

/// Allowed CORS origins. `None` means localhost only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub origins: Option<Vec<String>>,
}

/// Bearer authentication. `None` leaves the API open.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BilanConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub limits: LimitsConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
}

impl BilanConfig {
    /// Parse a configuration document.
    pub fn from_toml(text: &str) -> Result<Self, BilanError> {
        toml::from_str(text).map_err(|e| BilanError::ConfigError(e.to_string()))
    }

    /// Load the file at `path` (if any), then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, BilanError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    BilanError::ConfigError(format!("{}: {}", path.display(), e))
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply `BILAN_RATE_LIMIT`, `BILAN_CORS_ORIGINS` and `BILAN_API_KEY`.
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    /// Apply overrides from any variable source.
    pub fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(limit) = var("BILAN_RATE_LIMIT").and_then(|s| s.trim().parse().ok()) {
            self.limits.rate_limit = limit;
        }
        if let Some(origins) = var("BILAN_CORS_ORIGINS") {
            self.cors.origins = Some(
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }
        if let Some(key) = var("BILAN_API_KEY").filter(|k| !k.is_empty()) {
            self.auth.api_key = Some(key);
        }
    }

    /// `host:port` listen address.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
