// lookout/src/config.rs
//
// Server and client configuration.
//
// Defaults cover a local run; a JSON file may override any subset of fields,
// and CLI flags override the file. The admin key is never given a default:
// without one, admin routes reject every request.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid config {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("invalid bind address {0}")]
    Bind(String),
}

// ── Server ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind:                 String,          // 127.0.0.1:8080
    pub database:             Option<PathBuf>, // None = in-memory store
    pub admin_key:            Option<String>,
    pub enable_tracking:      bool,            // switch ExtensionTracking on at startup
    pub max_body_bytes:       usize,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind:                 "127.0.0.1:8080".to_string(),
            database:             None,
            admin_key:            None,
            enable_tracking:      false,
            max_body_bytes:       64 * 1024,
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        serde_json::from_str(&raw)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind.parse().map_err(|_| ConfigError::Bind(self.bind.clone()))
    }

    /// Admin key with surrounding whitespace removed; blank counts as unset.
    pub fn admin_key(&self) -> Option<&str> {
        self.admin_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url:   String,
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url:   "http://127.0.0.1:8080".to_string(),
            timeout_ms: 5_000,
        }
    }
}
