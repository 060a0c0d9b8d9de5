//! Service configuration.

use std::fmt;
use std::str::FromStr;

use levelup_store::DEFAULT_NAMESPACE;

use crate::orchestrator::{OrchestratorConfig, DEFAULT_LEVEL_UP_POINTS_PER_LEVEL};

/// Where collections are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// Process memory. Data is lost on restart.
    Memory,
    /// `RocksDB` under `data_dir`.
    #[default]
    Rocksdb,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rocksdb" => Ok(Self::Rocksdb),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::Rocksdb => "rocksdb",
        })
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// `RocksDB` data directory (default: "./data/levelup").
    pub data_dir: String,

    /// Storage backend (default: rocksdb).
    pub storage_backend: StorageBackend,

    /// Storage key namespace (default: "@gamification").
    pub key_namespace: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Effect-chain rules.
    pub orchestrator: OrchestratorConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "./data/levelup".into(),
            storage_backend: StorageBackend::default(),
            key_namespace: DEFAULT_NAMESPACE.into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024, // 1MB
            request_timeout_seconds: 30,
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let storage_backend = match std::env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse().unwrap_or_else(|e: String| {
                tracing::warn!(error = %e, "Falling back to the default storage backend");
                defaults.storage_backend
            }),
            Err(_) => defaults.storage_backend,
        };

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            storage_backend,
            key_namespace: std::env::var("KEY_NAMESPACE").unwrap_or(defaults.key_namespace),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|o| o.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_bytes: parse_env("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: parse_env("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
            orchestrator: OrchestratorConfig {
                level_up_points_per_level: parse_env("LEVEL_UP_POINTS_PER_LEVEL")
                    .unwrap_or(DEFAULT_LEVEL_UP_POINTS_PER_LEVEL),
                streak_milestone_rewards: parse_env("STREAK_MILESTONE_REWARDS")
                    .unwrap_or(defaults.orchestrator.streak_milestone_rewards),
            },
        }
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
