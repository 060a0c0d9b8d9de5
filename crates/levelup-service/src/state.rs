//! Application state.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use levelup_store::{GamificationRepository, KeySpace, KeyValueStore, MemoryStore, RocksStore};

use crate::config::{ServiceConfig, StorageBackend};
use crate::orchestrator::Orchestrator;

/// Type-erased storage backend chosen at startup.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Application state shared across handlers.
pub struct AppState {
    /// Effect chains over the repository.
    pub orchestrator: Orchestrator<SharedStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    writes: Mutex<()>,
}

impl AppState {
    /// Create a new application state over `store`.
    #[must_use]
    pub fn new(store: SharedStore, config: ServiceConfig) -> Self {
        let repository = GamificationRepository::with_key_space(
            store,
            KeySpace::new(config.key_namespace.clone()),
        );
        let orchestrator = Orchestrator::new(repository, config.orchestrator.clone());

        tracing::info!(
            namespace = %config.key_namespace,
            level_up_points_per_level = config.orchestrator.level_up_points_per_level,
            streak_milestone_rewards = config.orchestrator.streak_milestone_rewards,
            "Gamification rules loaded"
        );

        Self {
            orchestrator,
            config,
            writes: Mutex::new(()),
        }
    }

    /// Open the configured storage backend and build the state on top of it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be opened.
    pub fn open(config: ServiceConfig) -> Result<Self, levelup_store::StoreError> {
        let store = open_store(&config)?;
        Ok(Self::new(store, config))
    }

    /// Serialize mutations. Every read-modify-write of a collection runs under this guard.
    pub async fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().await
    }

    /// The repository behind the orchestrator.
    #[must_use]
    pub fn repository(&self) -> &GamificationRepository<SharedStore> {
        self.orchestrator.repository()
    }
}

fn open_store(config: &ServiceConfig) -> Result<SharedStore, levelup_store::StoreError> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage - data will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Rocksdb => {
            tracing::info!(path = %config.data_dir, "Opening RocksDB store");
            Ok(Arc::new(RocksStore::open(&config.data_dir)?))
        }
    }
}
