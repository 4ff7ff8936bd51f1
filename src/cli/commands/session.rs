use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{MoveItRightConfig, StoreBackend};
use crate::store::{DocumentStore, MemoryStore, SeedData, SnapshotLock};

const DEFAULT_SNAPSHOT: &str = ".moveitright/store.json";

/// The store one command runs against, plus whatever must happen when it ends
pub enum Session {
    Memory {
        store: Arc<MemoryStore>,
        snapshot: PathBuf,
        _lock: SnapshotLock,
    },
    #[cfg(feature = "database")]
    Sqlite { store: Arc<crate::store::SqliteStore> },
}

impl Session {
    pub async fn open(config: &MoveItRightConfig) -> Result<Self> {
        match config.store.backend {
            StoreBackend::Memory => {
                let snapshot = config
                    .store
                    .snapshot_path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT));
                let lock = SnapshotLock::acquire(&snapshot).await?;

                let seed = match &config.store.seed_path {
                    Some(path) if !snapshot.exists() => Some(load_seed(path).await?),
                    _ => None,
                };
                let store = MemoryStore::open_snapshot(&snapshot, seed)
                    .await
                    .with_context(|| format!("Failed to open snapshot {}", snapshot.display()))?;

                debug!(snapshot = %snapshot.display(), lock = %lock.path().display(), "Memory store ready");
                Ok(Session::Memory {
                    store: Arc::new(store),
                    snapshot,
                    _lock: lock,
                })
            }
            StoreBackend::Sqlite => open_sqlite(config).await,
        }
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        match self {
            Session::Memory { store, .. } => store.clone(),
            #[cfg(feature = "database")]
            Session::Sqlite { store } => store.clone(),
        }
    }

    /// Persist and release the store
    pub async fn close(self) -> Result<()> {
        match self {
            Session::Memory { store, snapshot, .. } => {
                store
                    .save_snapshot(&snapshot)
                    .await
                    .with_context(|| format!("Failed to save snapshot {}", snapshot.display()))?;
            }
            #[cfg(feature = "database")]
            Session::Sqlite { store } => store.database().shutdown().await,
        }
        Ok(())
    }
}

async fn load_seed(path: &Path) -> Result<SeedData> {
    SeedData::load(path)
        .await
        .with_context(|| format!("Failed to load seed data from {}", path.display()))
}

#[cfg(feature = "database")]
async fn open_sqlite(config: &MoveItRightConfig) -> Result<Session> {
    use crate::database::DatabaseManager;
    use crate::store::SqliteStore;

    let db_config = config.database.clone().unwrap_or_default();
    info!("Opening SQLite store at {}", db_config.url);
    let store = SqliteStore::new(DatabaseManager::from_config(&db_config).await?);

    if let Some(path) = &config.store.seed_path {
        store.seed(&load_seed(path).await?).await?;
    }
    Ok(Session::Sqlite {
        store: Arc::new(store),
    })
}

#[cfg(not(feature = "database"))]
async fn open_sqlite(_config: &MoveItRightConfig) -> Result<Session> {
    info!("SQLite back-end requested without the `database` feature");
    anyhow::bail!("store.backend = \"sqlite\" requires building with the `database` feature")
}
