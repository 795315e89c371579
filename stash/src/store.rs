use std::sync::Arc;

use anyhow::Context;
use stash_config::{StashConfig, StoreBackend};
use stash_store::{ConfigStore, MemoryStore, SqliteStore};
use tracing::{info, warn};

/// Store opened from the settings, kept concrete so it can be closed.
pub enum Store {
    Sqlite(SqliteStore),
    Memory(Arc<MemoryStore>),
}

impl Store {
    pub fn open(cfg: &StashConfig) -> anyhow::Result<Self> {
        match cfg.store.backend {
            StoreBackend::Sqlite => {
                let path = cfg.store.database_path();
                let store = SqliteStore::open(&path)
                    .with_context(|| format!("Failed to open database {}", path.display()))?;
                info!(target: "stash::cli", db = %path.display(), "Store opened");
                Ok(Store::Sqlite(store))
            }
            StoreBackend::Memory => {
                warn!(
                    target: "stash::cli",
                    "Using the in-memory store; other processes cannot see this server"
                );
                Ok(Store::Memory(Arc::new(MemoryStore::new())))
            }
        }
    }

    pub fn shared(&self) -> Arc<dyn ConfigStore> {
        match self {
            Store::Sqlite(s) => Arc::new(s.clone()),
            Store::Memory(m) => m.clone(),
        }
    }

    /// Release the connection. Call after every shared handle is dropped.
    pub fn close(self) -> anyhow::Result<()> {
        match self {
            Store::Sqlite(s) => s.close().context("Failed to close database"),
            Store::Memory(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use stash_config::{StashConfig, StoreBackend};

    use super::Store;

    #[test]
    fn sqlite_backend_is_shared_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = StashConfig::default();
        cfg.store.path = Some(dir.path().join("db.sqlite").display().to_string());

        let first = Store::open(&cfg).unwrap();
        first.shared().set_port(4100).unwrap();

        let second = Store::open(&cfg).unwrap();
        assert_eq!(second.shared().get_port().unwrap(), Some(4100));

        first.close().unwrap();
        second.close().unwrap();
    }

    #[test]
    fn memory_backend_is_private() {
        let mut cfg = StashConfig::default();
        cfg.store.backend = StoreBackend::Memory;

        let store = Store::open(&cfg).unwrap();
        let shared = store.shared();
        shared.put("/a", b"a").unwrap();
        assert_eq!(store.shared().cache_len().unwrap(), 1);

        drop(shared);
        store.close().unwrap();
    }
}
