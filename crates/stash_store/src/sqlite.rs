use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::{debug, info};

use crate::{
    CacheEntry, ConfigStore, StoreError, StoreResult, schema::STORE_SCHEMA, validate_origin,
};

/// How long a writer waits for the other process to release the database.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed store.
///
/// Cloning is cheap and every clone shares one connection. Two processes
/// that open the same file see each other's port and origin, which is what
/// the control client relies on.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a file-backed store.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_connection(&conn)?;

        info!(target: "stash::store", path = %path.display(), "Opened SQLite store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Create an in-memory SQLite store (for tests and single-process runs).
    pub fn memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    fn init_connection(conn: &Connection) -> StoreResult<()> {
        // WAL for file-backed DBs ("memory" for in-memory ones)
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(target: "stash::store", journal_mode = %mode, "Journal mode set");

        conn.pragma_update(None, "synchronous", 2)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(STORE_SCHEMA)?;
        Ok(())
    }

    /// File this store lives in, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the underlying connection.
    ///
    /// Only the last handle actually closes it; earlier calls just drop their
    /// share.
    pub fn close(self) -> StoreResult<()> {
        match Arc::try_unwrap(self.conn) {
            Ok(mutex) => {
                let conn = mutex.into_inner().map_err(|_| StoreError::Poisoned)?;
                conn.close().map_err(|(_, e)| StoreError::Database(e))?;
                debug!(target: "stash::store", "SQLite connection closed");
                Ok(())
            }
            Err(_) => {
                debug!(target: "stash::store", "Other handles still open; connection kept");
                Ok(())
            }
        }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> StoreResult<T>) -> StoreResult<T> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&mut conn)
    }
}

fn clear_cache_rows(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM cache", [])?;
    conn.execute("DELETE FROM sqlite_sequence WHERE name = 'cache'", [])?;
    Ok(())
}

impl ConfigStore for SqliteStore {
    fn put(&self, path: &str, data: &[u8]) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO cache (path, data) VALUES (?1, ?2) ON CONFLICT(path) DO NOTHING",
                params![path, data],
            )?;
            Ok(inserted == 1)
        })
    }

    fn get(&self, path: &str) -> StoreResult<Option<CacheEntry>> {
        self.with_conn(|conn| {
            let entry = conn
                .query_row(
                    "SELECT id, path, data FROM cache WHERE path = ?1",
                    params![path],
                    |row| Ok(CacheEntry::new(row.get(0)?, row.get::<_, String>(1)?, row.get(2)?)),
                )
                .optional()?;
            Ok(entry)
        })
    }

    fn clear_all(&self) -> StoreResult<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            clear_cache_rows(&tx)?;
            tx.commit()?;
            Ok(())
        })
    }

    fn cache_len(&self) -> StoreResult<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    fn set_origin(&self, url: &str) -> StoreResult<()> {
        validate_origin(url)?;
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE proxy_config SET origin_url = ?1 WHERE id = 1",
                params![url],
            )?;
            Ok(())
        })
    }

    fn get_origin(&self) -> StoreResult<Option<String>> {
        self.with_conn(|conn| {
            let origin = conn.query_row(
                "SELECT origin_url FROM proxy_config WHERE id = 1",
                [],
                |row| row.get(0),
            )?;
            Ok(origin)
        })
    }

    fn set_port(&self, port: u16) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE proxy_config SET port_number = ?1 WHERE id = 1",
                params![port],
            )?;
            Ok(())
        })
    }

    fn unset_port(&self) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE proxy_config SET port_number = NULL WHERE id = 1", [])?;
            Ok(())
        })
    }

    fn get_port(&self) -> StoreResult<Option<u16>> {
        self.with_conn(|conn| {
            let port = conn.query_row(
                "SELECT port_number FROM proxy_config WHERE id = 1",
                [],
                |row| row.get(0),
            )?;
            Ok(port)
        })
    }

    fn reset(&self, port: u16, origin: &str) -> StoreResult<()> {
        validate_origin(origin)?;
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            clear_cache_rows(&tx)?;
            tx.execute(
                "UPDATE proxy_config SET port_number = ?1, origin_url = ?2 WHERE id = 1",
                params![port, origin],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    fn release(&self) -> StoreResult<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            clear_cache_rows(&tx)?;
            tx.execute("UPDATE proxy_config SET port_number = NULL WHERE id = 1", [])?;
            tx.commit()?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteStore;
    use crate::ConfigStore;

    #[test]
    fn put_is_first_writer_wins() {
        let store = SqliteStore::memory().unwrap();
        assert!(store.path().is_none());
        assert!(store.put("/path/to/target.html", b"test data").unwrap());
        assert!(!store.put("/path/to/target.html", b"other").unwrap());

        let entry = store.get("/path/to/target.html").unwrap().expect("entry");
        assert_eq!(entry.data, b"test data");
        assert!(store.get("/path/to/other.html").unwrap().is_none());
    }

    #[test]
    fn ids_restart_after_clear() {
        let store = SqliteStore::memory().unwrap();
        store.put("/a", b"a").unwrap();
        store.put("/b", b"b").unwrap();
        assert_eq!(store.get("/b").unwrap().unwrap().id, 2);

        store.clear_all().unwrap();
        store.clear_all().unwrap();
        assert_eq!(store.cache_len().unwrap(), 0);

        store.put("/c", b"c").unwrap();
        assert_eq!(store.get("/c").unwrap().unwrap().id, 1);
    }

    #[test]
    fn port_slot_round_trips_including_zero() {
        let store = SqliteStore::memory().unwrap();
        assert_eq!(store.get_port().unwrap(), None);

        store.set_port(3010).unwrap();
        assert_eq!(store.get_port().unwrap(), Some(3010));

        store.set_port(0).unwrap();
        assert_eq!(store.get_port().unwrap(), Some(0));

        store.unset_port().unwrap();
        assert_eq!(store.get_port().unwrap(), None);
    }

    #[test]
    fn origin_is_validated_and_overwritten() {
        let store = SqliteStore::memory().unwrap();
        assert_eq!(store.get_origin().unwrap(), None);

        store.set_origin("https://github.com/yukisato").unwrap();
        store.set_origin("https://example.org").unwrap();
        assert!(store.set_origin("not-a-url").unwrap_err().is_invalid_origin());

        assert_eq!(
            store.get_origin().unwrap().as_deref(),
            Some("https://example.org")
        );
    }

    #[test]
    fn reset_then_release() {
        let store = SqliteStore::memory().unwrap();
        store.put("/stale", b"old").unwrap();

        store.reset(3011, "http://localhost:9000").unwrap();
        assert_eq!(store.cache_len().unwrap(), 0);
        assert_eq!(store.get_port().unwrap(), Some(3011));
        assert_eq!(
            store.get_origin().unwrap().as_deref(),
            Some("http://localhost:9000")
        );

        store.put("/fresh", b"new").unwrap();
        store.release().unwrap();
        assert_eq!(store.cache_len().unwrap(), 0);
        assert_eq!(store.get_port().unwrap(), None);
    }

    #[test]
    fn binary_bodies_survive() {
        let store = SqliteStore::memory().unwrap();
        let body = vec![0u8, 159, 146, 150, 255];
        store.put("/blob", &body).unwrap();
        assert_eq!(store.get("/blob").unwrap().unwrap().data, body);
    }
}
