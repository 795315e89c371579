use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{CacheEntry, ConfigStore, StoreError, StoreResult, validate_origin};

#[derive(Debug, Default)]
struct MemoryState {
    cache: HashMap<String, CacheEntry>,
    next_id: i64,
    origin: Option<String>,
    port: Option<u16>,
}

impl MemoryState {
    fn clear_cache(&mut self) {
        self.cache.clear();
        self.next_id = 0;
    }
}

/// Process-local store. Every operation goes through one `RwLock`, so the
/// multi-field resets are atomic for concurrent requests.
///
/// Nothing survives the process, so a `--clear-cache` run from another
/// process will never find the port registered here.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

impl ConfigStore for MemoryStore {
    fn put(&self, path: &str, data: &[u8]) -> StoreResult<bool> {
        let mut state = self.write()?;
        if state.cache.contains_key(path) {
            return Ok(false);
        }

        state.next_id += 1;
        let entry = CacheEntry::new(state.next_id, path, data.to_vec());
        state.cache.insert(path.to_string(), entry);
        Ok(true)
    }

    fn get(&self, path: &str) -> StoreResult<Option<CacheEntry>> {
        Ok(self.read()?.cache.get(path).cloned())
    }

    fn clear_all(&self) -> StoreResult<()> {
        self.write()?.clear_cache();
        Ok(())
    }

    fn cache_len(&self) -> StoreResult<usize> {
        Ok(self.read()?.cache.len())
    }

    fn set_origin(&self, url: &str) -> StoreResult<()> {
        validate_origin(url)?;
        self.write()?.origin = Some(url.to_string());
        Ok(())
    }

    fn get_origin(&self) -> StoreResult<Option<String>> {
        Ok(self.read()?.origin.clone())
    }

    fn set_port(&self, port: u16) -> StoreResult<()> {
        self.write()?.port = Some(port);
        Ok(())
    }

    fn unset_port(&self) -> StoreResult<()> {
        self.write()?.port = None;
        Ok(())
    }

    fn get_port(&self) -> StoreResult<Option<u16>> {
        Ok(self.read()?.port)
    }

    fn reset(&self, port: u16, origin: &str) -> StoreResult<()> {
        validate_origin(origin)?;

        let mut state = self.write()?;
        state.clear_cache();
        state.port = Some(port);
        state.origin = Some(origin.to_string());
        Ok(())
    }

    fn release(&self) -> StoreResult<()> {
        let mut state = self.write()?;
        state.clear_cache();
        state.port = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::ConfigStore;

    #[test]
    fn put_then_get_returns_first_value() {
        let store = MemoryStore::new();
        assert!(store.put("/a?x=1", b"first").unwrap());
        assert!(!store.put("/a?x=1", b"second").unwrap());

        let entry = store.get("/a?x=1").unwrap().expect("entry");
        assert_eq!(entry.data, b"first");
        assert_eq!(entry.id, 1);
        assert!(store.get("/a").unwrap().is_none());
    }

    #[test]
    fn clear_all_is_idempotent_and_restarts_ids() {
        let store = MemoryStore::new();
        store.put("/one", b"1").unwrap();
        store.put("/two", b"2").unwrap();

        store.clear_all().unwrap();
        store.clear_all().unwrap();
        assert_eq!(store.cache_len().unwrap(), 0);

        store.put("/three", b"3").unwrap();
        assert_eq!(store.get("/three").unwrap().unwrap().id, 1);
    }

    #[test]
    fn invalid_origin_keeps_previous_value() {
        let store = MemoryStore::new();
        store.set_origin("https://example.org").unwrap();

        let err = store.set_origin("not-a-url").unwrap_err();
        assert!(err.is_invalid_origin());
        assert_eq!(
            store.get_origin().unwrap().as_deref(),
            Some("https://example.org")
        );
    }

    #[test]
    fn reset_and_release_touch_every_field() {
        let store = MemoryStore::new();
        store.put("/stale", b"old").unwrap();

        store.reset(3010, "https://example.org").unwrap();
        assert_eq!(store.cache_len().unwrap(), 0);
        assert_eq!(store.get_port().unwrap(), Some(3010));

        store.put("/fresh", b"new").unwrap();
        store.release().unwrap();
        assert_eq!(store.cache_len().unwrap(), 0);
        assert_eq!(store.get_port().unwrap(), None);
        assert_eq!(
            store.get_origin().unwrap().as_deref(),
            Some("https://example.org")
        );
    }

    #[test]
    fn reset_with_bad_origin_changes_nothing() {
        let store = MemoryStore::new();
        store.put("/kept", b"data").unwrap();
        store.set_port(4000).unwrap();

        assert!(store.reset(5000, "nope").is_err());
        assert_eq!(store.cache_len().unwrap(), 1);
        assert_eq!(store.get_port().unwrap(), Some(4000));
    }
}
