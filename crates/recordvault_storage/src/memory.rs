//! In-memory storage gateway for testing.

use crate::error::StorageResult;
use crate::gateway::{validate_key, StorageGateway};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// An in-memory storage gateway.
///
/// This gateway stores all records in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Hosts that keep records only for the life of the process
///
/// # Thread Safety
///
/// This gateway is thread-safe and can be shared across tasks.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
    writes: AtomicU64,
}

impl InMemoryGateway {
    /// Creates a new empty in-memory gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gateway preloaded with records.
    ///
    /// Useful for seeding legacy data in tests.
    #[must_use]
    pub fn with_records<I, K>(records: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<u8>)>,
        K: Into<String>,
    {
        Self {
            records: RwLock::new(records.into_iter().map(|(k, v)| (k.into(), v)).collect()),
            writes: AtomicU64::new(0),
        }
    }

    /// Stores a value without going through the async interface.
    ///
    /// Does not count as a write.
    pub fn insert(&self, key: impl Into<String>, value: Vec<u8>) {
        self.records.write().insert(key.into(), value);
    }

    /// Returns a copy of the raw bytes under `key`.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.records.read().get(key).cloned()
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Returns how many `set` calls have completed.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageGateway for InMemoryGateway {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.records.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_key(key)?;
        self.records.write().insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.records.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageError;

    #[tokio::test]
    async fn memory_new_is_empty() {
        let gateway = InMemoryGateway::new();
        assert!(gateway.is_empty());
        assert_eq!(gateway.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_set_then_get() {
        let gateway = InMemoryGateway::new();
        gateway.set("profile", b"hello".to_vec()).await.unwrap();

        assert_eq!(gateway.get("profile").await.unwrap(), Some(b"hello".to_vec()));
        assert_eq!(gateway.write_count(), 1);
    }

    #[tokio::test]
    async fn memory_set_replaces() {
        let gateway = InMemoryGateway::new();
        gateway.set("profile", b"one".to_vec()).await.unwrap();
        gateway.set("profile", b"two".to_vec()).await.unwrap();

        assert_eq!(gateway.raw("profile"), Some(b"two".to_vec()));
        assert_eq!(gateway.len(), 1);
        assert_eq!(gateway.write_count(), 2);
    }

    #[tokio::test]
    async fn memory_empty_value_is_stored() {
        let gateway = InMemoryGateway::new();
        gateway.set("blank", Vec::new()).await.unwrap();
        assert_eq!(gateway.get("blank").await.unwrap(), Some(Vec::new()));
    }

    #[tokio::test]
    async fn memory_rejects_empty_key() {
        let gateway = InMemoryGateway::new();
        let result = gateway.set("", b"x".to_vec()).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
        assert!(matches!(
            gateway.get("").await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn memory_with_records_and_keys() {
        let gateway = InMemoryGateway::with_records([
            ("b", b"2".to_vec()),
            ("a", b"1".to_vec()),
        ]);
        assert_eq!(gateway.keys().await.unwrap(), vec!["a", "b"]);
        assert_eq!(gateway.write_count(), 0);
    }

    #[test]
    fn memory_insert_does_not_count_as_write() {
        let gateway = InMemoryGateway::new();
        gateway.insert("legacy", b"{}".to_vec());
        assert_eq!(gateway.raw("legacy"), Some(b"{}".to_vec()));
        assert_eq!(gateway.write_count(), 0);
    }
}
