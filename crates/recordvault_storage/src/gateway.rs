//! Storage gateway trait definition.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use std::sync::Arc;

/// An async key-value persistence boundary supplied by the host application.
///
/// Gateways are **opaque byte stores**. RecordVault owns all record format
/// interpretation - gateways do not understand envelopes or legacy records.
///
/// # Invariants
///
/// - `get` returns exactly the bytes most recently passed to `set` for that key
/// - `get` returns `Ok(None)` for a key that was never written
/// - A completed `set` replaces the whole value; readers never see a partial write
/// - Gateways must be `Send + Sync` for concurrent access
///
/// Gateways do not serialize writers. Callers that need per-key ordering must
/// await one `set` before issuing the next for the same key.
///
/// # Implementors
///
/// - [`super::InMemoryGateway`] - For testing
/// - [`super::DirectoryGateway`] - For persistent storage
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the write fails.
    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Lists every key currently stored.
    ///
    /// Optional: gateways that cannot enumerate return
    /// [`StorageError::Unsupported`].
    ///
    /// # Errors
    ///
    /// Returns an error if enumeration is unsupported or fails.
    async fn keys(&self) -> StorageResult<Vec<String>> {
        Err(StorageError::Unsupported("keys"))
    }
}

#[async_trait]
impl<G: StorageGateway + ?Sized> StorageGateway for Arc<G> {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        (**self).set(key, value).await
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        (**self).keys().await
    }
}

/// Rejects keys that no gateway can store.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] for an empty key.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryGateway;

    struct NoKeys;

    #[async_trait]
    impl StorageGateway for NoKeys {
        async fn get(&self, _key: &str) -> StorageResult<Option<Vec<u8>>> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: Vec<u8>) -> StorageResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn keys_default_is_unsupported() {
        let result = NoKeys.keys().await;
        assert!(matches!(result, Err(StorageError::Unsupported("keys"))));
    }

    #[tokio::test]
    async fn arc_delegates_to_inner() {
        let shared = Arc::new(InMemoryGateway::new());
        let handle = Arc::clone(&shared);

        handle.set("a", b"1".to_vec()).await.unwrap();
        assert_eq!(shared.get("a").await.unwrap(), Some(b"1".to_vec()));
        assert_eq!(handle.keys().await.unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn empty_key_rejected() {
        assert!(validate_key("").is_err());
        assert!(validate_key("profile").is_ok());
    }
}
