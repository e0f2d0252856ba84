//! Directory-based storage gateway for persistent storage.

use crate::error::{StorageError, StorageResult};
use crate::gateway::{validate_key, StorageGateway};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

const RECORD_EXT: &str = "rec";
const TEMP_EXT: &str = "tmp";

/// A directory-based storage gateway.
///
/// Each key is stored as one file under the root directory. File names are
/// the hex encoding of the key, so any UTF-8 key is safe on every platform.
/// Data survives process restarts.
///
/// # Durability
///
/// - `set` writes to a temp file, calls `sync_all`, then renames it over the
///   previous value, so a reader sees either the old or the new record
/// - Leftover temp files from a crash are ignored by `get` and `keys`
///
/// # Example
///
/// ```no_run
/// use recordvault_storage::{DirectoryGateway, StorageGateway};
/// use std::path::Path;
///
/// # async fn demo() -> recordvault_storage::StorageResult<()> {
/// let gateway = DirectoryGateway::open(Path::new("records"))?;
/// gateway.set("profile", b"persistent data".to_vec()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryGateway {
    root: PathBuf,
}

impl DirectoryGateway {
    /// Opens a gateway rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: &Path) -> StorageResult<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{RECORD_EXT}", hex::encode(key.as_bytes())))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{TEMP_EXT}", hex::encode(key.as_bytes())))
    }
}

#[async_trait]
impl StorageGateway for DirectoryGateway {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        match tokio::fs::read(self.record_path(key)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_key(key)?;
        let temp = self.temp_path(key);
        let target = self.record_path(key);

        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(&value).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp, &target).await?;
        debug!(bytes = value.len(), "record file replaced");
        Ok(())
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut keys = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw = hex::decode(stem).map_err(|e| {
                StorageError::Corrupted(format!("unrecognized record file {stem}: {e}"))
            })?;
            let key = String::from_utf8(raw).map_err(|e| {
                StorageError::Corrupted(format!("record file {stem} is not a UTF-8 key: {e}"))
            })?;
            keys.push(key);
        }

        keys.sort();
        Ok(keys)
    }
}
