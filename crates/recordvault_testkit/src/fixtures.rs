//! Test fixtures and vault helpers.
//!
//! Provides vaults over in-memory and directory gateways, a manual clock for
//! session expiry, and a gateway wrapper that fails on demand.

use async_trait::async_trait;
use recordvault_core::{ManualClock, Passcode, RecordVault, VaultConfig};
use recordvault_storage::{
    DirectoryGateway, InMemoryGateway, StorageError, StorageGateway, StorageResult,
};
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Wraps a gateway and fails a chosen number of upcoming calls.
#[derive(Debug, Default)]
pub struct FlakyGateway<G> {
    inner: G,
    failing_gets: AtomicUsize,
    failing_sets: AtomicUsize,
    set_attempts: AtomicU64,
}

impl<G> FlakyGateway<G> {
    /// Wraps `inner` with no failures scheduled.
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            failing_gets: AtomicUsize::new(0),
            failing_sets: AtomicUsize::new(0),
            set_attempts: AtomicU64::new(0),
        }
    }

    /// The wrapped gateway.
    pub fn inner(&self) -> &G {
        &self.inner
    }

    /// Makes the next `n` reads fail.
    pub fn fail_next_gets(&self, n: usize) {
        self.failing_gets.store(n, Ordering::SeqCst);
    }

    /// Makes the next `n` writes fail.
    pub fn fail_next_sets(&self, n: usize) {
        self.failing_sets.store(n, Ordering::SeqCst);
    }

    /// Number of writes attempted, failed ones included.
    pub fn set_attempts(&self) -> u64 {
        self.set_attempts.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl<G: StorageGateway> StorageGateway for FlakyGateway<G> {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        if Self::take_failure(&self.failing_gets) {
            return Err(StorageError::unavailable("injected read failure"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.set_attempts.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.failing_sets) {
            return Err(StorageError::unavailable("injected write failure"));
        }
        self.inner.set(key, value).await
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        self.inner.keys().await
    }
}

/// Gateway type used by [`TestVault`].
pub type TestGateway = Arc<FlakyGateway<InMemoryGateway>>;

/// A vault over an in-memory gateway with a manual clock.
pub struct TestVault {
    /// The vault under test.
    pub vault: RecordVault<TestGateway>,
    /// Shared handle to the gateway, for failure injection and raw access.
    pub gateway: TestGateway,
    /// Drives session expiry.
    pub clock: Arc<ManualClock>,
}

impl TestVault {
    /// Creates a locked vault with the fast test configuration.
    pub fn new() -> Self {
        Self::with_config(VaultConfig::for_testing())
    }

    /// Creates a locked vault with `config`.
    pub fn with_config(config: VaultConfig) -> Self {
        Self::build(InMemoryGateway::new(), config)
    }

    /// Creates a locked vault whose store already holds legacy records.
    pub fn with_legacy<I, K>(records: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<u8>)>,
        K: Into<String>,
    {
        Self::build(
            InMemoryGateway::with_records(records),
            VaultConfig::for_testing(),
        )
    }

    /// Creates a vault and unlocks it with `passcode`.
    pub async fn unlocked(passcode: &str) -> Self {
        let fixture = Self::new();
        fixture
            .vault
            .unlock(Passcode::new(passcode))
            .await
            .expect("Failed to unlock test vault");
        fixture
    }

    /// The bytes stored under `key`, exactly as the gateway holds them.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.gateway.inner().raw(key)
    }

    /// Rewrites the stored bytes of `key` in place, bypassing the vault.
    pub fn tamper<F>(&self, key: &str, f: F)
    where
        F: FnOnce(&mut Vec<u8>),
    {
        let mut raw = self.raw(key).expect("No record to tamper with");
        f(&mut raw);
        self.gateway.inner().insert(key, raw);
    }

    /// Rewrites one JSON field of a stored envelope.
    pub fn tamper_field(&self, key: &str, field: &str, value: serde_json::Value) {
        self.tamper(key, |raw| {
            let mut object: serde_json::Value =
                serde_json::from_slice(raw).expect("Stored record is not JSON");
            object[field] = value;
            *raw = serde_json::to_vec(&object).expect("Failed to reserialize record");
        });
    }

    fn build(inner: InMemoryGateway, config: VaultConfig) -> Self {
        let gateway = Arc::new(FlakyGateway::new(inner));
        let clock = Arc::new(ManualClock::new());
        let vault = RecordVault::with_clock(Arc::clone(&gateway), config, clock.clone())
            .expect("Invalid test configuration");
        Self {
            vault,
            gateway,
            clock,
        }
    }
}

impl Default for TestVault {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestVault {
    type Target = RecordVault<TestGateway>;

    fn deref(&self) -> &Self::Target {
        &self.vault
    }
}

/// A vault over a directory gateway in a temporary directory.
pub struct TestDirectoryVault {
    /// The vault under test.
    pub vault: RecordVault<DirectoryGateway>,
    /// The temporary directory (kept alive to prevent cleanup).
    dir: TempDir,
}

impl TestDirectoryVault {
    /// Creates a locked vault in a fresh temporary directory.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let vault = open_directory_vault(dir.path());
        Self { vault, dir }
    }

    /// The store directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Opens a second, independent vault over the same directory, as a new
    /// process would.
    pub fn reopen(&self) -> RecordVault<DirectoryGateway> {
        open_directory_vault(self.dir.path())
    }
}

impl Default for TestDirectoryVault {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestDirectoryVault {
    type Target = RecordVault<DirectoryGateway>;

    fn deref(&self) -> &Self::Target {
        &self.vault
    }
}

fn open_directory_vault(path: &Path) -> RecordVault<DirectoryGateway> {
    let gateway = DirectoryGateway::open(path).expect("Failed to open directory gateway");
    RecordVault::new(gateway, VaultConfig::for_testing()).expect("Invalid test configuration")
}
