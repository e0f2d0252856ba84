//! Record reads, writes, and legacy-to-envelope migration.
//!
//! A single logical record moves one way only:
//!
//! ```text
//! Plaintext ──(secret available)──▶ Encrypted ──(update / refresh)──▶ Encrypted
//! ```
//!
//! Every overwrite that replaces existing content is sealed, decoded and
//! opened again before it reaches the gateway, so the store never holds an
//! envelope the vault cannot read back.

use crate::config::{PlaintextPolicy, VaultConfig};
use crate::crypto::Passcode;
use crate::envelope::{EncryptedEnvelope, StoredRecord};
use crate::error::{CoreError, CoreResult};
use crate::locks::KeyLocks;
use crate::session::SessionKeyContext;
use crate::status::IntegrityMonitor;
use crate::verifier::is_reserved_key;
use recordvault_storage::StorageGateway;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Outcome of [`MigrationManager::ensure_encrypted`] for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    /// A plaintext record was replaced by an envelope.
    Migrated,
    /// An envelope was re-sealed with a fresh salt and nonce.
    Refreshed,
    /// No secret was available; the record was left as it is.
    Skipped,
    /// Nothing is stored under the key.
    Missing,
}

/// How [`MigrationManager::write_record`] stored a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Stored as an envelope.
    Encrypted,
    /// Stored as tagged plaintext under [`PlaintextPolicy::AllowWithWarning`].
    Plaintext,
}

/// Per-key results of a bulk migration.
#[derive(Debug, Default)]
pub struct MigrationReport {
    /// Keys whose plaintext record became an envelope.
    pub migrated: Vec<String>,
    /// Keys whose envelope was re-sealed.
    pub refreshed: Vec<String>,
    /// Keys left alone because the vault was locked.
    pub skipped: Vec<String>,
    /// Keys with no stored record.
    pub missing: Vec<String>,
    /// Keys that failed, with the error.
    pub failed: Vec<(String, CoreError)>,
}

impl MigrationReport {
    /// Returns true if no key failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total number of keys processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.migrated.len()
            + self.refreshed.len()
            + self.skipped.len()
            + self.missing.len()
            + self.failed.len()
    }

    fn record(&mut self, key: String, result: CoreResult<MigrationStatus>) {
        match result {
            Ok(MigrationStatus::Migrated) => self.migrated.push(key),
            Ok(MigrationStatus::Refreshed) => self.refreshed.push(key),
            Ok(MigrationStatus::Skipped) => self.skipped.push(key),
            Ok(MigrationStatus::Missing) => self.missing.push(key),
            Err(e) => self.failed.push((key, e)),
        }
    }
}

/// Stored form of a record, readable without a passcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordForm {
    /// Untagged bytes from before encryption support.
    Legacy,
    /// Tagged plaintext written while locked.
    Plaintext,
    /// An envelope.
    Encrypted {
        /// Stamped format version.
        format_version: String,
        /// Creation time in milliseconds since the Unix epoch.
        created_at: u64,
        /// PBKDF2 iteration count.
        kdf_iterations: u32,
        /// Length of ciphertext plus tag.
        ciphertext_len: usize,
    },
}

/// Metadata about one stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordInfo {
    /// The record key.
    pub key: String,
    /// Stored form.
    pub form: RecordForm,
    /// Size of the stored bytes.
    pub stored_len: usize,
}

/// Reads and writes records through a gateway, upgrading legacy records.
pub struct MigrationManager<G> {
    gateway: G,
    session: Arc<SessionKeyContext>,
    config: VaultConfig,
    locks: KeyLocks,
    // Held shared by record operations and exclusively by passcode rotation.
    rotation: RwLock<()>,
    integrity: Arc<IntegrityMonitor>,
}

impl<G: StorageGateway> MigrationManager<G> {
    pub(crate) fn new(
        gateway: G,
        session: Arc<SessionKeyContext>,
        config: VaultConfig,
        integrity: Arc<IntegrityMonitor>,
    ) -> Self {
        Self {
            gateway,
            session,
            config,
            locks: KeyLocks::new(),
            rotation: RwLock::new(()),
            integrity,
        }
    }

    /// The underlying gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Reads a record, decrypting envelopes and passing plaintext through.
    ///
    /// Legacy records are returned byte-for-byte as stored. When the vault is
    /// unlocked and `migrate_on_read` is set, a plaintext record is upgraded
    /// after it has been read; a failed upgrade is logged and does not fail
    /// the read.
    ///
    /// # Errors
    ///
    /// - [`CoreError::KeyUnavailable`] for an envelope while locked
    /// - [`CoreError::Authentication`] if the envelope does not verify
    /// - [`CoreError::UnsupportedVersion`] for a foreign envelope format
    /// - [`CoreError::Storage`] if the gateway fails
    pub async fn read_record(&self, key: &str) -> CoreResult<Option<Vec<u8>>> {
        check_record_key(key)?;
        let _rotation = self.rotation.read().await;
        let secret = self.session.get_secret();

        let Some(raw) = self.gateway.get(key).await? else {
            debug!(key, "record not found");
            return Ok(None);
        };

        match StoredRecord::decode(&raw)? {
            StoredRecord::Encrypted(envelope) => {
                let secret = secret.ok_or(CoreError::KeyUnavailable)?;
                let plaintext = self.open(key, &envelope, &secret)?;
                debug!(key, "record decrypted");
                Ok(Some(plaintext))
            }
            StoredRecord::Plaintext { data, legacy } => {
                debug!(key, legacy, "plaintext record read");
                if let (Some(secret), true) = (secret, self.config.migrate_on_read) {
                    match self.ensure_encrypted_with(key, &secret).await {
                        Ok(status) => debug!(key, ?status, "upgraded on read"),
                        Err(e) => warn!(key, error = %e, "upgrade on read failed"),
                    }
                }
                Ok(Some(data))
            }
        }
    }

    /// Stores `plaintext` under `key`.
    ///
    /// Writes an envelope when unlocked. When locked the configured
    /// [`PlaintextPolicy`] decides between refusing and storing tagged
    /// plaintext.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::KeyUnavailable`] when locked under
    /// [`PlaintextPolicy::Deny`], or any gateway or crypto error.
    pub async fn write_record(&self, key: &str, plaintext: &[u8]) -> CoreResult<WriteOutcome> {
        check_record_key(key)?;
        let _rotation = self.rotation.read().await;
        let secret = self.session.get_secret();
        let _guard = self.locks.acquire(key).await;

        let (record, outcome) = match secret {
            Some(secret) => {
                let envelope =
                    EncryptedEnvelope::seal(plaintext, &secret, self.config.kdf_iterations)?;
                (StoredRecord::Encrypted(envelope), WriteOutcome::Encrypted)
            }
            None => match self.config.plaintext_policy {
                PlaintextPolicy::Deny => return Err(CoreError::KeyUnavailable),
                PlaintextPolicy::AllowWithWarning => {
                    warn!(key, "vault locked: storing record unencrypted");
                    (
                        StoredRecord::plaintext(plaintext.to_vec()),
                        WriteOutcome::Plaintext,
                    )
                }
            },
        };

        self.gateway.set(key, record.encode()?).await?;
        debug!(key, ?outcome, "record written");
        Ok(outcome)
    }

    /// Makes sure the record under `key` is an envelope.
    ///
    /// A plaintext record is sealed, verified, and then overwritten. An
    /// envelope is opened and re-sealed with a fresh salt and nonce, so the
    /// stored bytes change while the content stays the same. Without a secret
    /// nothing is touched and [`MigrationStatus::Skipped`] is returned.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Authentication`] if an envelope does not open with
    /// the session passcode, [`CoreError::MigrationVerifyFailed`] if the new
    /// envelope does not read back, or any gateway error.
    pub async fn ensure_encrypted(&self, key: &str) -> CoreResult<MigrationStatus> {
        check_record_key(key)?;
        let _rotation = self.rotation.read().await;
        match self.session.get_secret() {
            Some(secret) => self.ensure_encrypted_with(key, &secret).await,
            None => {
                warn!(key, "vault locked: migration skipped");
                Ok(MigrationStatus::Skipped)
            }
        }
    }

    /// Runs [`ensure_encrypted`](Self::ensure_encrypted) over `keys`,
    /// collecting per-key results instead of stopping at the first failure.
    pub async fn ensure_all<I, K>(&self, keys: I) -> MigrationReport
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let mut report = MigrationReport::default();
        let _rotation = self.rotation.read().await;
        let secret = self.session.get_secret();

        for key in keys {
            let key = key.into();
            let result = match (&secret, check_record_key(&key)) {
                (_, Err(e)) => Err(e),
                (Some(secret), Ok(())) => self.ensure_encrypted_with(&key, secret).await,
                (None, Ok(())) => Ok(MigrationStatus::Skipped),
            };
            if let Err(e) = &result {
                warn!(key = %key, error = %e, "migration failed");
            }
            report.record(key, result);
        }

        info!(
            migrated = report.migrated.len(),
            refreshed = report.refreshed.len(),
            skipped = report.skipped.len(),
            missing = report.missing.len(),
            failed = report.failed.len(),
            "migration pass complete"
        );
        report
    }

    /// Lists every record key the gateway holds, minus reserved keys.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] if the gateway cannot enumerate keys.
    pub async fn record_keys(&self) -> CoreResult<Vec<String>> {
        let mut keys = self.gateway.keys().await?;
        keys.retain(|k| !is_reserved_key(k));
        Ok(keys)
    }

    /// Describes the stored form of a record without decrypting it.
    ///
    /// # Errors
    ///
    /// Returns a gateway error or a decode error for malformed records.
    pub async fn inspect(&self, key: &str) -> CoreResult<Option<RecordInfo>> {
        check_record_key(key)?;
        let Some(raw) = self.gateway.get(key).await? else {
            return Ok(None);
        };

        let form = match StoredRecord::decode(&raw)? {
            StoredRecord::Plaintext { legacy: true, .. } => RecordForm::Legacy,
            StoredRecord::Plaintext { legacy: false, .. } => RecordForm::Plaintext,
            StoredRecord::Encrypted(envelope) => RecordForm::Encrypted {
                format_version: envelope.format_version().to_string(),
                created_at: envelope.created_at(),
                kdf_iterations: envelope.kdf_iterations(),
                ciphertext_len: envelope.ciphertext().len(),
            },
        };
        Ok(Some(RecordInfo {
            key: key.to_string(),
            form,
            stored_len: raw.len(),
        }))
    }

    async fn ensure_encrypted_with(
        &self,
        key: &str,
        secret: &Passcode,
    ) -> CoreResult<MigrationStatus> {
        let _guard = self.locks.acquire(key).await;

        let Some(raw) = self.gateway.get(key).await? else {
            return Ok(MigrationStatus::Missing);
        };

        let (plaintext, status) = match StoredRecord::decode(&raw)? {
            StoredRecord::Plaintext { data, .. } => (data, MigrationStatus::Migrated),
            StoredRecord::Encrypted(envelope) => {
                (self.open(key, &envelope, secret)?, MigrationStatus::Refreshed)
            }
        };

        self.store_verified(key, &plaintext, secret).await?;
        match status {
            MigrationStatus::Migrated => info!(key, "legacy record encrypted"),
            _ => debug!(key, "envelope refreshed"),
        }
        Ok(status)
    }

    /// Seals `plaintext`, proves the encoded result opens to the same bytes,
    /// then writes it. Callers hold the key lock.
    pub(crate) async fn store_verified(
        &self,
        key: &str,
        plaintext: &[u8],
        secret: &Passcode,
    ) -> CoreResult<()> {
        let envelope = EncryptedEnvelope::seal(plaintext, secret, self.config.kdf_iterations)?;
        let encoded = StoredRecord::Encrypted(envelope).encode()?;

        if self.config.verify_migration_writes {
            let reopened = match StoredRecord::decode(&encoded)? {
                StoredRecord::Encrypted(envelope) => envelope.open(secret).ok(),
                StoredRecord::Plaintext { .. } => None,
            };
            if reopened.as_deref() != Some(plaintext) {
                warn!(key, "new envelope failed verification, record left intact");
                return Err(CoreError::migration_verify_failed(key));
            }
        }

        self.gateway.set(key, encoded).await?;
        Ok(())
    }

    /// Waits for in-flight record operations and holds off new ones until the
    /// guard is dropped. The session secret must be replaced before release.
    pub(crate) async fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.rotation.write().await
    }

    /// Takes the key lock, for callers that rewrite outside this module.
    pub(crate) async fn lock_key(&self, key: &str) -> tokio::sync::OwnedMutexGuard<()> {
        self.locks.acquire(key).await
    }

    fn open(&self, key: &str, envelope: &EncryptedEnvelope, secret: &Passcode) -> CoreResult<Vec<u8>> {
        envelope.open(secret).map_err(|e| {
            if matches!(e, CoreError::Authentication) {
                self.integrity.record_auth_failure();
                warn!(key, "record failed authentication");
            }
            e
        })
    }
}

impl<G> std::fmt::Debug for MigrationManager<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationManager")
            .field("session", &self.session)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Rejects empty keys and keys under the reserved prefix.
pub(crate) fn check_record_key(key: &str) -> CoreResult<()> {
    if key.is_empty() || is_reserved_key(key) {
        return Err(CoreError::invalid_key(key));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::is_legacy_format;
    use crate::session::ManualClock;
    use recordvault_storage::InMemoryGateway;
    use std::time::Duration;

    const PROFILE: &[u8] = br#"{"name":"Ada","title":"Engineer"}"#;

    fn manager(config: VaultConfig) -> (MigrationManager<InMemoryGateway>, Arc<SessionKeyContext>) {
        let clock = Arc::new(ManualClock::new());
        let session = Arc::new(SessionKeyContext::with_clock(
            Duration::from_secs(60),
            clock,
        ));
        let manager = MigrationManager::new(
            InMemoryGateway::new(),
            Arc::clone(&session),
            config,
            Arc::new(IntegrityMonitor::default()),
        );
        (manager, session)
    }

    fn unlocked() -> MigrationManager<InMemoryGateway> {
        let (manager, session) = manager(VaultConfig::for_testing());
        session.set_secret(Some(Passcode::new("4321")));
        manager
    }

    #[tokio::test]
    async fn write_then_read() {
        let manager = unlocked();
        let outcome = manager.write_record("profile", PROFILE).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Encrypted);

        let raw = manager.gateway().raw("profile").unwrap();
        assert!(!is_legacy_format(&raw));
        assert!(!String::from_utf8_lossy(&raw).contains("Ada"));

        assert_eq!(
            manager.read_record("profile").await.unwrap().as_deref(),
            Some(PROFILE)
        );
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let manager = unlocked();
        assert_eq!(manager.read_record("nothing").await.unwrap(), None);
        assert_eq!(
            manager.ensure_encrypted("nothing").await.unwrap(),
            MigrationStatus::Missing
        );
    }

    #[tokio::test]
    async fn locked_read_of_envelope_is_key_unavailable() {
        let (manager, session) = manager(VaultConfig::for_testing());
        session.set_secret(Some(Passcode::new("4321")));
        manager.write_record("profile", PROFILE).await.unwrap();
        session.clear();

        assert!(matches!(
            manager.read_record("profile").await,
            Err(CoreError::KeyUnavailable)
        ));
    }

    #[tokio::test]
    async fn locked_write_denied_by_default() {
        let (manager, _) = manager(VaultConfig::for_testing());
        assert!(matches!(
            manager.write_record("profile", PROFILE).await,
            Err(CoreError::KeyUnavailable)
        ));
        assert!(manager.gateway().is_empty());
    }

    #[tokio::test]
    async fn locked_write_allowed_with_warning() {
        let config = VaultConfig::for_testing().plaintext_policy(PlaintextPolicy::AllowWithWarning);
        let (manager, session) = manager(config);

        let outcome = manager.write_record("profile", PROFILE).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Plaintext);
        assert_eq!(
            manager.inspect("profile").await.unwrap().unwrap().form,
            RecordForm::Plaintext
        );

        session.set_secret(Some(Passcode::new("4321")));
        assert_eq!(
            manager.ensure_encrypted("profile").await.unwrap(),
            MigrationStatus::Migrated
        );
        assert!(matches!(
            manager.inspect("profile").await.unwrap().unwrap().form,
            RecordForm::Encrypted { .. }
        ));
    }

    #[tokio::test]
    async fn legacy_record_migrates() {
        let manager = unlocked();
        manager.gateway().insert("profile", PROFILE.to_vec());

        assert_eq!(
            manager.ensure_encrypted("profile").await.unwrap(),
            MigrationStatus::Migrated
        );
        assert!(!is_legacy_format(&manager.gateway().raw("profile").unwrap()));
        assert_eq!(
            manager.read_record("profile").await.unwrap().as_deref(),
            Some(PROFILE)
        );
    }

    #[tokio::test]
    async fn locked_migration_is_skipped() {
        let (manager, _) = manager(VaultConfig::for_testing());
        manager.gateway().insert("profile", PROFILE.to_vec());

        assert_eq!(
            manager.ensure_encrypted("profile").await.unwrap(),
            MigrationStatus::Skipped
        );
        assert_eq!(manager.gateway().raw("profile").unwrap(), PROFILE);
        assert_eq!(manager.gateway().write_count(), 0);
    }

    #[tokio::test]
    async fn read_upgrades_legacy_when_unlocked() {
        let manager = unlocked();
        manager.gateway().insert("profile", PROFILE.to_vec());

        assert_eq!(
            manager.read_record("profile").await.unwrap().as_deref(),
            Some(PROFILE)
        );
        assert!(!is_legacy_format(&manager.gateway().raw("profile").unwrap()));
    }

    #[tokio::test]
    async fn read_leaves_legacy_when_disabled() {
        let (manager, session) = manager(VaultConfig::for_testing().migrate_on_read(false));
        session.set_secret(Some(Passcode::new("4321")));
        manager.gateway().insert("profile", PROFILE.to_vec());

        manager.read_record("profile").await.unwrap();
        assert_eq!(manager.gateway().raw("profile").unwrap(), PROFILE);
    }

    #[tokio::test]
    async fn refresh_changes_bytes_not_content() {
        let manager = unlocked();
        manager.write_record("profile", PROFILE).await.unwrap();
        let before = manager.gateway().raw("profile").unwrap();

        assert_eq!(
            manager.ensure_encrypted("profile").await.unwrap(),
            MigrationStatus::Refreshed
        );
        let after = manager.gateway().raw("profile").unwrap();
        assert_ne!(before, after);
        assert_eq!(
            manager.read_record("profile").await.unwrap().as_deref(),
            Some(PROFILE)
        );
    }

    #[tokio::test]
    async fn wrong_passcode_marks_integrity() {
        let (manager, session) = manager(VaultConfig::for_testing());
        session.set_secret(Some(Passcode::new("4321")));
        manager.write_record("profile", PROFILE).await.unwrap();

        session.set_secret(Some(Passcode::new("9999")));
        assert!(matches!(
            manager.read_record("profile").await,
            Err(CoreError::Authentication)
        ));
        assert!(matches!(
            manager.ensure_encrypted("profile").await,
            Err(CoreError::Authentication)
        ));
        assert_eq!(manager.integrity.auth_failures(), 2);
    }

    #[tokio::test]
    async fn reserved_and_empty_keys_rejected() {
        let manager = unlocked();
        for key in ["", "__recordvault.verifier", "__recordvault.other"] {
            assert!(matches!(
                manager.write_record(key, b"x").await,
                Err(CoreError::InvalidKey { .. })
            ));
            assert!(matches!(
                manager.read_record(key).await,
                Err(CoreError::InvalidKey { .. })
            ));
        }
    }

    #[tokio::test]
    async fn ensure_all_reports_each_key() {
        let manager = unlocked();
        manager.gateway().insert("legacy", b"old".to_vec());
        manager.write_record("sealed", b"new").await.unwrap();
        manager
            .gateway()
            .insert("broken", br#"{"$recordvault":"encrypted","formatVersion":"9"}"#.to_vec());

        let report = manager
            .ensure_all(["legacy", "sealed", "absent", "broken", "__recordvault.x"])
            .await;

        assert_eq!(report.migrated, vec!["legacy"]);
        assert_eq!(report.refreshed, vec!["sealed"]);
        assert_eq!(report.missing, vec!["absent"]);
        assert_eq!(report.failed.len(), 2);
        assert!(matches!(
            report.failed[0].1,
            CoreError::UnsupportedVersion { .. }
        ));
        assert!(!report.is_clean());
        assert_eq!(report.total(), 5);
    }

    #[tokio::test]
    async fn record_keys_hide_reserved() {
        let manager = unlocked();
        manager.gateway().insert("__recordvault.verifier", b"{}".to_vec());
        manager.gateway().insert("profile", PROFILE.to_vec());
        assert_eq!(manager.record_keys().await.unwrap(), vec!["profile"]);
    }
}
