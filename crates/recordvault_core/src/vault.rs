//! The vault facade used by hosts.

use crate::config::VaultConfig;
use crate::crypto::Passcode;
use crate::envelope::{StoredRecord, FORMAT_VERSION};
use crate::error::{CoreError, CoreResult};
use crate::migration::{
    check_record_key, MigrationManager, MigrationReport, MigrationStatus, RecordInfo,
    WriteOutcome,
};
use crate::session::{Clock, SessionKeyContext, SessionState, SystemClock};
use crate::status::{cipher_available, pipeline_test, IntegrityMonitor, SecurityStatus};
use crate::verifier::{PasscodeVerifier, VERIFIER_KEY};
use recordvault_storage::{StorageError, StorageGateway};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Envelopes tried against the passcode before a first verifier is written.
const FIRST_UNLOCK_CHECKS: usize = 4;

/// Encrypted record storage over a host-supplied gateway.
///
/// One vault owns one session. Hosts create a single vault per process and
/// share it behind an `Arc`.
///
/// # Example
///
/// ```rust
/// use recordvault_core::{Passcode, RecordVault, VaultConfig};
/// use recordvault_storage::InMemoryGateway;
///
/// # async fn demo() -> Result<(), recordvault_core::CoreError> {
/// let vault = RecordVault::new(InMemoryGateway::new(), VaultConfig::for_testing())?;
/// vault.unlock(Passcode::new("2580")).await?;
///
/// vault.set("profile", br#"{"name":"Ada"}"#).await?;
/// let profile = vault.get("profile").await?;
/// assert_eq!(profile.as_deref(), Some(&br#"{"name":"Ada"}"#[..]));
///
/// vault.lock();
/// assert!(!vault.is_unlocked());
/// # Ok(())
/// # }
/// ```
pub struct RecordVault<G> {
    records: MigrationManager<G>,
    session: Arc<SessionKeyContext>,
    integrity: Arc<IntegrityMonitor>,
    config: VaultConfig,
}

impl<G: StorageGateway> RecordVault<G> {
    /// Creates a locked vault using the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if the configuration is invalid.
    pub fn new(gateway: G, config: VaultConfig) -> CoreResult<Self> {
        Self::with_clock(gateway, config, Arc::new(SystemClock))
    }

    /// Creates a locked vault whose session expiry follows `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if the configuration is invalid.
    pub fn with_clock(gateway: G, config: VaultConfig, clock: Arc<dyn Clock>) -> CoreResult<Self> {
        config.validate()?;
        let session = Arc::new(
            SessionKeyContext::with_clock(config.session_timeout, clock)
                .extend_on_use(config.extend_session_on_use),
        );
        let integrity = Arc::new(IntegrityMonitor::default());
        let records = MigrationManager::new(
            gateway,
            Arc::clone(&session),
            config.clone(),
            Arc::clone(&integrity),
        );
        Ok(Self {
            records,
            session,
            integrity,
            config,
        })
    }

    /// Unlocks the vault.
    ///
    /// The first unlock of a store records a verifier for `passcode`; later
    /// unlocks must match it. If the store already holds envelopes but no
    /// verifier, `passcode` must open one of them before it is recorded.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Derivation`] if the passcode is shorter than configured
    /// - [`CoreError::Authentication`] if it does not match the stored verifier
    ///   or opens none of the existing envelopes
    /// - [`CoreError::Storage`] if the verifier cannot be read or written
    pub async fn unlock(&self, passcode: Passcode) -> CoreResult<()> {
        self.check_passcode(&passcode)?;

        match self.load_verifier().await? {
            Some(verifier) => {
                if let Err(e) = verifier.verify(&passcode) {
                    warn!("unlock rejected: passcode does not match");
                    return Err(e);
                }
            }
            None => {
                self.match_existing_envelopes(&passcode).await?;
                let verifier = PasscodeVerifier::create(&passcode, self.config.kdf_iterations)?;
                self.records
                    .gateway()
                    .set(VERIFIER_KEY, verifier.to_bytes()?)
                    .await?;
                info!("passcode verifier created");
            }
        }

        self.integrity.reset_auth_failures();
        self.session.set_secret(Some(passcode));
        Ok(())
    }

    /// Drops the cached passcode.
    pub fn lock(&self) {
        self.session.clear();
    }

    /// Returns true while a non-expired passcode is held.
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.session.is_available()
    }

    /// Session state including the time left.
    #[must_use]
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Reads a record. `Ok(None)` means nothing is stored under `key`.
    ///
    /// # Errors
    ///
    /// See [`MigrationManager::read_record`].
    pub async fn get(&self, key: &str) -> CoreResult<Option<Vec<u8>>> {
        self.records.read_record(key).await
    }

    /// Writes a record.
    ///
    /// # Errors
    ///
    /// See [`MigrationManager::write_record`].
    pub async fn set(&self, key: &str, plaintext: &[u8]) -> CoreResult<WriteOutcome> {
        self.records.write_record(key, plaintext).await
    }

    /// Makes sure one record is stored encrypted.
    ///
    /// # Errors
    ///
    /// See [`MigrationManager::ensure_encrypted`].
    pub async fn ensure_encrypted(&self, key: &str) -> CoreResult<MigrationStatus> {
        self.records.ensure_encrypted(key).await
    }

    /// Migrates the listed records.
    pub async fn migrate<I, K>(&self, keys: I) -> MigrationReport
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.records.ensure_all(keys).await
    }

    /// Migrates every record the gateway can enumerate.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] if the gateway cannot list keys.
    pub async fn migrate_all(&self) -> CoreResult<MigrationReport> {
        let keys = self.records.record_keys().await?;
        Ok(self.records.ensure_all(keys).await)
    }

    /// Lists record keys, if the gateway supports enumeration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] if the gateway cannot list keys.
    pub async fn keys(&self) -> CoreResult<Vec<String>> {
        self.records.record_keys().await
    }

    /// Describes a stored record without decrypting it.
    ///
    /// # Errors
    ///
    /// See [`MigrationManager::inspect`].
    pub async fn inspect(&self, key: &str) -> CoreResult<Option<RecordInfo>> {
        self.records.inspect(key).await
    }

    /// Re-encrypts `keys` under `new` and replaces the verifier.
    ///
    /// Every record is opened before anything is written, so a wrong `old`
    /// passcode or an unreadable record aborts with the store untouched. A
    /// record that already opens with `new` is left as it is, which makes an
    /// interrupted rotation safe to run again with the same arguments. The
    /// verifier is replaced last. Returns the number of records rewritten.
    ///
    /// Record reads and writes on this vault wait until the rotation ends.
    /// A listed record changed by another writer between validation and its
    /// rewrite aborts the rotation with [`CoreError::RecordChanged`]; running
    /// it again picks up the new content.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Authentication`] if `old` does not match the verifier
    ///   or a record opens with neither passcode
    /// - [`CoreError::Derivation`] if `new` is too short
    /// - [`CoreError::RecordChanged`] if another writer changed a listed record
    /// - any gateway or verification error from the rewrite
    pub async fn change_passcode(
        &self,
        old: &Passcode,
        new: Passcode,
        keys: &[String],
    ) -> CoreResult<usize> {
        self.check_passcode(&new)?;
        let _rotation = self.records.exclusive().await;
        let verifier = self.load_verifier().await?;
        if let Some(verifier) = &verifier {
            // A previous run may have finished the verifier swap already.
            if verifier.verify(old).is_err() {
                verifier.verify(&new)?;
            }
        }

        let mut pending = Vec::new();
        for key in keys {
            check_record_key(key)?;
            let Some(raw) = self.records.gateway().get(key).await? else {
                continue;
            };
            match StoredRecord::decode(&raw)? {
                StoredRecord::Plaintext { data, .. } => pending.push((key, raw, data)),
                StoredRecord::Encrypted(envelope) => match envelope.open(old) {
                    Ok(data) => pending.push((key, raw, data)),
                    Err(CoreError::Authentication) => {
                        if envelope.open(&new).is_err() {
                            self.integrity.record_auth_failure();
                            warn!(key = %key, "passcode change aborted: record opens with neither passcode");
                            return Err(CoreError::Authentication);
                        }
                    }
                    Err(e) => return Err(e),
                },
            }
        }

        for (key, raw, data) in &pending {
            let _guard = self.records.lock_key(key).await;
            if self.records.gateway().get(key).await?.as_ref() != Some(raw) {
                warn!(key = %key, "passcode change aborted: record changed during rotation");
                return Err(CoreError::record_changed(key.as_str()));
            }
            self.records.store_verified(key, data, &new).await?;
        }

        let verifier = PasscodeVerifier::create(&new, self.config.kdf_iterations)?;
        self.records
            .gateway()
            .set(VERIFIER_KEY, verifier.to_bytes()?)
            .await?;

        self.integrity.reset_auth_failures();
        self.session.set_secret(Some(new));
        info!(rewritten = pending.len(), "passcode changed");
        Ok(pending.len())
    }

    /// Reports the vault's security state.
    #[must_use]
    pub fn check_status(&self) -> SecurityStatus {
        SecurityStatus {
            available: cipher_available(),
            unlocked: self.session.is_available(),
            integrity_ok: self.integrity.is_ok(),
            version: FORMAT_VERSION,
        }
    }

    /// Runs the AES-GCM known-answer test and a full envelope round-trip.
    ///
    /// A failure is remembered and reported by [`check_status`](Self::check_status)
    /// until a later self-test passes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SelfTestFailed`] describing the failed step.
    pub fn self_test(&self) -> CoreResult<()> {
        let result = pipeline_test(self.config.kdf_iterations);
        self.integrity.record_self_test(result.is_ok());
        match &result {
            Ok(()) => info!("self-test passed"),
            Err(e) => warn!(error = %e, "self-test failed"),
        }
        result
    }

    /// The vault configuration.
    #[must_use]
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// The underlying gateway.
    #[must_use]
    pub fn gateway(&self) -> &G {
        self.records.gateway()
    }

    fn check_passcode(&self, passcode: &Passcode) -> CoreResult<()> {
        if passcode.is_empty() {
            return Err(CoreError::derivation("passcode is empty"));
        }
        if passcode.char_len() < self.config.min_passcode_len {
            return Err(CoreError::derivation(format!(
                "passcode must be at least {} characters",
                self.config.min_passcode_len
            )));
        }
        Ok(())
    }

    /// Rejects `passcode` when the store holds envelopes and it opens none of
    /// the first few. Records that do not decode are left to reads to report.
    async fn match_existing_envelopes(&self, passcode: &Passcode) -> CoreResult<()> {
        let keys = match self.records.record_keys().await {
            Ok(keys) => keys,
            Err(CoreError::Storage(StorageError::Unsupported(_))) => {
                debug!("gateway cannot list keys, first passcode accepted unchecked");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let mut rejected = 0;
        for key in keys {
            if rejected == FIRST_UNLOCK_CHECKS {
                break;
            }
            let Some(raw) = self.records.gateway().get(&key).await? else {
                continue;
            };
            let Ok(StoredRecord::Encrypted(envelope)) = StoredRecord::decode(&raw) else {
                continue;
            };
            match envelope.open(passcode) {
                Ok(_) => return Ok(()),
                Err(CoreError::Authentication) => rejected += 1,
                Err(_) => {}
            }
        }

        if rejected > 0 {
            warn!(rejected, "unlock rejected: passcode opens none of the stored records");
            return Err(CoreError::Authentication);
        }
        Ok(())
    }

    async fn load_verifier(&self) -> CoreResult<Option<PasscodeVerifier>> {
        match self.records.gateway().get(VERIFIER_KEY).await? {
            Some(raw) => PasscodeVerifier::from_bytes(&raw).map(Some),
            None => Ok(None),
        }
    }
}

impl<G> std::fmt::Debug for RecordVault<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordVault")
            .field("session", &self.session)
            .field("integrity_ok", &self.integrity.is_ok())
            .finish_non_exhaustive()
    }
}
