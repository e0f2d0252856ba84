//! Vault configuration.

use crate::crypto::MIN_ITERATIONS;
use crate::error::{CoreError, CoreResult};
use std::time::Duration;

/// What to do when a record is written while the vault is locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaintextPolicy {
    /// Refuse the write with [`CoreError::KeyUnavailable`].
    Deny,
    /// Store the record as tagged plaintext and log a warning.
    ///
    /// The record is upgraded by the next migration pass once unlocked.
    AllowWithWarning,
}

/// Configuration for a [`crate::RecordVault`].
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// PBKDF2 iteration count for new envelopes and verifiers.
    pub kdf_iterations: u32,

    /// Permit iteration counts below [`MIN_ITERATIONS`]. Tests and benches only.
    pub allow_weak_kdf: bool,

    /// How long an unlocked session stays unlocked.
    pub session_timeout: Duration,

    /// Whether each successful secret access restarts the timeout window.
    pub extend_session_on_use: bool,

    /// Shortest accepted passcode, in characters.
    pub min_passcode_len: usize,

    /// Behavior for writes while locked.
    pub plaintext_policy: PlaintextPolicy,

    /// Whether reading a plaintext record while unlocked upgrades it.
    pub migrate_on_read: bool,

    /// Whether migrations decrypt the new envelope before overwriting.
    pub verify_migration_writes: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            kdf_iterations: MIN_ITERATIONS,
            allow_weak_kdf: false,
            session_timeout: Duration::from_secs(15 * 60),
            extend_session_on_use: false,
            min_passcode_len: 4,
            plaintext_policy: PlaintextPolicy::Deny,
            migrate_on_read: true,
            verify_migration_writes: true,
        }
    }
}

impl VaultConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration with a tiny iteration count, for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            kdf_iterations: 1_000,
            allow_weak_kdf: true,
            ..Self::default()
        }
    }

    /// Sets the PBKDF2 iteration count.
    #[must_use]
    pub const fn kdf_iterations(mut self, iterations: u32) -> Self {
        self.kdf_iterations = iterations;
        self
    }

    /// Sets the session timeout.
    #[must_use]
    pub const fn session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Sets whether secret access extends the session.
    #[must_use]
    pub const fn extend_session_on_use(mut self, value: bool) -> Self {
        self.extend_session_on_use = value;
        self
    }

    /// Sets the minimum passcode length.
    #[must_use]
    pub const fn min_passcode_len(mut self, len: usize) -> Self {
        self.min_passcode_len = len;
        self
    }

    /// Sets the locked-write policy.
    #[must_use]
    pub const fn plaintext_policy(mut self, policy: PlaintextPolicy) -> Self {
        self.plaintext_policy = policy;
        self
    }

    /// Sets whether reads upgrade plaintext records.
    #[must_use]
    pub const fn migrate_on_read(mut self, value: bool) -> Self {
        self.migrate_on_read = value;
        self
    }

    /// Sets whether migrations verify before overwriting.
    #[must_use]
    pub const fn verify_migration_writes(mut self, value: bool) -> Self {
        self.verify_migration_writes = value;
        self
    }

    /// Checks that every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] describing the first bad value.
    pub fn validate(&self) -> CoreResult<()> {
        if self.kdf_iterations == 0 {
            return Err(CoreError::invalid_config("kdf_iterations must be positive"));
        }
        if self.kdf_iterations < MIN_ITERATIONS && !self.allow_weak_kdf {
            return Err(CoreError::invalid_config(format!(
                "kdf_iterations {} is below the minimum of {MIN_ITERATIONS}",
                self.kdf_iterations
            )));
        }
        if self.session_timeout.is_zero() {
            return Err(CoreError::invalid_config("session_timeout must be positive"));
        }
        if self.min_passcode_len == 0 {
            return Err(CoreError::invalid_config("min_passcode_len must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = VaultConfig::default();
        assert_eq!(config.kdf_iterations, 100_000);
        assert_eq!(config.plaintext_policy, PlaintextPolicy::Deny);
        assert!(config.verify_migration_writes);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_pattern() {
        let config = VaultConfig::new()
            .kdf_iterations(250_000)
            .session_timeout(Duration::from_secs(60))
            .plaintext_policy(PlaintextPolicy::AllowWithWarning)
            .min_passcode_len(6);

        assert_eq!(config.kdf_iterations, 250_000);
        assert_eq!(config.session_timeout, Duration::from_secs(60));
        assert_eq!(config.plaintext_policy, PlaintextPolicy::AllowWithWarning);
        assert_eq!(config.min_passcode_len, 6);
    }

    #[test]
    fn weak_kdf_rejected_unless_allowed() {
        let config = VaultConfig::new().kdf_iterations(10);
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidConfig { .. })
        ));

        assert!(VaultConfig::for_testing().validate().is_ok());
    }

    #[test]
    fn zero_values_rejected() {
        assert!(VaultConfig::new()
            .session_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(VaultConfig::new().min_passcode_len(0).validate().is_err());
        assert!(VaultConfig::for_testing().kdf_iterations(0).validate().is_err());
    }
}
