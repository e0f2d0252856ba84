//! Error types for RecordVault core.

use recordvault_storage::StorageError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in RecordVault core operations.
///
/// Cryptographic failures are never converted into "no data". A caller that
/// receives [`CoreError::Authentication`] must treat the record as unreadable,
/// which is a different situation from a read returning `Ok(None)`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage gateway error. Transient; the caller may retry.
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    /// The passcode or salt cannot be used for key derivation.
    #[error("key derivation failed: {message}")]
    Derivation {
        /// Description of the bad input.
        message: String,
    },

    /// Tag verification failed: tampered data, wrong passcode, or wrong nonce.
    #[error("authentication failed: record cannot be decrypted")]
    Authentication,

    /// No unlocked passcode is available.
    #[error("vault is locked: passcode required")]
    KeyUnavailable,

    /// The envelope was written by a format this build does not understand.
    #[error("unsupported envelope format version {found:?} (supported: {supported})")]
    UnsupportedVersion {
        /// Version found in the stored record.
        found: String,
        /// Version this build reads and writes.
        supported: &'static str,
    },

    /// The stored record is structurally invalid.
    #[error("invalid record format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// The record key is empty or reserved.
    #[error("invalid record key: {key:?}")]
    InvalidKey {
        /// The rejected key.
        key: String,
    },

    /// The vault configuration is out of range.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// The cipher refused to encrypt.
    #[error("encryption failed: {message}")]
    EncryptionFailed {
        /// Description of the failure.
        message: String,
    },

    /// A migrated envelope did not decrypt back to the legacy content.
    #[error("migration of {key:?} aborted: new envelope failed verification")]
    MigrationVerifyFailed {
        /// The record left untouched.
        key: String,
    },

    /// The stored record changed between validation and rewrite.
    #[error("record {key:?} changed while it was being rewritten")]
    RecordChanged {
        /// The record left as the other writer stored it.
        key: String,
    },

    /// The runtime self-test did not reproduce the expected output.
    #[error("self-test failed: {message}")]
    SelfTestFailed {
        /// Which check failed.
        message: String,
    },
}

/// Stable classification of [`CoreError`] for host UIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad passcode or salt input.
    Derivation,
    /// Tag verification failed.
    Authentication,
    /// The vault is locked.
    KeyUnavailable,
    /// Unknown envelope format version.
    UnsupportedVersion,
    /// Gateway failure.
    StorageFailure,
    /// Malformed record, key, or configuration.
    InvalidInput,
    /// Internal failure of the crypto path.
    Internal,
}

impl CoreError {
    /// Creates a derivation error.
    pub fn derivation(message: impl Into<String>) -> Self {
        Self::Derivation {
            message: message.into(),
        }
    }

    /// Creates an unsupported version error.
    pub fn unsupported_version(found: impl Into<String>) -> Self {
        Self::UnsupportedVersion {
            found: found.into(),
            supported: crate::envelope::FORMAT_VERSION,
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid key error.
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an encryption failed error.
    pub fn encryption_failed(message: impl Into<String>) -> Self {
        Self::EncryptionFailed {
            message: message.into(),
        }
    }

    /// Creates a migration verification error.
    pub fn migration_verify_failed(key: impl Into<String>) -> Self {
        Self::MigrationVerifyFailed { key: key.into() }
    }

    /// Creates a record-changed error.
    pub fn record_changed(key: impl Into<String>) -> Self {
        Self::RecordChanged { key: key.into() }
    }

    /// Creates a self-test failure.
    pub fn self_test_failed(message: impl Into<String>) -> Self {
        Self::SelfTestFailed {
            message: message.into(),
        }
    }

    /// Returns the stable kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Storage(_) | CoreError::RecordChanged { .. } => ErrorKind::StorageFailure,
            CoreError::Derivation { .. } => ErrorKind::Derivation,
            CoreError::Authentication => ErrorKind::Authentication,
            CoreError::KeyUnavailable => ErrorKind::KeyUnavailable,
            CoreError::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            CoreError::InvalidFormat { .. }
            | CoreError::InvalidKey { .. }
            | CoreError::InvalidConfig { .. } => ErrorKind::InvalidInput,
            CoreError::EncryptionFailed { .. }
            | CoreError::MigrationVerifyFailed { .. }
            | CoreError::SelfTestFailed { .. } => ErrorKind::Internal,
        }
    }

    /// Returns true if this error can be retried without user action.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Storage(_) | CoreError::RecordChanged { .. })
    }
}
