//! # RecordVault Core
//!
//! Passcode-derived encryption at rest for locally stored records.
//!
//! This crate provides:
//! - PBKDF2 key derivation and AES-256-GCM authenticated encryption
//! - A versioned record envelope with legacy plaintext pass-through
//! - A time-bounded session holding the unlocked passcode
//! - Write-then-verify migration of legacy records
//! - Status reporting and a runtime self-test
//!
//! Storage is supplied by the host through
//! [`recordvault_storage::StorageGateway`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
pub mod crypto;
mod encoding;
mod envelope;
mod error;
mod locks;
mod migration;
mod session;
mod status;
mod vault;
mod verifier;

pub use config::{PlaintextPolicy, VaultConfig};
pub use crypto::{Passcode, SymmetricKey};
pub use envelope::{is_legacy_format, EncryptedEnvelope, EnvelopeParts, StoredRecord, FORMAT_VERSION};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use migration::{
    MigrationManager, MigrationReport, MigrationStatus, RecordForm, RecordInfo, WriteOutcome,
};
pub use session::{Clock, ManualClock, SessionKeyContext, SessionState, SystemClock};
pub use status::{known_answer_test, pipeline_test, SecurityStatus};
pub use vault::RecordVault;
pub use verifier::{is_reserved_key, PasscodeVerifier, RESERVED_PREFIX, VERIFIER_KEY};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
