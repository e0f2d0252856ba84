//! CLI command implementations.

pub mod inspect;
pub mod migrate;
pub mod passcode;
pub mod records;
pub mod status;

use recordvault_core::{Passcode, PlaintextPolicy, RecordVault, VaultConfig};
use recordvault_storage::DirectoryGateway;
use std::path::Path;
use tracing::debug;

/// Result type for command implementations.
pub type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Vault settings shared by every command.
#[derive(Debug, Clone)]
pub struct VaultOptions {
    /// PBKDF2 iterations for new envelopes.
    pub iterations: u32,
    /// Store plaintext when locked instead of failing.
    pub allow_plaintext: bool,
    /// Passcode from the command line or environment.
    pub passcode: Option<String>,
}

impl VaultOptions {
    /// Builds the vault configuration these options describe.
    pub fn config(&self) -> VaultConfig {
        let policy = if self.allow_plaintext {
            PlaintextPolicy::AllowWithWarning
        } else {
            PlaintextPolicy::Deny
        };
        VaultConfig::new()
            .kdf_iterations(self.iterations)
            .plaintext_policy(policy)
    }
}

/// Opens the store at `dir` and unlocks it when a passcode was supplied.
pub async fn open_vault(
    dir: &Path,
    options: &VaultOptions,
) -> CommandResult<RecordVault<DirectoryGateway>> {
    let gateway = DirectoryGateway::open(dir)?;
    let vault = RecordVault::new(gateway, options.config())?;

    match &options.passcode {
        Some(passcode) => vault.unlock(Passcode::new(passcode.as_str())).await?,
        None => debug!("no passcode supplied, vault stays locked"),
    }
    Ok(vault)
}

/// Opens the store and fails unless it could be unlocked.
pub async fn open_unlocked(
    dir: &Path,
    options: &VaultOptions,
) -> CommandResult<RecordVault<DirectoryGateway>> {
    if options.passcode.is_none() {
        return Err("A passcode is required (--passcode or RECORDVAULT_PASSCODE)".into());
    }
    open_vault(dir, options).await
}
