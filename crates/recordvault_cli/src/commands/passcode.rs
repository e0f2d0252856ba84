//! Change-passcode command implementation.

use super::{open_unlocked, CommandResult, VaultOptions};
use recordvault_core::Passcode;
use std::path::Path;
use tracing::info;

/// Re-encrypts every record under `new_passcode`.
pub async fn change(dir: &Path, options: &VaultOptions, new_passcode: String) -> CommandResult {
    let vault = open_unlocked(dir, options).await?;
    let old = Passcode::new(options.passcode.clone().unwrap_or_default());
    let keys = vault.keys().await?;

    info!(records = keys.len(), "changing passcode");
    let rewritten = vault
        .change_passcode(&old, Passcode::new(new_passcode), &keys)
        .await?;
    println!("Passcode changed; {rewritten} record(s) re-encrypted");
    Ok(())
}
