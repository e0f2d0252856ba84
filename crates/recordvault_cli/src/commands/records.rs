//! Put and get commands.

use super::{open_unlocked, open_vault, CommandResult, VaultOptions};
use recordvault_core::WriteOutcome;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Writes one record.
pub async fn put(dir: &Path, options: &VaultOptions, key: &str, value: &[u8]) -> CommandResult {
    let vault = open_vault(dir, options).await?;
    match vault.set(key, value).await? {
        WriteOutcome::Encrypted => info!(key, bytes = value.len(), "record encrypted and stored"),
        WriteOutcome::Plaintext => info!(key, bytes = value.len(), "record stored unencrypted"),
    }
    Ok(())
}

/// Reads one record to stdout or a file.
pub async fn get(
    dir: &Path,
    options: &VaultOptions,
    key: &str,
    output: Option<&Path>,
) -> CommandResult {
    let vault = open_unlocked(dir, options).await?;
    let value = vault
        .get(key)
        .await?
        .ok_or_else(|| format!("No record stored under {key:?}"))?;

    match output {
        Some(path) => {
            std::fs::write(path, &value)?;
            info!(key, path = %path.display(), "record written to file");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&value)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
