//! Migrate command implementation.

use super::{open_unlocked, CommandResult, VaultOptions};
use std::path::Path;
use tracing::info;

/// Encrypts legacy records and refreshes existing envelopes.
pub async fn run(dir: &Path, options: &VaultOptions, keys: Vec<String>) -> CommandResult {
    let vault = open_unlocked(dir, options).await?;
    info!("Migrating records in {:?}", dir);

    let report = if keys.is_empty() {
        vault.migrate_all().await?
    } else {
        vault.migrate(keys).await
    };

    println!("Migration Report");
    println!("================");
    println!("  Migrated:  {}", report.migrated.len());
    println!("  Refreshed: {}", report.refreshed.len());
    println!("  Skipped:   {}", report.skipped.len());
    println!("  Missing:   {}", report.missing.len());
    println!("  Failed:    {}", report.failed.len());

    for key in &report.migrated {
        println!("  + {key}");
    }
    for (key, error) in &report.failed {
        println!("  ! {key}: {error}");
    }

    if report.is_clean() {
        Ok(())
    } else {
        Err(format!("{} record(s) failed to migrate", report.failed.len()).into())
    }
}
