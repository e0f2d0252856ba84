//! Status and self-test commands.

use super::{open_vault, CommandResult, VaultOptions};
use recordvault_core::pipeline_test;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct StatusOutput {
    available: bool,
    unlocked: bool,
    integrity_ok: bool,
    version: &'static str,
    records: usize,
}

/// Shows the vault's security state.
pub async fn status(dir: &Path, options: &VaultOptions, format: &str) -> CommandResult {
    let vault = open_vault(dir, options).await?;
    let status = vault.check_status();
    let output = StatusOutput {
        available: status.available,
        unlocked: status.unlocked,
        integrity_ok: status.integrity_ok,
        version: status.version,
        records: vault.keys().await?.len(),
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&output)?),
        _ => {
            println!("Vault Status");
            println!("============");
            println!("  Path:           {}", dir.display());
            println!("  Crypto:         {}", yes_no(output.available));
            println!("  Unlocked:       {}", yes_no(output.unlocked));
            println!("  Integrity OK:   {}", yes_no(output.integrity_ok));
            println!("  Format version: {}", output.version);
            println!("  Records:        {}", output.records);
        }
    }
    Ok(())
}

/// Runs the cryptographic self-test.
pub fn self_test(options: &VaultOptions) -> CommandResult {
    pipeline_test(options.iterations)?;
    println!("Self-test passed: AES-256-GCM known answer and envelope round-trip");
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
