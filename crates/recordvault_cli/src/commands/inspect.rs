//! Inspect command implementation.

use super::{open_vault, CommandResult, VaultOptions};
use recordvault_core::{RecordForm, RecordInfo};
use serde::Serialize;
use std::path::Path;

/// Inspection result for one record.
#[derive(Debug, Serialize)]
pub struct InspectEntry {
    /// Record key.
    pub key: String,
    /// `legacy`, `plaintext`, `encrypted`, `missing` or `error`.
    pub form: &'static str,
    /// Stored size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_len: Option<usize>,
    /// Envelope format version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_version: Option<String>,
    /// Envelope creation time, milliseconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
    /// PBKDF2 iterations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kdf_iterations: Option<u32>,
    /// Why the record could not be decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InspectEntry {
    fn missing(key: String) -> Self {
        Self {
            key,
            form: "missing",
            stored_len: None,
            format_version: None,
            created_at: None,
            kdf_iterations: None,
            error: None,
        }
    }

    fn failed(key: String, error: String) -> Self {
        Self {
            form: "error",
            error: Some(error),
            ..Self::missing(key)
        }
    }
}

impl From<RecordInfo> for InspectEntry {
    fn from(info: RecordInfo) -> Self {
        let base = Self {
            stored_len: Some(info.stored_len),
            ..Self::missing(info.key)
        };
        match info.form {
            RecordForm::Legacy => Self {
                form: "legacy",
                ..base
            },
            RecordForm::Plaintext => Self {
                form: "plaintext",
                ..base
            },
            RecordForm::Encrypted {
                format_version,
                created_at,
                kdf_iterations,
                ..
            } => Self {
                form: "encrypted",
                format_version: Some(format_version),
                created_at: Some(created_at),
                kdf_iterations: Some(kdf_iterations),
                ..base
            },
        }
    }
}

/// Runs the inspect command. No passcode is needed.
pub async fn run(
    dir: &Path,
    options: &VaultOptions,
    keys: Vec<String>,
    format: &str,
) -> CommandResult {
    let locked = VaultOptions {
        passcode: None,
        ..options.clone()
    };
    let vault = open_vault(dir, &locked).await?;
    let keys = if keys.is_empty() {
        vault.keys().await?
    } else {
        keys
    };

    let mut entries = Vec::with_capacity(keys.len());
    for key in keys {
        let entry = match vault.inspect(&key).await {
            Ok(Some(info)) => InspectEntry::from(info),
            Ok(None) => InspectEntry::missing(key),
            Err(e) => InspectEntry::failed(key, e.to_string()),
        };
        entries.push(entry);
    }

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => print_text(&entries),
    }
    Ok(())
}

fn print_text(entries: &[InspectEntry]) {
    println!("Records");
    println!("=======");
    if entries.is_empty() {
        println!("  No records stored.");
    }
    for entry in entries {
        let size = entry
            .stored_len
            .map(|n| format!("{n} bytes"))
            .unwrap_or_default();
        println!("  {:<24} {:<10} {}", entry.key, entry.form, size);
        if let (Some(version), Some(iterations)) = (&entry.format_version, entry.kdf_iterations) {
            println!("      format v{version}, {iterations} PBKDF2 iterations");
        }
        if let Some(error) = &entry.error {
            println!("      {error}");
        }
    }
}
