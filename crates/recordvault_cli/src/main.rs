//! RecordVault CLI
//!
//! Command-line tools for RecordVault stores kept in a directory.
//!
//! # Commands
//!
//! - `put` / `get` - Write and read a record
//! - `migrate` - Encrypt legacy records
//! - `inspect` - Show the stored form of records without decrypting them
//! - `status` - Show the vault's security state
//! - `self-test` - Run the cryptographic self-test
//! - `change-passcode` - Re-encrypt every record under a new passcode

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// RecordVault command-line tools.
#[derive(Parser)]
#[command(name = "recordvault")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long, env = "RECORDVAULT_DIR")]
    dir: Option<PathBuf>,

    /// Passcode used to unlock the vault
    #[arg(global = true, long, env = "RECORDVAULT_PASSCODE", hide_env_values = true)]
    passcode: Option<String>,

    /// PBKDF2 iterations for new envelopes
    #[arg(global = true, long, default_value_t = recordvault_core::crypto::MIN_ITERATIONS)]
    iterations: u32,

    /// Store records unencrypted when no passcode is given
    #[arg(global = true, long)]
    allow_plaintext: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a record
    Put {
        /// Record key
        key: String,

        /// Record value (reads --file when omitted)
        value: Option<String>,

        /// Read the value from this file
        #[arg(short, long, conflicts_with = "value")]
        file: Option<PathBuf>,
    },

    /// Read a record
    Get {
        /// Record key
        key: String,

        /// Write the value to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Encrypt legacy records
    Migrate {
        /// Keys to migrate (all records when empty)
        keys: Vec<String>,
    },

    /// Show the stored form of records
    Inspect {
        /// Keys to inspect (all records when empty)
        keys: Vec<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show the vault's security state
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run the cryptographic self-test
    SelfTest,

    /// Re-encrypt every record under a new passcode
    ChangePasscode {
        /// The new passcode
        #[arg(long, env = "RECORDVAULT_NEW_PASSCODE", hide_env_values = true)]
        new_passcode: String,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = commands::VaultOptions {
        iterations: cli.iterations,
        allow_plaintext: cli.allow_plaintext,
        passcode: cli.passcode,
    };

    match cli.command {
        Commands::Put { key, value, file } => {
            let dir = cli.dir.ok_or("Store directory required for put")?;
            let bytes = match (value, file) {
                (Some(value), _) => value.into_bytes(),
                (None, Some(file)) => std::fs::read(file)?,
                (None, None) => return Err("Either a value or --file is required".into()),
            };
            commands::records::put(&dir, &options, &key, &bytes).await?;
        }
        Commands::Get { key, output } => {
            let dir = cli.dir.ok_or("Store directory required for get")?;
            commands::records::get(&dir, &options, &key, output.as_deref()).await?;
        }
        Commands::Migrate { keys } => {
            let dir = cli.dir.ok_or("Store directory required for migrate")?;
            commands::migrate::run(&dir, &options, keys).await?;
        }
        Commands::Inspect { keys, format } => {
            let dir = cli.dir.ok_or("Store directory required for inspect")?;
            commands::inspect::run(&dir, &options, keys, &format).await?;
        }
        Commands::Status { format } => {
            let dir = cli.dir.ok_or("Store directory required for status")?;
            commands::status::status(&dir, &options, &format).await?;
        }
        Commands::SelfTest => {
            commands::status::self_test(&options)?;
        }
        Commands::ChangePasscode { new_passcode } => {
            let dir = cli.dir.ok_or("Store directory required for change-passcode")?;
            commands::passcode::change(&dir, &options, new_passcode).await?;
        }
        Commands::Version => {
            println!("RecordVault CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("RecordVault Core v{}", recordvault_core::VERSION);
            println!("Envelope format v{}", recordvault_core::FORMAT_VERSION);
        }
    }

    Ok(())
}
