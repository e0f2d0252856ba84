//! # RecordVault Storage
//!
//! Storage gateway trait and reference adapters for RecordVault.
//!
//! This crate provides the lowest-level persistence boundary. Gateways are
//! **opaque key-value stores** - they do not interpret the bytes they hold.
//!
//! ## Design Principles
//!
//! - Gateways are simple async byte stores (get, set by key)
//! - No knowledge of envelopes, legacy records, or encryption
//! - Must be `Send + Sync` so one gateway can serve concurrent operations
//! - Failures are reported, never retried here
//!
//! ## Available Gateways
//!
//! - [`InMemoryGateway`] - For testing and ephemeral storage
//! - [`DirectoryGateway`] - One file per key under a root directory
//!
//! ## Example
//!
//! ```rust
//! use recordvault_storage::{InMemoryGateway, StorageGateway, StorageResult};
//!
//! # async fn demo() -> StorageResult<()> {
//! let gateway = InMemoryGateway::new();
//! gateway.set("profile", b"hello world".to_vec()).await?;
//! let data = gateway.get("profile").await?;
//! assert_eq!(data.as_deref(), Some(&b"hello world"[..]));
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod directory;
mod error;
mod gateway;
mod memory;

pub use directory::DirectoryGateway;
pub use error::{StorageError, StorageResult};
pub use gateway::{validate_key, StorageGateway};
pub use memory::InMemoryGateway;
