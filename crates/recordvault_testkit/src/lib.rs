//! # RecordVault Testkit
//!
//! Test utilities for RecordVault.
//!
//! This crate provides:
//! - Vault fixtures over in-memory and directory gateways
//! - A gateway wrapper that injects storage failures
//! - Property-based test generators using proptest
//! - Known-answer vectors for the cipher and the record codec
//! - Fuzz harnesses for record decoding and envelope tampering
//!
//! The cross-crate integration tests live in this crate's `tests/` directory.
//!
//! ## Usage
//!
//! ```rust
//! use recordvault_testkit::prelude::*;
//!
//! # async fn demo() {
//! let fixture = TestVault::unlocked("2580").await;
//! fixture.set("profile", b"Ada").await.unwrap();
//! fixture.clock.advance(std::time::Duration::from_secs(3600));
//! assert!(!fixture.is_unlocked());
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod fuzz;
pub mod generators;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::fuzz::*;
    pub use crate::generators::*;
    pub use crate::vectors::*;
}

pub use fixtures::*;
pub use fuzz::*;
pub use generators::*;
pub use vectors::*;
