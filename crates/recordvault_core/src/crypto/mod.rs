//! Cryptographic operations for RecordVault.
//!
//! This module provides passcode-based encryption at rest.
//!
//! ## Security Model
//!
//! - PBKDF2-HMAC-SHA256 turns a passcode plus a 32-byte salt into a 256-bit key
//! - AES-256-GCM provides authenticated encryption with a detached 16-byte tag
//! - Every encryption draws a fresh salt and a fresh 12-byte nonce
//! - Keys and passcodes are zeroized on drop
//!
//! ## Usage
//!
//! ```
//! use recordvault_core::crypto::{derive, generate_salt, CipherEngine, Passcode};
//!
//! let passcode = Passcode::new("4921");
//! let salt = generate_salt();
//! let key = derive(&passcode, &salt, 1_000).unwrap();
//!
//! let engine = CipherEngine::new(&key);
//! let sealed = engine.seal(b"secret data").unwrap();
//! let plaintext = engine.open(&sealed).unwrap();
//! assert_eq!(plaintext, b"secret data");
//! ```

mod cipher;
mod kdf;
mod secret;

pub use cipher::{generate_nonce, CipherEngine, Sealed, NONCE_SIZE, TAG_SIZE};
pub use kdf::{derive, generate_salt, SymmetricKey, KEY_SIZE, MIN_ITERATIONS, SALT_SIZE};
pub use secret::Passcode;
