//! Passcode key derivation using PBKDF2-HMAC-SHA256.

use super::secret::Passcode;
use crate::error::{CoreError, CoreResult};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of the derived AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the per-envelope derivation salt in bytes.
pub const SALT_SIZE: usize = 32;
/// Lowest iteration count accepted by a production configuration.
pub const MIN_ITERATIONS: u32 = 100_000;

/// Passcodes are repeated until they reach at least this many bytes.
const STRENGTHEN_MIN_LEN: usize = 16;
/// Appended to every strengthened passcode.
const STRENGTHEN_DOMAIN: &[u8] = b"recordvault.passcode.v1";

/// A derived 256-bit key.
///
/// Never stored. Zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CoreError::derivation(format!(
                "invalid key size: expected {KEY_SIZE}, got {}",
                bytes.len()
            )));
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self { bytes: key })
    }

    /// Returns the key as a byte slice.
    ///
    /// # Security
    ///
    /// Be careful with this method - don't log or serialize the result.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generates a fresh random derivation salt.
#[must_use]
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Derives a key from a passcode.
///
/// Deterministic: identical inputs always give the same key.
///
/// Short passcodes are expanded before hashing (see [`strengthen`]). This adds
/// no entropy; it only keeps tiny inputs from reaching PBKDF2 unpadded. The
/// iteration count is what makes each guess expensive.
///
/// # Errors
///
/// Returns [`CoreError::Derivation`] if the passcode is empty, the salt is not
/// [`SALT_SIZE`] bytes, or `iterations` is zero.
pub fn derive(passcode: &Passcode, salt: &[u8], iterations: u32) -> CoreResult<SymmetricKey> {
    if passcode.is_empty() {
        return Err(CoreError::derivation("passcode is empty"));
    }
    if salt.len() != SALT_SIZE {
        return Err(CoreError::derivation(format!(
            "invalid salt size: expected {SALT_SIZE}, got {}",
            salt.len()
        )));
    }
    if iterations == 0 {
        return Err(CoreError::derivation("iteration count must be positive"));
    }

    let input = strengthen(passcode.as_bytes());
    let mut bytes = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(&input, salt, iterations, &mut bytes);

    let key = SymmetricKey { bytes };
    bytes.zeroize();
    Ok(key)
}

/// Expands a passcode into the PBKDF2 input.
///
/// Layout: `passcode` repeated until at least 16 bytes, then the domain
/// constant, then the original length as big-endian u32. The trailing length
/// keeps the mapping injective: `"ab"` and `"abab"` never collide.
fn strengthen(passcode: &[u8]) -> Zeroizing<Vec<u8>> {
    let repeats = STRENGTHEN_MIN_LEN.div_ceil(passcode.len()).max(1);
    let mut out = Zeroizing::new(Vec::with_capacity(
        passcode.len() * repeats + STRENGTHEN_DOMAIN.len() + 4,
    ));
    for _ in 0..repeats {
        out.extend_from_slice(passcode);
    }
    out.extend_from_slice(STRENGTHEN_DOMAIN);
    out.extend_from_slice(&(passcode.len() as u32).to_be_bytes());
    out
}
