//! Persisted passcode verifier.
//!
//! Lets `unlock` reject a wrong passcode up front instead of letting the
//! first record read fail. Only an HMAC over a PBKDF2-derived key is stored;
//! the passcode and the key itself never leave memory.

use crate::crypto::{derive, generate_salt, Passcode, SALT_SIZE};
use crate::encoding::{decode_field, encode};
use crate::envelope::FORMAT_VERSION;
use crate::error::{CoreError, CoreResult};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// Gateway key holding the verifier.
pub const VERIFIER_KEY: &str = "__recordvault.verifier";
/// Keys with this prefix are owned by the vault itself.
pub const RESERVED_PREFIX: &str = "__recordvault.";

const VERIFIER_CONTEXT: &[u8] = b"recordvault-verifier-v1";
const TAG_LEN: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// A salted check value for one passcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasscodeVerifier {
    salt: [u8; SALT_SIZE],
    iterations: u32,
    tag: [u8; TAG_LEN],
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifierWire {
    format_version: String,
    salt: String,
    iterations: u32,
    tag: String,
}

impl PasscodeVerifier {
    /// Creates a verifier for `passcode` with a fresh salt.
    ///
    /// # Errors
    ///
    /// Returns an error if derivation fails.
    pub fn create(passcode: &Passcode, iterations: u32) -> CoreResult<Self> {
        let salt = generate_salt();
        let tag = compute_tag(passcode, &salt, iterations)?;
        Ok(Self {
            salt,
            iterations,
            tag,
        })
    }

    /// Checks `passcode` in constant time.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Authentication`] if the passcode does not match.
    pub fn verify(&self, passcode: &Passcode) -> CoreResult<()> {
        let key = derive(passcode, &self.salt, self.iterations)?;
        let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes())
            .map_err(|_| CoreError::derivation("HMAC rejected key"))?;
        mac.update(VERIFIER_CONTEXT);
        mac.verify_slice(&self.tag)
            .map_err(|_| CoreError::Authentication)
    }

    /// Iteration count this verifier was created with.
    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Serializes the verifier for the gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn to_bytes(&self) -> CoreResult<Vec<u8>> {
        serde_json::to_vec(&VerifierWire {
            format_version: FORMAT_VERSION.to_string(),
            salt: encode(&self.salt),
            iterations: self.iterations,
            tag: encode(&self.tag),
        })
        .map_err(|e| CoreError::invalid_format(format!("serialize verifier: {e}")))
    }

    /// Parses a stored verifier.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedVersion`] or [`CoreError::InvalidFormat`].
    pub fn from_bytes(raw: &[u8]) -> CoreResult<Self> {
        let wire: VerifierWire = serde_json::from_slice(raw)
            .map_err(|e| CoreError::invalid_format(format!("verifier: {e}")))?;
        if wire.format_version != FORMAT_VERSION {
            return Err(CoreError::unsupported_version(wire.format_version));
        }
        if wire.iterations == 0 {
            return Err(CoreError::invalid_format("verifier iterations must be positive"));
        }

        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&decode_field("salt", &wire.salt, Some(SALT_SIZE))?);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&decode_field("tag", &wire.tag, Some(TAG_LEN))?);

        Ok(Self {
            salt,
            iterations: wire.iterations,
            tag,
        })
    }
}

fn compute_tag(passcode: &Passcode, salt: &[u8], iterations: u32) -> CoreResult<[u8; TAG_LEN]> {
    let key = derive(passcode, salt, iterations)?;
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes())
        .map_err(|_| CoreError::derivation("HMAC rejected key"))?;
    mac.update(VERIFIER_CONTEXT);
    Ok(mac.finalize().into_bytes().into())
}

/// Returns true for keys the public record API must not touch.
#[must_use]
pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: u32 = 1_000;

    #[test]
    fn verify_accepts_same_passcode() {
        let verifier = PasscodeVerifier::create(&Passcode::new("8080"), FAST).unwrap();
        assert!(verifier.verify(&Passcode::new("8080")).is_ok());
    }

    #[test]
    fn verify_rejects_other_passcode() {
        let verifier = PasscodeVerifier::create(&Passcode::new("8080"), FAST).unwrap();
        assert!(matches!(
            verifier.verify(&Passcode::new("8081")),
            Err(CoreError::Authentication)
        ));
    }

    #[test]
    fn survives_serialization() {
        let verifier = PasscodeVerifier::create(&Passcode::new("8080"), FAST).unwrap();
        let raw = verifier.to_bytes().unwrap();

        let text = String::from_utf8(raw.clone()).unwrap();
        assert!(!text.contains("8080"));

        let parsed = PasscodeVerifier::from_bytes(&raw).unwrap();
        assert_eq!(parsed, verifier);
        assert_eq!(parsed.iterations(), FAST);
        assert!(parsed.verify(&Passcode::new("8080")).is_ok());
    }

    #[test]
    fn rejects_foreign_version() {
        let raw = br#"{"formatVersion":"7","salt":"","iterations":1,"tag":""}"#;
        assert!(matches!(
            PasscodeVerifier::from_bytes(raw),
            Err(CoreError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn reserved_keys() {
        assert!(is_reserved_key(VERIFIER_KEY));
        assert!(!is_reserved_key("profile"));
    }
}
