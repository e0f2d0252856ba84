//! Authenticated encryption using AES-256-GCM.

use super::kdf::SymmetricKey;
use crate::error::{CoreError, CoreResult};
use aes_gcm::{
    aead::{generic_array::GenericArray, AeadInPlace, KeyInit},
    Aes256Gcm, Nonce, Tag,
};
use rand::rngs::OsRng;
use rand::RngCore;

/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Generates a fresh random nonce.
#[must_use]
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Output of [`CipherEngine::seal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Encrypted payload, same length as the plaintext.
    pub ciphertext: Vec<u8>,
    /// GCM authentication tag.
    pub tag: [u8; TAG_SIZE],
    /// The nonce drawn for this encryption.
    pub nonce: [u8; NONCE_SIZE],
}

/// Performs AES-256-GCM encryption and decryption under one key.
///
/// No associated data is used. Decryption failures of every kind collapse
/// into [`CoreError::Authentication`] and never expose partial plaintext.
pub struct CipherEngine {
    cipher: Aes256Gcm,
}

impl CipherEngine {
    /// Creates a new engine for the given key.
    #[must_use]
    pub fn new(key: &SymmetricKey) -> Self {
        // SymmetricKey is always exactly 32 bytes, matching AES-256.
        let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));
        Self { cipher }
    }

    /// Encrypts `plaintext` under `nonce`, returning ciphertext and tag.
    ///
    /// The caller owns nonce uniqueness. Prefer [`seal`](Self::seal), which
    /// draws a fresh nonce itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the plaintext exceeds the GCM length limit.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        nonce: &[u8; NONCE_SIZE],
    ) -> CoreResult<(Vec<u8>, [u8; TAG_SIZE])> {
        let mut buffer = plaintext.to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(nonce), b"", &mut buffer)
            .map_err(|_| CoreError::encryption_failed("AES-GCM refused the plaintext"))?;

        let mut tag_bytes = [0u8; TAG_SIZE];
        tag_bytes.copy_from_slice(&tag);
        Ok((buffer, tag_bytes))
    }

    /// Encrypts `plaintext` with a freshly generated nonce.
    ///
    /// # Errors
    ///
    /// Returns an error if the plaintext exceeds the GCM length limit.
    pub fn seal(&self, plaintext: &[u8]) -> CoreResult<Sealed> {
        let nonce = generate_nonce();
        let (ciphertext, tag) = self.encrypt(plaintext, &nonce)?;
        Ok(Sealed {
            ciphertext,
            tag,
            nonce,
        })
    }

    /// Decrypts and authenticates `ciphertext`.
    ///
    /// Wrong-length tags or nonces are reported exactly like a failed tag
    /// check.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Authentication`] if verification fails.
    pub fn decrypt(&self, ciphertext: &[u8], tag: &[u8], nonce: &[u8]) -> CoreResult<Vec<u8>> {
        if tag.len() != TAG_SIZE || nonce.len() != NONCE_SIZE {
            return Err(CoreError::Authentication);
        }

        let mut buffer = ciphertext.to_vec();
        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(nonce),
                b"",
                &mut buffer,
                Tag::from_slice(tag),
            )
            .map_err(|_| CoreError::Authentication)?;
        Ok(buffer)
    }

    /// Decrypts the output of [`seal`](Self::seal).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Authentication`] if verification fails.
    pub fn open(&self, sealed: &Sealed) -> CoreResult<Vec<u8>> {
        self.decrypt(&sealed.ciphertext, &sealed.tag, &sealed.nonce)
    }
}

impl std::fmt::Debug for CipherEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherEngine")
            .field("cipher", &"Aes256Gcm")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KEY_SIZE;

    fn engine(byte: u8) -> CipherEngine {
        CipherEngine::new(&SymmetricKey::from_bytes(&[byte; KEY_SIZE]).unwrap())
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let engine = engine(1);
        let plaintext = b"Hello, RecordVault!";
        let sealed = engine.seal(plaintext).unwrap();

        assert_eq!(sealed.ciphertext.len(), plaintext.len());
        assert_ne!(&sealed.ciphertext[..], plaintext);
        assert_eq!(engine.open(&sealed).unwrap(), plaintext);
    }

    #[test]
    fn seal_draws_fresh_nonces() {
        let engine = engine(1);
        let first = engine.seal(b"same data").unwrap();
        let second = engine.seal(b"same data").unwrap();

        assert_ne!(first.nonce, second.nonce);
        assert_ne!(first.ciphertext, second.ciphertext);
    }

    #[test]
    fn known_answer_zero_key() {
        // AES-256-GCM, all-zero key and nonce, one zero block.
        let engine = engine(0);
        let (ciphertext, tag) = engine.encrypt(&[0u8; 16], &[0u8; NONCE_SIZE]).unwrap();

        assert_eq!(
            ciphertext,
            [
                0xce, 0xa7, 0x40, 0x3d, 0x4d, 0x60, 0x6b, 0x6e, 0x07, 0x4e, 0xc5, 0xd3, 0xba,
                0xf3, 0x9d, 0x18
            ]
        );
        assert_eq!(
            tag,
            [
                0xd0, 0xd1, 0xc8, 0xa7, 0x99, 0x99, 0x6b, 0xf0, 0x26, 0x5b, 0x98, 0xb5, 0xd4,
                0x8a, 0xb9, 0x19
            ]
        );
    }

    #[test]
    fn decrypt_wrong_key_fails() {
        let sealed = engine(1).seal(b"secret").unwrap();
        assert!(matches!(
            engine(2).open(&sealed),
            Err(CoreError::Authentication)
        ));
    }

    #[test]
    fn decrypt_wrong_nonce_fails() {
        let engine = engine(1);
        let mut sealed = engine.seal(b"secret").unwrap();
        sealed.nonce[0] ^= 0x01;
        assert!(matches!(engine.open(&sealed), Err(CoreError::Authentication)));
    }

    #[test]
    fn decrypt_corrupted_tag_fails() {
        let engine = engine(1);
        let mut sealed = engine.seal(b"data").unwrap();
        sealed.tag[TAG_SIZE - 1] ^= 0xFF;
        assert!(matches!(engine.open(&sealed), Err(CoreError::Authentication)));
    }

    #[test]
    fn malformed_lengths_look_like_tag_failure() {
        let engine = engine(1);
        let sealed = engine.seal(b"data").unwrap();

        let short_tag = engine.decrypt(&sealed.ciphertext, &sealed.tag[..8], &sealed.nonce);
        let long_nonce = engine.decrypt(&sealed.ciphertext, &sealed.tag, &[0u8; 24]);

        assert!(matches!(short_tag, Err(CoreError::Authentication)));
        assert!(matches!(long_nonce, Err(CoreError::Authentication)));
    }

    #[test]
    fn empty_plaintext() {
        let engine = engine(3);
        let sealed = engine.seal(b"").unwrap();
        assert!(sealed.ciphertext.is_empty());
        assert_eq!(engine.open(&sealed).unwrap(), b"");
    }

    #[test]
    fn large_plaintext() {
        let engine = engine(4);
        let plaintext = vec![0xAB; 1024 * 1024];
        let sealed = engine.seal(&plaintext).unwrap();
        assert_eq!(engine.open(&sealed).unwrap(), plaintext);
    }
}
