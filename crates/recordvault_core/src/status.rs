//! Security status reporting and the runtime self-test.

use crate::crypto::{CipherEngine, Passcode, SymmetricKey, KEY_SIZE, NONCE_SIZE};
use crate::envelope::{EncryptedEnvelope, StoredRecord};
use crate::error::{CoreError, CoreResult};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;

/// AES-256-GCM, zero key, zero nonce, 16 zero bytes of plaintext
/// (McGrew & Viega test case 14).
const KAT_CIPHERTEXT: [u8; 16] = [
    0xce, 0xa7, 0x40, 0x3d, 0x4d, 0x60, 0x6b, 0x6e, 0x07, 0x4e, 0xc5, 0xd3, 0xba, 0xf3, 0x9d,
    0x18,
];
const KAT_TAG: [u8; 16] = [
    0xd0, 0xd1, 0xc8, 0xa7, 0x99, 0x99, 0x6b, 0xf0, 0x26, 0x5b, 0x98, 0xb5, 0xd4, 0x8a, 0xb9,
    0x19,
];

const SAMPLE_PLAINTEXT: &[u8] = b"recordvault self-test sample";
const SAMPLE_PASSCODE: &str = "self-test-passcode";

/// Snapshot of the vault's security state for host UIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityStatus {
    /// The AEAD primitive produced its known answer in this runtime.
    pub available: bool,
    /// A non-expired passcode is held.
    pub unlocked: bool,
    /// No authentication failure since the last unlock and no failed self-test.
    pub integrity_ok: bool,
    /// Envelope format version written by this build.
    pub version: &'static str,
}

/// Tracks integrity signals observed by vault operations.
#[derive(Debug, Default)]
pub(crate) struct IntegrityMonitor {
    auth_failures: AtomicU64,
    self_test_failed: AtomicBool,
}

impl IntegrityMonitor {
    pub(crate) fn record_auth_failure(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Clears the authentication failure count, on unlock.
    pub(crate) fn reset_auth_failures(&self) {
        self.auth_failures.store(0, Ordering::Relaxed);
    }

    pub(crate) fn auth_failures(&self) -> u64 {
        self.auth_failures.load(Ordering::Relaxed)
    }

    pub(crate) fn record_self_test(&self, passed: bool) {
        self.self_test_failed.store(!passed, Ordering::Relaxed);
    }

    pub(crate) fn is_ok(&self) -> bool {
        self.auth_failures() == 0 && !self.self_test_failed.load(Ordering::Relaxed)
    }
}

/// Checks AES-256-GCM against a published test vector.
///
/// # Errors
///
/// Returns [`CoreError::SelfTestFailed`] on any mismatch.
pub fn known_answer_test() -> CoreResult<()> {
    let key = SymmetricKey::from_bytes(&[0u8; KEY_SIZE])?;
    let engine = CipherEngine::new(&key);
    let nonce = [0u8; NONCE_SIZE];

    let (ciphertext, tag) = engine.encrypt(&[0u8; 16], &nonce)?;
    if ciphertext != KAT_CIPHERTEXT || tag != KAT_TAG {
        return Err(CoreError::self_test_failed("AES-GCM known answer mismatch"));
    }

    let plaintext = engine
        .decrypt(&ciphertext, &tag, &nonce)
        .map_err(|_| CoreError::self_test_failed("AES-GCM rejected its own output"))?;
    if plaintext != [0u8; 16] {
        return Err(CoreError::self_test_failed("AES-GCM decrypted to the wrong bytes"));
    }
    Ok(())
}

/// Result of [`known_answer_test`], computed once per process.
pub(crate) fn cipher_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| known_answer_test().is_ok())
}

/// Runs the full seal, encode, decode, open pipeline on a fixed sample and
/// checks that a flipped tag bit is rejected.
///
/// # Errors
///
/// Returns [`CoreError::SelfTestFailed`] describing the failed step.
pub fn pipeline_test(kdf_iterations: u32) -> CoreResult<()> {
    known_answer_test()?;

    let passcode = Passcode::new(SAMPLE_PASSCODE);
    let envelope = EncryptedEnvelope::seal(SAMPLE_PLAINTEXT, &passcode, kdf_iterations)?;
    let raw = StoredRecord::Encrypted(envelope).encode()?;

    let StoredRecord::Encrypted(decoded) = StoredRecord::decode(&raw)? else {
        return Err(CoreError::self_test_failed("envelope decoded as plaintext"));
    };
    let opened = decoded
        .open(&passcode)
        .map_err(|e| CoreError::self_test_failed(format!("sample did not open: {e}")))?;
    if opened != SAMPLE_PLAINTEXT {
        return Err(CoreError::self_test_failed("sample round-trip mismatch"));
    }

    let parts = decoded.unwrap()?;
    let mut tag = parts.tag.to_vec();
    tag[0] ^= 0x01;
    let key = crate::crypto::derive(&passcode, parts.salt, parts.kdf_iterations)?;
    match CipherEngine::new(&key).decrypt(parts.ciphertext, &tag, parts.nonce) {
        Err(CoreError::Authentication) => Ok(()),
        _ => Err(CoreError::self_test_failed("tampered tag was accepted")),
    }
}
