//! Fuzz harnesses for RecordVault.
//!
//! These targets can be driven by cargo-fuzz or any other byte-feeding
//! fuzzer. Each one panics only on a real invariant violation.

use recordvault_core::{is_legacy_format, EncryptedEnvelope, Passcode, StoredRecord};

/// Fuzz target for record decoding.
///
/// Arbitrary bytes either decode or return an error, never panic. Bytes
/// classified as legacy always decode to themselves.
pub fn fuzz_record_decode(data: &[u8]) {
    let decoded = StoredRecord::decode(data);
    if is_legacy_format(data) {
        match decoded {
            Ok(StoredRecord::Plaintext { data: out, legacy: true }) => {
                assert_eq!(out, data, "legacy record was altered");
            }
            other => panic!("legacy bytes decoded as {other:?}"),
        }
    }
}

/// Fuzz target for envelope tampering.
///
/// XORs `mask` over the stored bytes of a freshly sealed envelope. Whatever
/// the result, it must never open to anything but the original plaintext.
pub fn fuzz_envelope_tamper(mask: &[u8]) {
    const PLAINTEXT: &[u8] = b"fuzz target plaintext";
    let passcode = Passcode::new("fuzz-passcode");

    let Ok(envelope) = EncryptedEnvelope::seal(PLAINTEXT, &passcode, 1_000) else {
        return;
    };
    let Ok(mut raw) = StoredRecord::Encrypted(envelope).encode() else {
        return;
    };
    for (byte, m) in raw.iter_mut().zip(mask) {
        *byte ^= m;
    }

    if let Ok(StoredRecord::Encrypted(tampered)) = StoredRecord::decode(&raw) {
        if let Ok(opened) = tampered.open(&passcode) {
            assert_eq!(opened, PLAINTEXT, "tampered envelope opened to other bytes");
        }
    }
}
