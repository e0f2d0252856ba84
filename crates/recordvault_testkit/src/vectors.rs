//! Known-answer vectors for RecordVault.
//!
//! Cipher vectors are the published AES-256-GCM cases from the GCM
//! specification. Record vectors pin how stored bytes are classified, so a
//! host in another language can check its reader against the same inputs.

use recordvault_core::crypto::CipherEngine;
use recordvault_core::{CoreError, ErrorKind, StoredRecord, SymmetricKey};
use serde::{Deserialize, Serialize};

/// An AES-256-GCM vector with no associated data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CipherVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Key (hex).
    pub key_hex: String,
    /// Nonce (hex).
    pub nonce_hex: String,
    /// Plaintext (hex).
    pub plaintext_hex: String,
    /// Expected ciphertext (hex).
    pub ciphertext_hex: String,
    /// Expected tag (hex).
    pub tag_hex: String,
}

/// Expected classification of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordExpectation {
    /// Legacy bytes, returned as stored.
    Legacy,
    /// Tagged plaintext.
    Plaintext,
    /// Rejected with `UnsupportedVersion`.
    UnsupportedVersion,
    /// Rejected as malformed.
    InvalidFormat,
}

/// A stored record and how a reader must classify it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Stored bytes (hex).
    pub stored_hex: String,
    /// Expected classification.
    pub expected: RecordExpectation,
}

fn cipher_vector(id: &str, key: &str, nonce: &str, pt: &str, ct: &str, tag: &str) -> CipherVector {
    CipherVector {
        id: id.into(),
        key_hex: key.into(),
        nonce_hex: nonce.into(),
        plaintext_hex: pt.into(),
        ciphertext_hex: ct.into(),
        tag_hex: tag.into(),
    }
}

/// AES-256-GCM test cases 13, 14 and 15 of the GCM specification.
pub fn cipher_vectors() -> Vec<CipherVector> {
    let zero_key = "0".repeat(64);
    let zero_nonce = "0".repeat(24);
    let key15 = "feffe9928665731c6d6a8f9467308308feffe9928665731c6d6a8f9467308308";
    vec![
        cipher_vector(
            "gcm_256_tc13_empty",
            &zero_key,
            &zero_nonce,
            "",
            "",
            "530f8afbc74536b9a963b4f1c4cb738b",
        ),
        cipher_vector(
            "gcm_256_tc14_zero_block",
            &zero_key,
            &zero_nonce,
            "00000000000000000000000000000000",
            "cea7403d4d606b6e074ec5d3baf39d18",
            "d0d1c8a799996bf0265b98b5d48ab919",
        ),
        cipher_vector(
            "gcm_256_tc15_four_blocks",
            key15,
            "cafebabefacedbaddecaf888",
            "d9313225f88406e5a55909c5aff5269a86a7a9531534f7da2e4c303d8a318a72\
             1c3c0c95956809532fcf0e2449a6b525b16aedf5aa0de657ba637b391aafd255",
            "522dc1f099567d07f47f37a32a84427d643a8cdcbfe5c0c97598a2bd2555d1aa\
             8cb08e48590dbb3da7b08b1056828838c5f61e6393ba7a0abcc9f662898015ad",
            "b094dac5d93471bdec1a502270e3cc6c",
        ),
    ]
}

fn record_vector(id: &str, description: &str, stored: &[u8], expected: RecordExpectation) -> RecordVector {
    RecordVector {
        id: id.into(),
        description: description.into(),
        stored_hex: hex::encode(stored),
        expected,
    }
}

/// Record classification vectors.
pub fn record_vectors() -> Vec<RecordVector> {
    use RecordExpectation::*;
    vec![
        record_vector("legacy_json", "User JSON without envelope fields", br#"{"name":"Ada"}"#, Legacy),
        record_vector("legacy_text", "Non-JSON text", b"hello", Legacy),
        record_vector("legacy_array", "JSON array", b"[1,2]", Legacy),
        record_vector("legacy_empty", "Empty value", b"", Legacy),
        record_vector(
            "legacy_partial_envelope",
            "Object with only some envelope fields",
            br#"{"ciphertext":"AA==","nonce":"AA=="}"#,
            Legacy,
        ),
        record_vector(
            "tagged_plaintext",
            "Plaintext stored while locked",
            br#"{"$recordvault":"plaintext","data":"aGk="}"#,
            Plaintext,
        ),
        record_vector(
            "future_version",
            "Envelope from a newer format",
            br#"{"$recordvault":"encrypted","formatVersion":"2","ciphertext":"","nonce":"","salt":"","createdAt":0}"#,
            UnsupportedVersion,
        ),
        record_vector(
            "untagged_future_version",
            "Untagged envelope from a newer format",
            br#"{"formatVersion":"2","ciphertext":"","nonce":"","salt":"","createdAt":0}"#,
            UnsupportedVersion,
        ),
        record_vector(
            "short_nonce",
            "Envelope with an 8-byte nonce",
            br#"{"$recordvault":"encrypted","formatVersion":"1","ciphertext":"AAAAAAAAAAAAAAAAAAAAAA==","nonce":"AAAAAAAAAAA=","salt":"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=","createdAt":0}"#,
            InvalidFormat,
        ),
        record_vector(
            "unknown_kind",
            "Tagged record of an unknown kind",
            br#"{"$recordvault":"zipped","data":""}"#,
            InvalidFormat,
        ),
    ]
}

/// Checks one cipher vector: encryption output and decryption back.
///
/// # Errors
///
/// Returns a description of the first mismatch.
pub fn check_cipher_vector(vector: &CipherVector) -> Result<(), String> {
    let decode = |field: &str, text: &str| {
        hex::decode(text).map_err(|e| format!("{}: bad {field} hex: {e}", vector.id))
    };
    let key = SymmetricKey::from_bytes(&decode("key", &vector.key_hex)?)
        .map_err(|e| format!("{}: {e}", vector.id))?;
    let nonce_bytes = decode("nonce", &vector.nonce_hex)?;
    let nonce: [u8; 12] = nonce_bytes
        .as_slice()
        .try_into()
        .map_err(|_| format!("{}: nonce must be 12 bytes", vector.id))?;
    let plaintext = decode("plaintext", &vector.plaintext_hex)?;

    let engine = CipherEngine::new(&key);
    let (ciphertext, tag) = engine
        .encrypt(&plaintext, &nonce)
        .map_err(|e| format!("{}: {e}", vector.id))?;
    if hex::encode(&ciphertext) != vector.ciphertext_hex {
        return Err(format!("{}: ciphertext mismatch", vector.id));
    }
    if hex::encode(tag) != vector.tag_hex {
        return Err(format!("{}: tag mismatch", vector.id));
    }

    let opened = engine
        .decrypt(&ciphertext, &tag, &nonce)
        .map_err(|e| format!("{}: {e}", vector.id))?;
    if opened != plaintext {
        return Err(format!("{}: decryption mismatch", vector.id));
    }
    Ok(())
}

/// Checks one record vector against the codec.
///
/// # Errors
///
/// Returns a description of the mismatch.
pub fn check_record_vector(vector: &RecordVector) -> Result<(), String> {
    let stored = hex::decode(&vector.stored_hex).map_err(|e| format!("{}: {e}", vector.id))?;
    let actual = match StoredRecord::decode(&stored) {
        Ok(StoredRecord::Plaintext { legacy: true, data }) if data == stored => {
            RecordExpectation::Legacy
        }
        Ok(StoredRecord::Plaintext { legacy: false, .. }) => RecordExpectation::Plaintext,
        Err(e) if e.kind() == ErrorKind::UnsupportedVersion => RecordExpectation::UnsupportedVersion,
        Err(CoreError::InvalidFormat { .. }) => RecordExpectation::InvalidFormat,
        other => return Err(format!("{}: unexpected result {other:?}", vector.id)),
    };
    if actual == vector.expected {
        Ok(())
    } else {
        Err(format!(
            "{}: expected {:?}, got {actual:?}",
            vector.id, vector.expected
        ))
    }
}

/// Exports every vector as JSON.
pub fn all_vectors_json() -> String {
    serde_json::to_string_pretty(&serde_json::json!({
        "cipher": cipher_vectors(),
        "records": record_vectors(),
    }))
    .unwrap_or_default()
}
