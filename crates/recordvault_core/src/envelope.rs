//! Stored record format: encrypted envelopes and plaintext records.
//!
//! Every record the vault writes is a JSON object carrying an explicit
//! `"$recordvault"` discriminator:
//!
//! ```text
//! {"$recordvault":"encrypted","formatVersion":"1","ciphertext":"<b64>",
//!  "nonce":"<b64>","salt":"<b64>","createdAt":1700000000000,"kdfIterations":100000}
//! {"$recordvault":"plaintext","data":"<b64>"}
//! ```
//!
//! `ciphertext` holds the AES-GCM output followed by the 16-byte tag.
//!
//! Bytes without the discriminator predate it and are routed structurally:
//! an object with all envelope fields is read as an envelope, anything else
//! is a legacy plaintext record and is returned exactly as stored.

use crate::crypto::{
    derive, generate_salt, CipherEngine, Passcode, MIN_ITERATIONS, NONCE_SIZE, SALT_SIZE,
    TAG_SIZE,
};
use crate::encoding::{base64_bytes, decode_field, encode};
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Envelope format version written by this build; the only one it reads.
pub const FORMAT_VERSION: &str = "1";

const MARKER: &str = "$recordvault";
const KIND_ENCRYPTED: &str = "encrypted";
const KIND_PLAINTEXT: &str = "plaintext";
const ENVELOPE_FIELDS: [&str; 5] = ["ciphertext", "nonce", "salt", "createdAt", "formatVersion"];

/// An immutable encrypted record.
///
/// A logical update always produces a new envelope with a new salt and nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    ciphertext: Vec<u8>,
    nonce: [u8; NONCE_SIZE],
    salt: [u8; SALT_SIZE],
    created_at: u64,
    format_version: String,
    kdf_iterations: u32,
}

/// Borrowed decryption inputs extracted from an envelope.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeParts<'a> {
    /// Encrypted payload without the tag.
    pub ciphertext: &'a [u8],
    /// GCM authentication tag.
    pub tag: &'a [u8],
    /// GCM nonce.
    pub nonce: &'a [u8],
    /// PBKDF2 salt.
    pub salt: &'a [u8],
    /// PBKDF2 iteration count.
    pub kdf_iterations: u32,
}

impl EncryptedEnvelope {
    /// Wraps cipher output into a new envelope stamped with the current
    /// format version and time.
    #[must_use]
    pub fn wrap(
        salt: [u8; SALT_SIZE],
        nonce: [u8; NONCE_SIZE],
        ciphertext: &[u8],
        tag: &[u8; TAG_SIZE],
        kdf_iterations: u32,
    ) -> Self {
        let mut body = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
        body.extend_from_slice(ciphertext);
        body.extend_from_slice(tag);
        Self {
            ciphertext: body,
            nonce,
            salt,
            created_at: now_millis(),
            format_version: FORMAT_VERSION.to_string(),
            kdf_iterations,
        }
    }

    /// Encrypts `plaintext` under `passcode` with a fresh salt and nonce.
    ///
    /// # Errors
    ///
    /// Returns an error if derivation or encryption fails.
    pub fn seal(plaintext: &[u8], passcode: &Passcode, kdf_iterations: u32) -> CoreResult<Self> {
        let salt = generate_salt();
        let key = derive(passcode, &salt, kdf_iterations)?;
        let sealed = CipherEngine::new(&key).seal(plaintext)?;
        Ok(Self::wrap(
            salt,
            sealed.nonce,
            &sealed.ciphertext,
            &sealed.tag,
            kdf_iterations,
        ))
    }

    /// Decrypts this envelope with `passcode`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedVersion`] for a foreign format and
    /// [`CoreError::Authentication`] if the passcode or data is wrong.
    pub fn open(&self, passcode: &Passcode) -> CoreResult<Vec<u8>> {
        let parts = self.unwrap()?;
        let key = derive(passcode, parts.salt, parts.kdf_iterations)?;
        CipherEngine::new(&key).decrypt(parts.ciphertext, parts.tag, parts.nonce)
    }

    /// Splits the envelope into cipher inputs.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedVersion`] unless the envelope carries
    /// [`FORMAT_VERSION`].
    pub fn unwrap(&self) -> CoreResult<EnvelopeParts<'_>> {
        if self.format_version != FORMAT_VERSION {
            return Err(CoreError::unsupported_version(self.format_version.clone()));
        }
        let split = self.ciphertext.len() - TAG_SIZE;
        Ok(EnvelopeParts {
            ciphertext: &self.ciphertext[..split],
            tag: &self.ciphertext[split..],
            nonce: &self.nonce,
            salt: &self.salt,
            kdf_iterations: self.kdf_iterations,
        })
    }

    /// Creation time in milliseconds since the Unix epoch.
    #[must_use]
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// The stamped format version.
    #[must_use]
    pub fn format_version(&self) -> &str {
        &self.format_version
    }

    /// The derivation salt.
    #[must_use]
    pub fn salt(&self) -> &[u8; SALT_SIZE] {
        &self.salt
    }

    /// The GCM nonce.
    #[must_use]
    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    /// Ciphertext plus tag, as stored.
    #[must_use]
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// PBKDF2 iteration count used for this envelope.
    #[must_use]
    pub fn kdf_iterations(&self) -> u32 {
        self.kdf_iterations
    }

    fn to_wire(&self) -> EnvelopeWire {
        EnvelopeWire {
            marker: Some(KIND_ENCRYPTED.to_string()),
            format_version: self.format_version.clone(),
            ciphertext: encode(&self.ciphertext),
            nonce: encode(&self.nonce),
            salt: encode(&self.salt),
            created_at: self.created_at,
            kdf_iterations: Some(self.kdf_iterations),
        }
    }

    fn from_object(map: Map<String, Value>) -> CoreResult<Self> {
        // Version is checked before any other field is interpreted.
        match map.get("formatVersion") {
            Some(Value::String(v)) if v == FORMAT_VERSION => {}
            Some(Value::String(v)) => return Err(CoreError::unsupported_version(v.as_str())),
            Some(other) => return Err(CoreError::unsupported_version(other.to_string())),
            None => return Err(CoreError::invalid_format("envelope has no formatVersion")),
        }

        let wire: EnvelopeWire = serde_json::from_value(Value::Object(map))
            .map_err(|e| CoreError::invalid_format(format!("envelope: {e}")))?;

        let ciphertext = decode_field("ciphertext", &wire.ciphertext, None)?;
        if ciphertext.len() < TAG_SIZE {
            return Err(CoreError::invalid_format(format!(
                "ciphertext: {} bytes is shorter than the tag",
                ciphertext.len()
            )));
        }
        let nonce = decode_field("nonce", &wire.nonce, Some(NONCE_SIZE))?;
        let salt = decode_field("salt", &wire.salt, Some(SALT_SIZE))?;
        let kdf_iterations = wire.kdf_iterations.unwrap_or(MIN_ITERATIONS);
        if kdf_iterations == 0 {
            return Err(CoreError::invalid_format("kdfIterations must be positive"));
        }

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(&nonce);
        let mut salt_bytes = [0u8; SALT_SIZE];
        salt_bytes.copy_from_slice(&salt);

        Ok(Self {
            ciphertext,
            nonce: nonce_bytes,
            salt: salt_bytes,
            created_at: wire.created_at,
            format_version: wire.format_version,
            kdf_iterations,
        })
    }
}

/// A record as held by the storage gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredRecord {
    /// Unencrypted payload.
    Plaintext {
        /// The payload.
        data: Vec<u8>,
        /// True when the bytes carry no discriminator and are returned as stored.
        legacy: bool,
    },
    /// Encrypted payload.
    Encrypted(EncryptedEnvelope),
}

impl StoredRecord {
    /// Parses raw gateway bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedVersion`] for envelopes of another
    /// format and [`CoreError::InvalidFormat`] for malformed tagged records.
    pub fn decode(raw: &[u8]) -> CoreResult<Self> {
        match classify(raw) {
            Shape::Legacy => Ok(StoredRecord::Plaintext {
                data: raw.to_vec(),
                legacy: true,
            }),
            Shape::UntaggedEnvelope(map) => {
                EncryptedEnvelope::from_object(map).map(StoredRecord::Encrypted)
            }
            Shape::Tagged(kind, map) => match kind.as_str() {
                KIND_ENCRYPTED => EncryptedEnvelope::from_object(map).map(StoredRecord::Encrypted),
                KIND_PLAINTEXT => {
                    let wire: PlaintextWire = serde_json::from_value(Value::Object(map))
                        .map_err(|e| CoreError::invalid_format(format!("plaintext record: {e}")))?;
                    Ok(StoredRecord::Plaintext {
                        data: wire.data,
                        legacy: false,
                    })
                }
                other => Err(CoreError::invalid_format(format!(
                    "unknown record kind {other:?}"
                ))),
            },
        }
    }

    /// Serializes the record for the gateway.
    ///
    /// Legacy records are written back unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let result = match self {
            StoredRecord::Plaintext { data, legacy: true } => return Ok(data.clone()),
            StoredRecord::Plaintext { data, legacy: false } => serde_json::to_vec(&PlaintextWire {
                marker: KIND_PLAINTEXT.to_string(),
                data: data.clone(),
            }),
            StoredRecord::Encrypted(envelope) => serde_json::to_vec(&envelope.to_wire()),
        };
        result.map_err(|e| CoreError::invalid_format(format!("serialize record: {e}")))
    }

    /// Creates a tagged plaintext record.
    #[must_use]
    pub fn plaintext(data: Vec<u8>) -> Self {
        StoredRecord::Plaintext {
            data,
            legacy: false,
        }
    }

    /// Returns true for an encrypted record.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        matches!(self, StoredRecord::Encrypted(_))
    }
}

/// Returns true if `raw` is a legacy record: neither tagged nor envelope-shaped.
#[must_use]
pub fn is_legacy_format(raw: &[u8]) -> bool {
    matches!(classify(raw), Shape::Legacy)
}

/// Current time in milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

enum Shape {
    Legacy,
    UntaggedEnvelope(Map<String, Value>),
    Tagged(String, Map<String, Value>),
}

fn classify(raw: &[u8]) -> Shape {
    let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(raw) else {
        return Shape::Legacy;
    };
    let kind = map.get(MARKER).map(|v| match v {
        Value::String(kind) => kind.clone(),
        other => other.to_string(),
    });
    match kind {
        Some(kind) => Shape::Tagged(kind, map),
        None if ENVELOPE_FIELDS.iter().all(|f| map.contains_key(*f)) => {
            Shape::UntaggedEnvelope(map)
        }
        None => Shape::Legacy,
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeWire {
    #[serde(rename = "$recordvault", default, skip_serializing_if = "Option::is_none")]
    marker: Option<String>,
    format_version: String,
    ciphertext: String,
    nonce: String,
    salt: String,
    created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kdf_iterations: Option<u32>,
}

#[derive(Serialize, Deserialize)]
struct PlaintextWire {
    #[serde(rename = "$recordvault")]
    marker: String,
    #[serde(with = "base64_bytes")]
    data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FAST: u32 = 1_000;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn sealed_bytes_open_after_decode(plaintext in prop::collection::vec(any::<u8>(), 0..512)) {
            let raw = StoredRecord::Encrypted(sealed(&plaintext)).encode().unwrap();
            prop_assert!(!is_legacy_format(&raw));
            let StoredRecord::Encrypted(envelope) = StoredRecord::decode(&raw).unwrap() else {
                panic!("envelope decoded as plaintext");
            };
            prop_assert_eq!(envelope.open(&Passcode::new("2468")).unwrap(), plaintext);
        }

        #[test]
        fn non_object_bytes_are_legacy(raw in prop::collection::vec(any::<u8>(), 0..256)) {
            prop_assume!(!raw.trim_ascii_start().starts_with(b"{"));
            prop_assert!(is_legacy_format(&raw));
            prop_assert_eq!(
                StoredRecord::decode(&raw).unwrap(),
                StoredRecord::Plaintext { data: raw.clone(), legacy: true }
            );
        }
    }

    fn sealed(plaintext: &[u8]) -> EncryptedEnvelope {
        EncryptedEnvelope::seal(plaintext, &Passcode::new("2468"), FAST).unwrap()
    }

    fn as_object(raw: &[u8]) -> Map<String, Value> {
        match serde_json::from_slice(raw).unwrap() {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn seal_open_roundtrip() {
        let envelope = sealed(b"profile data");
        assert_eq!(envelope.format_version(), FORMAT_VERSION);
        assert_eq!(envelope.kdf_iterations(), FAST);
        assert_eq!(
            envelope.open(&Passcode::new("2468")).unwrap(),
            b"profile data"
        );
    }

    #[test]
    fn wrong_passcode_fails_authentication() {
        let envelope = sealed(b"profile data");
        assert!(matches!(
            envelope.open(&Passcode::new("2469")),
            Err(CoreError::Authentication)
        ));
    }

    #[test]
    fn encode_decode_preserves_envelope() {
        let envelope = sealed(b"resume.pdf bytes");
        let raw = StoredRecord::Encrypted(envelope.clone()).encode().unwrap();

        let object = as_object(&raw);
        assert_eq!(object["$recordvault"], "encrypted");
        assert_eq!(object["formatVersion"], "1");
        for field in ENVELOPE_FIELDS {
            assert!(object.contains_key(field), "missing {field}");
        }

        assert!(!is_legacy_format(&raw));
        assert_eq!(
            StoredRecord::decode(&raw).unwrap(),
            StoredRecord::Encrypted(envelope)
        );
    }

    #[test]
    fn unwrap_splits_tag() {
        let envelope = sealed(b"12345");
        let parts = envelope.unwrap().unwrap();
        assert_eq!(parts.ciphertext.len(), 5);
        assert_eq!(parts.tag.len(), TAG_SIZE);
        assert_eq!(parts.nonce.len(), NONCE_SIZE);
        assert_eq!(parts.salt.len(), SALT_SIZE);
    }

    #[test]
    fn unknown_version_rejected_before_decoding() {
        let raw = StoredRecord::Encrypted(sealed(b"x")).encode().unwrap();
        let mut object = as_object(&raw);
        object.insert("formatVersion".into(), Value::String("2".into()));
        // Garbage that would fail base64 decoding if it were reached.
        object.insert("nonce".into(), Value::String("***".into()));
        let raw = serde_json::to_vec(&object).unwrap();

        match StoredRecord::decode(&raw) {
            Err(CoreError::UnsupportedVersion { found, .. }) => assert_eq!(found, "2"),
            other => panic!("expected UnsupportedVersion, got {other:?}"),
        }
    }

    #[test]
    fn numeric_version_rejected() {
        let raw = StoredRecord::Encrypted(sealed(b"x")).encode().unwrap();
        let mut object = as_object(&raw);
        object.insert("formatVersion".into(), Value::from(1));
        let raw = serde_json::to_vec(&object).unwrap();

        assert!(matches!(
            StoredRecord::decode(&raw),
            Err(CoreError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn untagged_envelope_is_recognized() {
        let envelope = sealed(b"older host");
        let raw = StoredRecord::Encrypted(envelope.clone()).encode().unwrap();
        let mut object = as_object(&raw);
        object.remove("$recordvault");
        object.remove("kdfIterations");
        let raw = serde_json::to_vec(&object).unwrap();

        assert!(!is_legacy_format(&raw));
        match StoredRecord::decode(&raw).unwrap() {
            StoredRecord::Encrypted(decoded) => {
                assert_eq!(decoded.kdf_iterations(), MIN_ITERATIONS);
                assert_eq!(decoded.ciphertext(), envelope.ciphertext());
            }
            other => panic!("expected envelope, got {other:?}"),
        }
    }

    #[test]
    fn bad_field_lengths_rejected() {
        let raw = StoredRecord::Encrypted(sealed(b"x")).encode().unwrap();
        let mut object = as_object(&raw);
        object.insert("salt".into(), Value::String(encode(&[0u8; 16])));
        let raw = serde_json::to_vec(&object).unwrap();

        assert!(matches!(
            StoredRecord::decode(&raw),
            Err(CoreError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn legacy_bytes_pass_through() {
        let cases: [&[u8]; 5] = [
            b"{\"name\":\"Ada\",\"skills\":[\"rust\"]}",
            b"plain text, not json",
            b"[1,2,3]",
            b"",
            &[0xff, 0x00, 0x13],
        ];
        for raw in cases {
            assert!(is_legacy_format(raw));
            let record = StoredRecord::decode(raw).unwrap();
            assert_eq!(
                record,
                StoredRecord::Plaintext {
                    data: raw.to_vec(),
                    legacy: true
                }
            );
            assert_eq!(record.encode().unwrap(), raw);
        }
    }

    #[test]
    fn partial_envelope_fields_are_legacy() {
        let raw = br#"{"ciphertext":"abc","nonce":"def","note":"user data"}"#;
        assert!(is_legacy_format(raw));
    }

    #[test]
    fn tagged_plaintext_roundtrip() {
        let record = StoredRecord::plaintext(b"queued while locked".to_vec());
        let raw = record.encode().unwrap();
        assert!(!is_legacy_format(&raw));
        assert_eq!(StoredRecord::decode(&raw).unwrap(), record);
    }

    #[test]
    fn unknown_kind_rejected() {
        let raw = br#"{"$recordvault":"compressed","data":""}"#;
        assert!(matches!(
            StoredRecord::decode(raw),
            Err(CoreError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn new_envelopes_get_fresh_salt_and_nonce() {
        let a = sealed(b"same");
        let b = sealed(b"same");
        assert_ne!(a.salt(), b.salt());
        assert_ne!(a.nonce(), b.nonce());
        assert_ne!(a.ciphertext(), b.ciphertext());
    }
}
