//! Text-safe encoding of binary fields.

use crate::error::{CoreError, CoreResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Encodes bytes as padded standard base64.
pub(crate) fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes a base64 field, checking its length when one is required.
pub(crate) fn decode_field(
    field: &'static str,
    text: &str,
    expected_len: Option<usize>,
) -> CoreResult<Vec<u8>> {
    let bytes = STANDARD
        .decode(text)
        .map_err(|e| CoreError::invalid_format(format!("{field}: {e}")))?;
    if let Some(len) = expected_len {
        if bytes.len() != len {
            return Err(CoreError::invalid_format(format!(
                "{field}: expected {len} bytes, got {}",
                bytes.len()
            )));
        }
    }
    Ok(bytes)
}

/// Serde adapter for `Vec<u8>` fields stored as base64 text.
pub(crate) mod base64_bytes {
    use super::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}
