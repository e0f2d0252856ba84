//! Property-based test generators using proptest.
//!
//! Provides strategies for passcodes, payloads, record keys and legacy
//! records that never look like envelopes.

use proptest::prelude::*;
use recordvault_core::Passcode;

/// Strategy for arbitrary record payloads, empty included.
pub fn plaintext_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Strategy for passcodes between 4 and 24 printable characters.
pub fn passcode_strategy() -> impl Strategy<Value = Passcode> {
    prop::string::string_regex("[0-9A-Za-z!@#$%^&*]{4,24}")
        .expect("Invalid regex")
        .prop_map(Passcode::new)
}

/// Strategy for two passcodes that differ.
pub fn distinct_passcodes_strategy() -> impl Strategy<Value = (Passcode, Passcode)> {
    (passcode_strategy(), passcode_strategy()).prop_filter("passcodes must differ", |(a, b)| a != b)
}

/// Strategy for valid record keys outside the reserved prefix.
pub fn record_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_.-]{0,31}")
        .expect("Invalid regex")
        .prop_filter("must not be reserved", |k| {
            !recordvault_core::is_reserved_key(k)
        })
}

/// Strategy for legacy JSON records: flat objects with user fields only.
pub fn legacy_json_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::btree_map(
        prop::string::string_regex("[a-z]{1,10}").expect("Invalid regex"),
        prop::string::string_regex("[ -~]{0,20}").expect("Invalid regex"),
        0..6,
    )
    .prop_map(|fields| serde_json::to_vec(&fields).unwrap_or_default())
}

/// Strategy for any legacy record: arbitrary bytes or a legacy JSON object.
///
/// Inputs that would classify as envelopes are filtered out.
pub fn legacy_record_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![plaintext_strategy(), legacy_json_strategy()]
        .prop_filter("must be legacy", |raw| recordvault_core::is_legacy_format(raw))
}

/// Strategy for a bit position inside a buffer of `len` bytes.
pub fn bit_position_strategy(len: usize) -> impl Strategy<Value = (usize, u8)> {
    (0..len.max(1), 0u8..8)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 64,
            max_shrink_iters: 256,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    ///
    /// Every case runs PBKDF2 at least once, so case counts stay small.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 16,
            max_shrink_iters: 64,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 512,
            max_shrink_iters: 4096,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
