//! In-memory passcode holder.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// A user passcode.
///
/// Never persisted. The buffer is wiped when the last copy is dropped, and
/// `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Passcode(String);

impl Passcode {
    /// Wraps a passcode.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the passcode bytes.
    ///
    /// # Security
    ///
    /// Don't log or persist the result.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Length in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    /// Returns true for the empty passcode.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Passcode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Passcode {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Debug for Passcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passcode([REDACTED])")
    }
}
