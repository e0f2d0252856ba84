//! Session key context: the time-bounded cache of the unlocked passcode.
//!
//! ```text
//!            set_secret(Some)             timeout / clear() / drop
//!  Locked ────────────────────▶ Unlocked ─────────────────────────▶ Locked
//! ```
//!
//! The context is never persisted; a new process always starts Locked.
//! Operations take one [`SessionKeyContext::get_secret`] snapshot at their
//! start, so a concurrent `clear()` cannot leave them with half a secret.

use crate::crypto::Passcode;
use crate::error::{CoreError, CoreResult};
use parking_lot::{Mutex, RwLock};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Source of monotonic time for session expiry.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// Used by tests and simulations to drive session expiry.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No secret held.
    Locked,
    /// Secret held until the window runs out.
    Unlocked {
        /// Time left before the session locks itself.
        remaining: Duration,
    },
}

#[derive(Default)]
struct Slot {
    secret: Option<Passcode>,
    expires_at: Option<Instant>,
}

/// Process-local cache of the unlocked passcode.
///
/// Thread-safe; share it behind an `Arc`.
pub struct SessionKeyContext {
    slot: RwLock<Slot>,
    timeout: Duration,
    extend_on_use: bool,
    clock: Arc<dyn Clock>,
}

impl SessionKeyContext {
    /// Creates a locked context using the system clock.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self::with_clock(timeout, Arc::new(SystemClock))
    }

    /// Creates a locked context with a custom clock.
    #[must_use]
    pub fn with_clock(timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: RwLock::new(Slot::default()),
            timeout,
            extend_on_use: false,
            clock,
        }
    }

    /// Sets whether each successful [`get_secret`](Self::get_secret) restarts
    /// the timeout window.
    #[must_use]
    pub fn extend_on_use(mut self, value: bool) -> Self {
        self.extend_on_use = value;
        self
    }

    /// Stores a secret and starts the window, or locks when given `None`.
    pub fn set_secret(&self, secret: Option<Passcode>) {
        let mut slot = self.slot.write();
        match secret {
            Some(passcode) => {
                slot.expires_at = Some(self.clock.now() + self.timeout);
                slot.secret = Some(passcode);
                info!(timeout_secs = self.timeout.as_secs(), "session unlocked");
            }
            None => {
                *slot = Slot::default();
                info!("session locked");
            }
        }
    }

    /// Returns a snapshot of the secret, or `None` when locked or expired.
    ///
    /// An expired secret is dropped on the spot.
    #[must_use]
    pub fn get_secret(&self) -> Option<Passcode> {
        let now = self.clock.now();
        let mut slot = self.slot.write();

        match slot.expires_at {
            Some(expires_at) if now < expires_at => {
                if self.extend_on_use {
                    slot.expires_at = Some(now + self.timeout);
                }
                slot.secret.clone()
            }
            Some(_) => {
                *slot = Slot::default();
                debug!("session expired");
                None
            }
            None => None,
        }
    }

    /// Like [`get_secret`](Self::get_secret) but fails when locked.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::KeyUnavailable`] when no secret is held.
    pub fn require_secret(&self) -> CoreResult<Passcode> {
        self.get_secret().ok_or(CoreError::KeyUnavailable)
    }

    /// Returns true while a non-expired secret is held.
    ///
    /// Does not extend the window.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self.state(), SessionState::Unlocked { .. })
    }

    /// Returns the current state without extending the window.
    #[must_use]
    pub fn state(&self) -> SessionState {
        let now = self.clock.now();
        let slot = self.slot.read();
        match (slot.secret.as_ref(), slot.expires_at) {
            (Some(_), Some(expires_at)) if now < expires_at => SessionState::Unlocked {
                remaining: expires_at - now,
            },
            _ => SessionState::Locked,
        }
    }

    /// Drops the secret immediately.
    pub fn clear(&self) {
        self.set_secret(None);
    }

    /// The configured inactivity window.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Debug for SessionKeyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeyContext")
            .field("state", &self.state())
            .field("timeout", &self.timeout)
            .field("extend_on_use", &self.extend_on_use)
            .finish()
    }
}
