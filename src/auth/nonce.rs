//! Per-request nonces.
//!
//! A nonce is the wall clock in microseconds since the Unix epoch, bumped to
//! `last + 1` whenever the clock has not advanced past the previous value.
//! A source that has reached `u64::MAX` refuses further nonces.
//! Uniqueness holds within one process. Across restarts it relies on the clock
//! moving forward, which matches the server's anti-replay window rather than
//! any cryptographic guarantee.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::{AsterError, Result};

/// Nonce bound into every signature.
pub type Nonce = u64;

/// Monotonic nonce generator, safe to share between threads.
#[derive(Debug, Default)]
pub struct NonceSource {
    last: AtomicU64,
}

impl NonceSource {
    /// Create a source with no history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Draw the next nonce.
    ///
    /// # Errors
    ///
    /// Returns [`AsterError::Clock`] if the system clock reads before the epoch
    /// or the source has handed out `u64::MAX`.
    pub fn next_nonce(&self) -> Result<Nonce> {
        self.next_after(unix_micros()?)
    }

    /// Draw a nonce for a given clock reading.
    pub(crate) fn next_after(&self, now_micros: u64) -> Result<Nonce> {
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            if current == u64::MAX {
                return Err(AsterError::clock("Nonce source exhausted at u64::MAX"));
            }
            let next = now_micros.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(next),
                Err(actual) => current = actual,
            }
        }
    }

    /// Last nonce handed out, `0` if none.
    #[must_use]
    pub fn last(&self) -> Nonce {
        self.last.load(Ordering::Acquire)
    }
}

/// Process-wide source behind [`crate::auth::build_signed_request`] and every
/// [`crate::auth::RequestSigner`] without a dedicated source.
pub(crate) static SHARED_NONCES: NonceSource = NonceSource::new();

/// Microseconds since the Unix epoch.
pub(crate) fn unix_micros() -> Result<u64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AsterError::clock(format!("System clock before Unix epoch: {e}")))?;
    u64::try_from(elapsed.as_micros())
        .map_err(|_| AsterError::clock("Microsecond timestamp overflows u64"))
}

/// Milliseconds since the Unix epoch.
pub(crate) fn unix_millis() -> Result<u64> {
    Ok(unix_micros()? / 1_000)
}
