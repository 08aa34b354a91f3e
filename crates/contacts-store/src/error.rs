use std::time::Duration;

use thiserror::Error;

/// Verification failed. Deliberately says nothing about whether the identity
/// exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid email or token")]
pub struct InvalidCredential;

/// A throttle refused the call; the caller may try again after the wrapped
/// duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("too many requests, retry in {:.3}s", .0.as_secs_f64())]
pub struct RetryAfter(pub Duration);

impl RetryAfter {
    pub fn duration(&self) -> Duration {
        self.0
    }

    /// Whole seconds for a `Retry-After` header, rounded up so a client that
    /// honours it never comes back early.
    pub fn as_header_secs(&self) -> u64 {
        let secs = self.0.as_secs();
        if self.0.subsec_nanos() > 0 { secs + 1 } else { secs }
    }
}
