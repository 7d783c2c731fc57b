//! Shared exponential backoff arithmetic for retried network operations.

use std::time::Duration;

/// Exponential backoff schedule: `base * multiplier^attempt` for a
/// zero-indexed attempt number.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    multiplier: f64,
}

impl Backoff {
    pub fn new(base: Duration, multiplier: f64) -> Self {
        Self { base, multiplier }
    }

    /// Delay to wait after the given zero-indexed failed attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base.mul_f64(self.multiplier.powi(attempt as i32))
    }
}
