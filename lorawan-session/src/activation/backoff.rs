//! Join retry policy
//!
//! A linear ramp capped at a maximum wait. The ramp restarts whenever the
//! retention memory is lost, so it is per power cycle rather than global.

use core::time::Duration;

/// Wait added per consecutive failed join
pub const DEFAULT_STEP: Duration = Duration::from_secs(60);
/// Longest wait between two join attempts
pub const DEFAULT_CAP: Duration = Duration::from_secs(180);

/// Linear join backoff, capped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinBackoff {
    /// Increment per consecutive failure
    pub step: Duration,
    /// Upper bound on any single wait
    pub cap: Duration,
}

impl JoinBackoff {
    /// Create a new backoff policy
    pub const fn new(step: Duration, cap: Duration) -> Self {
        Self { step, cap }
    }

    /// Wait after a failure, given the failures already recorded before it
    pub fn delay_for(&self, failures: u32) -> Duration {
        self.step
            .saturating_mul(failures.saturating_add(1))
            .min(self.cap)
    }

    /// Waits for consecutive failures starting from a clean counter
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0u32..).map(move |failures| self.delay_for(failures))
    }
}

impl Default for JoinBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_STEP, DEFAULT_CAP)
    }
}
