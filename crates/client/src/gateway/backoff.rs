use core::time::Duration;

/// How often, and how patiently, a gateway connection is (re-)established.
///
/// The gateway restarts itself after some config writes, so the first dial
/// after a write may well land mid-restart.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReconnectPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry. Doubles for every further retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl ReconnectPolicy {
    #[must_use]
    pub const fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
        }
    }

    /// A single attempt, no retries.
    #[must_use]
    pub const fn once() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Total number of dial attempts, including the first.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait before retry number `retry` (1-based). The first
    /// attempt is never delayed.
    #[must_use]
    pub fn delay(&self, retry: u32) -> Duration {
        let Some(exponent) = retry.checked_sub(1) else {
            return Duration::ZERO;
        };

        let factor = 2_u32.checked_pow(exponent).unwrap_or(u32::MAX);

        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}
