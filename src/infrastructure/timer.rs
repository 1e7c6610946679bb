use crate::types::{MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY, RECONNECT_MAX_DELAY};
use std::time::Duration;

/// Reconnect tuning: exponential delay with a ceiling and an attempt cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(RECONNECT_BASE_DELAY),
            max_delay: Duration::from_millis(RECONNECT_MAX_DELAY),
            max_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect number `attempt` (1-based): `min(base * 2^attempt, max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Reconnect attempt counter with exponential backoff
pub struct Backoff {
    attempts: u32,
    policy: ReconnectPolicy,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            attempts: 0,
            policy,
        }
    }

    /// Counts one more attempt and returns its delay, or `None` once the
    /// ceiling has been reached (the counter is left untouched then).
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.policy.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.policy.delay_for(self.attempts))
    }

    /// Attempts scheduled since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.policy.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }

    /// Reset the counter
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}
