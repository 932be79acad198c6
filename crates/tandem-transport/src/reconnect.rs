//! How long to wait before the next connection attempt.
//!
//! The default is a fixed 5 s delay retried forever: every close or failed
//! attempt schedules exactly one new attempt after the same delay.
//! [`ReconnectPolicy::Backoff`] adds exponential growth, random jitter and
//! an optional ceiling on consecutive failed attempts.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Delay between a close and the next connection attempt by default.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// Reconnect scheduling policy for a [`TransportChannel`](crate::TransportChannel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconnectPolicy {
    /// Same delay every time, no attempt limit.
    Fixed { delay: Duration },

    /// `initial * 2^(failures - 1)`, capped at `max`, plus `0..=jitter`.
    /// The first retry after a failure or a dropped connection waits `initial`.
    ///
    /// After `max_attempts` consecutive failed attempts the channel gives
    /// up. `None` retries forever.
    Backoff {
        initial: Duration,
        max: Duration,
        jitter: Duration,
        max_attempts: Option<u32>,
    },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::Fixed {
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl ReconnectPolicy {
    /// A fixed-delay policy.
    pub fn fixed(delay: Duration) -> Self {
        Self::Fixed { delay }
    }

    /// An exponential policy without jitter or ceiling.
    pub fn backoff(initial: Duration, max: Duration) -> Self {
        Self::Backoff {
            initial,
            max,
            jitter: Duration::ZERO,
            max_attempts: None,
        }
    }

    /// Adds up to `jitter` of random delay. No-op on a fixed policy.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        if let Self::Backoff { jitter: j, .. } = &mut self {
            *j = jitter;
        }
        self
    }

    /// Gives up after `attempts` consecutive failures. No-op on a fixed policy.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        if let Self::Backoff { max_attempts, .. } = &mut self {
            *max_attempts = Some(attempts);
        }
        self
    }

    /// The delay before the next attempt, given how many attempts in a row
    /// have failed since the last successful open. `None` means stop.
    pub fn delay_after(&self, failures: u32) -> Option<Duration> {
        match *self {
            Self::Fixed { delay } => Some(delay),
            Self::Backoff {
                initial,
                max,
                jitter,
                max_attempts,
            } => {
                if max_attempts.is_some_and(|limit| failures >= limit) {
                    return None;
                }
                let factor = 2u32
                    .checked_pow(failures.saturating_sub(1))
                    .unwrap_or(u32::MAX);
                let base = initial.saturating_mul(factor).min(max);
                let extra = if jitter.is_zero() {
                    Duration::ZERO
                } else {
                    let ms = jitter.as_millis() as u64;
                    Duration::from_millis(rand::rng().random_range(0..=ms))
                };
                Some(base + extra)
            }
        }
    }
}
