//! Reconnect backoff arithmetic.
//!
//! Pure state only; the caller draws the jitter and performs the wait.

use crate::config::ReconnectPolicy;
use std::time::Duration;

/// Floor applied to the initial delay.
pub const MIN_INITIAL_DELAY: Duration = Duration::from_millis(100);

/// Exponential backoff between connection attempts.
///
/// The N-th consecutive failed attempt waits
/// `min(initial * multiplier^(N-1), max)` plus up to `jitter`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    jitter: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(policy: &ReconnectPolicy) -> Self {
        let initial = Duration::from_millis(policy.initial_delay_ms).max(MIN_INITIAL_DELAY);
        let max = Duration::from_millis(policy.max_delay_ms).max(initial);
        let multiplier = if policy.multiplier.is_finite() {
            policy.multiplier.max(1.0)
        } else {
            1.0
        };
        Self {
            initial,
            max,
            multiplier,
            jitter: Duration::from_millis(policy.jitter_ms),
            current: initial,
        }
    }

    /// Base delay (pre-jitter) the next wait would use.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Upper bound for the random jitter added to each wait.
    pub fn jitter_bound(&self) -> Duration {
        self.jitter
    }

    /// Cap on the base delay.
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Take the base delay for this wait and grow the next one.
    pub fn advance(&mut self) -> Duration {
        let delay = self.current;
        let grown = Duration::try_from_secs_f64(self.current.as_secs_f64() * self.multiplier)
            .unwrap_or(self.max);
        self.current = grown.min(self.max);
        delay
    }

    /// Base delay plus `jitter_fraction` (0..=1) of the jitter bound.
    pub fn advance_with_jitter(&mut self, jitter_fraction: f64) -> Duration {
        let fraction = jitter_fraction.clamp(0.0, 1.0);
        self.advance() + self.jitter.mul_f64(fraction)
    }

    /// Restart from the initial delay after a socket opened successfully.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(initial: u64, max: u64, multiplier: f64, jitter: u64) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay_ms: initial,
            max_delay_ms: max,
            multiplier,
            jitter_ms: jitter,
        }
    }

    #[test]
    fn test_geometric_growth_with_cap() {
        let mut backoff = Backoff::new(&policy(1000, 30_000, 2.0, 0));
        let delays: Vec<u64> = (0..7).map(|_| backoff.advance().as_millis() as u64).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16_000, 30_000, 30_000]);
    }

    #[test]
    fn test_nth_attempt_formula() {
        let (d0, m, cap) = (250u64, 1.5f64, 5000u64);
        let mut backoff = Backoff::new(&policy(d0, cap, m, 0));
        for n in 1..=15 {
            let expected = (d0 as f64 * m.powi(n - 1)).min(cap as f64);
            let actual = backoff.advance().as_secs_f64() * 1000.0;
            assert!((actual - expected).abs() < 1e-3, "attempt {n}: {actual} != {expected}");
        }
    }

    #[test]
    fn test_jitter_never_exceeds_bound() {
        let mut backoff = Backoff::new(&policy(1000, 4000, 2.0, 250));
        for i in 0..10 {
            let wait = backoff.advance_with_jitter(i as f64 / 9.0);
            assert!(wait <= backoff.max() + backoff.jitter_bound());
        }
        assert_eq!(backoff.advance_with_jitter(7.0), Duration::from_millis(4250));
    }

    #[test]
    fn test_reset() {
        let mut backoff = Backoff::new(&policy(1000, 30_000, 2.0, 0));
        backoff.advance();
        backoff.advance();
        assert_eq!(backoff.current(), Duration::from_millis(4000));
        backoff.reset();
        assert_eq!(backoff.current(), Duration::from_millis(1000));
    }

    #[test]
    fn test_floor_and_max_clamp() {
        let backoff = Backoff::new(&policy(0, 0, 2.0, 0));
        assert_eq!(backoff.current(), MIN_INITIAL_DELAY);
        assert_eq!(backoff.max(), MIN_INITIAL_DELAY);
    }
}
