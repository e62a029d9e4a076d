use std::time::Duration;

use rand::Rng;

/// Exponential backoff schedule with full jitter.
///
/// Retry number `n` (1-based) waits a uniformly random duration in
/// `[0, min(base_delay * factor^(n-1), max_delay)]`, so a burst of workers
/// hitting the same failure spreads out instead of retrying in lockstep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first try included.
    pub max_attempts: u32,
    /// Ceiling of the first retry's delay.
    pub base_delay: Duration,
    /// Multiplier applied to the ceiling per further retry.
    pub factor: f64,
    /// Upper bound on any single delay ceiling.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Jittered delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let ceiling = self.base_delay.as_secs_f64() * self.factor.powi(exponent);
        let capped = ceiling.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(rand::rng().random_range(0.0..=capped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_stay_under_the_growing_ceiling() {
        let policy = RetryPolicy::default();
        for retry in 1..=5 {
            let ceiling = (2f64.powi(retry as i32 - 1)).min(30.0);
            for _ in 0..50 {
                assert!(policy.delay_for(retry).as_secs_f64() <= ceiling);
            }
        }
    }

    #[test]
    fn delay_never_exceeds_max() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_secs(4),
            factor: 3.0,
            max_delay: Duration::from_secs(10),
        };
        for _ in 0..100 {
            assert!(policy.delay_for(9) <= Duration::from_secs(10));
        }
    }
}
