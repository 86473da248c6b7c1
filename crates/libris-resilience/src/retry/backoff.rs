//! Delay calculation: linear, exponential and Fibonacci growth with cap and jitter.

use super::policy::{BackoffStrategy, RetryPolicy};
use rand::Rng;
use std::time::Duration;

/// Compute the delay to wait after attempt `attempt` (0-based) has failed.
///
/// # Formula
///
/// ```text
/// linear:      base = initial * (n + 1)
/// exponential: base = initial * 2^n
/// fibonacci:   base = initial * fib(n + 1)      fib(1) = fib(2) = 1
///
/// capped = min(base, max_delay)
/// jitter = uniform integer ms in [-capped * f, +capped * f]
/// delay  = clamp(capped + jitter, 0, max_delay)
/// ```
///
/// Arithmetic saturates, so very large attempt numbers simply yield
/// `max_delay`. Jitter draws from the calling thread's generator.
///
/// # Examples
///
/// ```rust
/// use libris_resilience::{calculate_delay, BackoffStrategy, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder()
///     .initial_delay(Duration::from_millis(200))
///     .strategy(BackoffStrategy::Fibonacci)
///     .build()
///     .unwrap();
///
/// assert_eq!(calculate_delay(4, &policy), Duration::from_millis(1000));
/// ```
pub fn calculate_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    let base = base_delay(attempt, policy);
    if !policy.jitter_enabled() || policy.jitter_factor() == 0.0 {
        return base;
    }
    apply_jitter(
        base,
        policy.jitter_factor(),
        policy.max_delay(),
        &mut rand::thread_rng(),
    )
}

/// Strategy-scaled delay, capped, before jitter.
pub(crate) fn base_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    let multiplier = match policy.strategy() {
        BackoffStrategy::Linear => u64::from(attempt) + 1,
        BackoffStrategy::Exponential => 1u64.checked_shl(attempt).unwrap_or(u64::MAX),
        BackoffStrategy::Fibonacci => fibonacci(attempt.saturating_add(1)),
    };
    scale_capped(policy.initial_delay(), multiplier, policy.max_delay())
}

fn scale_capped(initial: Duration, multiplier: u64, cap: Duration) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;

    let nanos = initial.as_nanos().saturating_mul(u128::from(multiplier));
    if nanos >= cap.as_nanos() {
        return cap;
    }
    // Below the cap, so it fits in a Duration.
    Duration::new(
        (nanos / NANOS_PER_SEC) as u64,
        (nanos % NANOS_PER_SEC) as u32,
    )
}

pub(crate) fn apply_jitter<R: Rng + ?Sized>(
    base: Duration,
    factor: f64,
    cap: Duration,
    rng: &mut R,
) -> Duration {
    let range_ms = (base.as_secs_f64() * 1000.0 * factor).floor() as i64;
    if range_ms <= 0 {
        return base;
    }
    let offset = rng.gen_range(-range_ms..=range_ms);
    let jittered = if offset >= 0 {
        base.saturating_add(Duration::from_millis(offset.unsigned_abs()))
    } else {
        base.saturating_sub(Duration::from_millis(offset.unsigned_abs()))
    };
    jittered.min(cap)
}

/// `fib(0) = 0`, `fib(1) = fib(2) = 1`, saturating at `u64::MAX`.
pub(crate) fn fibonacci(n: u32) -> u64 {
    if n == 0 {
        return 0;
    }
    let (mut prev, mut curr) = (0u64, 1u64);
    for _ in 1..n {
        if curr == u64::MAX {
            break;
        }
        let next = prev.saturating_add(curr);
        prev = curr;
        curr = next;
    }
    curr
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn policy(strategy: BackoffStrategy, initial_ms: u64, max_ms: u64) -> RetryPolicy {
        RetryPolicy::builder()
            .strategy(strategy)
            .initial_delay(Duration::from_millis(initial_ms))
            .max_delay(Duration::from_millis(max_ms))
            .build()
            .unwrap()
    }

    fn millis(attempts: std::ops::Range<u32>, policy: &RetryPolicy) -> Vec<u128> {
        attempts
            .map(|n| calculate_delay(n, policy).as_millis())
            .collect()
    }

    #[test]
    fn test_exponential_delay_calculation() {
        let p = policy(BackoffStrategy::Exponential, 1000, 60_000);
        assert_eq!(millis(0..4, &p), vec![1000, 2000, 4000, 8000]);
    }

    #[test]
    fn test_linear_delay_calculation() {
        let p = policy(BackoffStrategy::Linear, 500, 60_000);
        assert_eq!(millis(0..4, &p), vec![500, 1000, 1500, 2000]);
    }

    #[test]
    fn test_fibonacci_delay_calculation() {
        let p = policy(BackoffStrategy::Fibonacci, 200, 60_000);
        assert_eq!(millis(0..6, &p), vec![200, 200, 400, 600, 1000, 1600]);
    }

    #[test]
    fn test_max_delay_cap() {
        for strategy in [
            BackoffStrategy::Linear,
            BackoffStrategy::Exponential,
            BackoffStrategy::Fibonacci,
        ] {
            let p = policy(strategy, 1000, 5000);
            for attempt in [10, 63, 64, 100, u32::MAX] {
                assert_eq!(
                    calculate_delay(attempt, &p),
                    Duration::from_millis(5000),
                    "{strategy} at attempt {attempt} should be capped"
                );
            }
        }
    }

    #[test]
    fn test_zero_initial_delay_stays_zero() {
        let p = policy(BackoffStrategy::Exponential, 0, 1000);
        assert_eq!(calculate_delay(5, &p), Duration::ZERO);
    }

    #[test]
    fn test_sub_millisecond_precision_kept() {
        let p = RetryPolicy::builder()
            .strategy(BackoffStrategy::Linear)
            .initial_delay(Duration::from_micros(1500))
            .build()
            .unwrap();
        assert_eq!(calculate_delay(1, &p), Duration::from_micros(3000));
    }

    #[test]
    fn test_fibonacci_sequence() {
        let seq: Vec<u64> = (0..10).map(fibonacci).collect();
        assert_eq!(seq, vec![0, 1, 1, 2, 3, 5, 8, 13, 21, 34]);
        assert_eq!(fibonacci(200), u64::MAX);
    }

    #[test]
    fn test_jitter_variation() {
        let p = RetryPolicy::builder()
            .initial_delay(Duration::from_secs(1))
            .max_delay(Duration::from_secs(60))
            .jitter(0.5)
            .build()
            .unwrap();

        let delays: Vec<Duration> = (0..50).map(|_| calculate_delay(0, &p)).collect();
        for delay in &delays {
            assert!(
                (500..=1500).contains(&delay.as_millis()),
                "Delay with 50% jitter should be in range [500ms, 1500ms], got {:?}",
                delay
            );
        }
        let all_same = delays.windows(2).all(|w| w[0] == w[1]);
        assert!(!all_same, "With randomization, delays should vary");
    }

    #[test]
    fn test_jitter_never_exceeds_cap() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let d = apply_jitter(
                Duration::from_secs(10),
                1.0,
                Duration::from_secs(10),
                &mut rng,
            );
            assert!(d <= Duration::from_secs(10));
        }
    }

    #[test]
    fn test_full_jitter_clamps_at_zero() {
        let mut rng = StdRng::seed_from_u64(42);
        let samples: Vec<Duration> = (0..500)
            .map(|_| {
                apply_jitter(
                    Duration::from_millis(10),
                    1.0,
                    Duration::from_secs(1),
                    &mut rng,
                )
            })
            .collect();
        assert!(samples.iter().all(|d| *d <= Duration::from_millis(20)));
        assert!(samples.contains(&Duration::ZERO));
    }

    #[test]
    fn test_tiny_delay_is_not_jittered() {
        let mut rng = StdRng::seed_from_u64(1);
        let d = apply_jitter(Duration::from_millis(3), 0.1, Duration::from_secs(1), &mut rng);
        assert_eq!(d, Duration::from_millis(3));
    }
}
