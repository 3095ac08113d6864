/*!
 * Exponential backoff for webhook redelivery (§4.6 step 8).
 *
 * Formula: `next_retry_secs = baseSecs ^ (next_attempt_counter + jitter)`,
 * `jitter` uniform in `[0, 1)`, `next_attempt_counter = (prev_counter ?? 1) + 1`.
 * This grows far faster than the usual `base * 2^attempt` shape — confirmed
 * against the original dispatcher rather than "fixed", since changing it
 * would change observable retry timing.
 */

use rand::Rng;

/// The attempt counter carried forward to the next delivery job, computed
/// from the counter recorded on the previous attempt (`None` on the first
/// attempt of an `EventDelivery`).
pub fn next_attempt_counter(prev_counter: Option<i32>) -> i32 {
    prev_counter.unwrap_or(1) + 1
}

/// Seconds to wait before the next attempt, given the just-computed
/// `next_attempt_counter` and the configured exponent base.
pub fn next_retry_seconds(next_attempt_counter: i32, base_secs: u64) -> f64 {
    let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
    (base_secs as f64).powf(next_attempt_counter as f64 + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_attempt_counter_first_attempt() {
        assert_eq!(next_attempt_counter(None), 2);
    }

    #[test]
    fn test_next_attempt_counter_subsequent() {
        assert_eq!(next_attempt_counter(Some(2)), 3);
        assert_eq!(next_attempt_counter(Some(5)), 6);
    }

    #[test]
    fn test_next_retry_seconds_grows_with_counter() {
        // base^2 <= result < base^3 for counter=2, and it should clearly
        // exceed the range for counter=3, confirming the exponent (not a
        // multiplier) dominates growth.
        let base = 60u64;
        let low = next_retry_seconds(2, base);
        assert!(low >= (base as f64).powf(2.0));
        assert!(low < (base as f64).powf(3.0));

        let high = next_retry_seconds(5, base);
        assert!(high >= (base as f64).powf(5.0));
    }

    #[test]
    fn test_next_retry_seconds_jitter_bounds() {
        let base = 10u64;
        for _ in 0..100 {
            let secs = next_retry_seconds(1, base);
            assert!(secs >= (base as f64).powf(1.0));
            assert!(secs < (base as f64).powf(2.0));
        }
    }
}
