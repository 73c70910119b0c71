//! Exponential backoff.

use std::time::Duration;

/// Delay before retry number `attempt` (0 for the first retry).
///
/// `min(base * 2^attempt, max)`. Any overflow of the product lands on `max`.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    if base.is_zero() {
        return Duration::ZERO;
    }
    let Some(factor) = 2u32.checked_pow(attempt) else {
        return max;
    };
    base.checked_mul(factor).map_or(max, |delay| delay.min(max))
}
