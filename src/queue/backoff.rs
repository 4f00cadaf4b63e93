//! Exponential backoff for failed batches.

use std::time::Duration;

/// Delay before retry `attempt` (1-based): `base · 2^attempt`, capped at `max`.
pub fn compute_backoff(base: Duration, attempt: u32, max: Duration) -> Duration {
    let base_ms = base.as_millis().min(u64::MAX as u128) as u64;
    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay_ms).min(max)
}
