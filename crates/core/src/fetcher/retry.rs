//! Retry policy for downloads.
//!
//! Pure functions so the policy is testable without time or I/O.

use std::time::Duration;

use super::error::DownloadError;

/// Whether attempt `attempt` (1-based) should be followed by another.
pub fn should_retry(attempt: u32, max_attempts: u32, error: &DownloadError) -> bool {
    attempt < max_attempts && error.is_retryable()
}

/// Delay before retry attempt `attempt` (1-based: the delay after the
/// first failure is the base). Doubles per attempt, capped.
pub fn backoff_delay(attempt: u32, base_ms: u64, cap_ms: u64) -> Duration {
    let exponent = attempt.saturating_sub(1).min(32);
    let delay = base_ms.saturating_mul(1u64 << exponent);
    Duration::from_millis(delay.min(cap_ms))
}
