use std::time::Duration;

/// Hard ceiling on automatic retries per record.
pub const MAX_RETRIES_CAP: u32 = 2;

const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(200);

/// Bounded exponential backoff around transient `ERROR` results.
///
/// `NOT_FOUND`, `NEED_CHECK` and `MALFORMED` are terminal and never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(MAX_RETRIES_CAP, DEFAULT_INITIAL_BACKOFF)
    }
}

impl RetryPolicy {
    /// `max_retries` is clamped to [`MAX_RETRIES_CAP`].
    pub fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries: max_retries.min(MAX_RETRIES_CAP),
            initial_backoff,
        }
    }

    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    /// Delay before retry number `retry` (1-based): `initial * 2^(retry-1)`.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << exp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_to_cap() {
        assert_eq!(RetryPolicy::new(10, Duration::from_millis(1)).max_retries(), 2);
        assert_eq!(RetryPolicy::new(1, Duration::from_millis(1)).max_retries(), 1);
    }

    #[test]
    fn backoff_doubles() {
        let p = RetryPolicy::new(2, Duration::from_millis(200));
        assert_eq!(p.backoff_for(1), Duration::from_millis(200));
        assert_eq!(p.backoff_for(2), Duration::from_millis(400));
    }

    #[test]
    fn none_never_retries() {
        assert_eq!(RetryPolicy::none().max_retries(), 0);
    }
}
