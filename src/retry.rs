//! Retry policy and backoff computation for rate-limited requests.
//!
//! Only HTTP 429 responses are retried. The delay for each retry comes from
//! the server's `Retry-After` header when present, otherwise from capped
//! exponential backoff with optional jitter.

use http::HeaderMap;
use rand::Rng;
use std::time::{Duration, SystemTime};

/// Configures how 429 responses are retried.
///
/// A logical call makes `1 + max_retries` attempts in total. Delays grow
/// exponentially from `initial_delay` up to `max_delay`; jitter perturbs
/// each delay by a uniform factor in `[-jitter_factor, +jitter_factor]` to
/// avoid synchronized retry storms.
///
/// # Examples
///
/// ```
/// use intervals_client::RetryPolicy;
/// use std::time::Duration;
///
/// // 1s, 2s, 4s, capped at 8s, with 20% jitter
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_retries, 3);
///
/// let aggressive = RetryPolicy {
///     max_retries: 5,
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(2),
///     jitter: false,
///     ..RetryPolicy::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Backoff delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the backoff delay.
    pub max_delay: Duration,
    /// Whether to perturb backoff delays randomly.
    pub jitter: bool,
    /// Relative jitter magnitude in `[0, 1]`. Values outside the range are
    /// clamped.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(8000),
            jitter: true,
            jitter_factor: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Total attempts a logical call may make, including the first.
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Decides whether a 429 on the given attempt (1-based) should be
    /// retried, and after what delay.
    ///
    /// A `Retry-After` value from the server is applied exactly, without
    /// jitter. Returns `None` once the attempt budget is spent.
    pub(crate) fn decide(&self, attempt: u32, retry_after: Option<Duration>) -> Option<Duration> {
        if attempt >= self.total_attempts() {
            return None;
        }
        if let Some(wait) = retry_after {
            return Some(wait);
        }
        Some(self.backoff_delay(attempt))
    }

    /// Exponential backoff for the given attempt: `initial * 2^(attempt-1)`,
    /// capped at `max_delay`, jittered when enabled.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let multiplier = 2u64.saturating_pow(attempt.saturating_sub(1));
        let base = self
            .initial_delay
            .saturating_mul(multiplier.try_into().unwrap_or(u32::MAX))
            .min(self.max_delay);

        if !self.jitter {
            return base;
        }

        let factor = self.jitter_factor.clamp(0.0, 1.0);
        let offset = rand::thread_rng().gen_range(-factor..=factor);
        let millis = base.as_millis() as f64 * (1.0 + offset);
        Duration::from_millis(millis.round().max(0.0) as u64)
    }
}

/// Parses a `Retry-After` response header.
///
/// Supports both delay-seconds (non-negative integer) and HTTP-date forms.
/// Returns `None` for absent or unparseable values, and for dates already in
/// the past.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = headers.get("retry-after")?.to_str().ok()?;

    if let Ok(seconds) = header.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    if let Ok(date) = httpdate::parse_http_date(header) {
        if let Ok(until) = date.duration_since(SystemTime::now()) {
            return Some(until);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn policy_without_jitter() -> RetryPolicy {
        RetryPolicy {
            max_retries: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            jitter: false,
            jitter_factor: 0.2,
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = policy_without_jitter();
        assert_eq!(policy.decide(1, None), Some(Duration::from_millis(100)));
        assert_eq!(policy.decide(2, None), Some(Duration::from_millis(200)));
        assert_eq!(policy.decide(3, None), Some(Duration::from_millis(400)));
        assert_eq!(policy.decide(4, None), Some(Duration::from_millis(800)));
        assert_eq!(policy.decide(5, None), Some(Duration::from_millis(1000)));
        assert_eq!(policy.decide(6, None), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn budget_exhaustion_stops_retrying() {
        let policy = RetryPolicy {
            max_retries: 3,
            ..policy_without_jitter()
        };
        // 4 total attempts: the 4th gets no retry.
        assert!(policy.decide(3, None).is_some());
        assert_eq!(policy.decide(4, None), None);
        assert_eq!(policy.decide(5, None), None);
    }

    #[test]
    fn jitter_stays_within_factor_bounds() {
        let policy = RetryPolicy {
            jitter: true,
            jitter_factor: 0.2,
            ..policy_without_jitter()
        };
        let base = Duration::from_millis(400);
        for _ in 0..200 {
            let delay = policy.decide(3, None).unwrap();
            assert!(
                delay >= base.mul_f64(0.8) && delay <= base.mul_f64(1.2),
                "delay {delay:?} outside [0.8D, 1.2D] for D = {base:?}"
            );
        }
    }

    #[test]
    fn zero_jitter_factor_is_exact() {
        let policy = RetryPolicy {
            jitter: true,
            jitter_factor: 0.0,
            ..policy_without_jitter()
        };
        assert_eq!(policy.decide(1, None), Some(Duration::from_millis(100)));
    }

    #[test]
    fn retry_after_overrides_backoff_exactly() {
        let policy = RetryPolicy {
            jitter: true,
            ..policy_without_jitter()
        };
        // Server instruction is authoritative, no jitter applied.
        for _ in 0..50 {
            assert_eq!(
                policy.decide(1, Some(Duration::from_secs(2))),
                Some(Duration::from_secs(2))
            );
        }
    }

    #[test]
    fn retry_after_does_not_extend_the_attempt_budget() {
        let policy = RetryPolicy {
            max_retries: 1,
            ..policy_without_jitter()
        };
        assert_eq!(policy.decide(2, Some(Duration::from_secs(2))), None);
    }

    #[test]
    fn parse_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("60"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(60)));
    }

    #[test]
    fn parse_retry_after_http_date() {
        let future = SystemTime::now() + Duration::from_secs(90);
        let mut headers = HeaderMap::new();
        headers.insert(
            "retry-after",
            HeaderValue::from_str(&httpdate::fmt_http_date(future)).unwrap(),
        );
        let parsed = parse_retry_after(&headers).unwrap();
        assert!(parsed > Duration::from_secs(80) && parsed <= Duration::from_secs(90));
    }

    #[test]
    fn parse_retry_after_rejects_garbage_and_negatives() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("-5"));
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert("retry-after", HeaderValue::from_static("soon"));
        assert_eq!(parse_retry_after(&headers), None);

        let empty = HeaderMap::new();
        assert_eq!(parse_retry_after(&empty), None);
    }
}
