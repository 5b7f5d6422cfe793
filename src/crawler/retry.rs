//! Retry policy for failed captures
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Session lost | Abort the run |
//! | Attempts exhausted | Skip the URL |
//! | Permanent error, `retry-all-errors = false` | Skip the URL |
//! | Anything else | Wait the backoff, retry the same URL |

use crate::capture::CaptureError;
use crate::config::CrawlerConfig;
use std::time::Duration;

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait this long, then try again
    Retry(Duration),
    /// Give up on this URL
    Skip,
    /// Stop the whole run
    Abort,
}

/// Attempt bound and backoff for one crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per URL, first attempt included
    pub max_attempts: u32,
    pub backoff: Duration,
    pub retry_all_errors: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.max_retry.max(1),
            backoff: config.backoff(),
            retry_all_errors: config.retry_all_errors,
        }
    }

    /// Decides the follow-up to failed attempt number `attempt` (1-based)
    pub fn decide(&self, attempt: u32, error: &CaptureError) -> RetryDecision {
        if error.is_fatal() {
            RetryDecision::Abort
        } else if attempt >= self.max_attempts {
            RetryDecision::Skip
        } else if !self.retry_all_errors && error.is_permanent() {
            RetryDecision::Skip
        } else {
            RetryDecision::Retry(self.backoff)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(10),
            retry_all_errors: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> CaptureError {
        CaptureError::Http { status: 404 }
    }

    fn timeout() -> CaptureError {
        CaptureError::Timeout(Duration::from_secs(120))
    }

    #[test]
    fn test_retries_until_attempts_exhausted() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.decide(1, &timeout()),
            RetryDecision::Retry(Duration::from_secs(10))
        );
        assert_eq!(
            policy.decide(2, &timeout()),
            RetryDecision::Retry(Duration::from_secs(10))
        );
        assert_eq!(policy.decide(3, &timeout()), RetryDecision::Skip);
    }

    #[test]
    fn test_permanent_errors_retried_by_default() {
        let policy = RetryPolicy::default();
        assert!(matches!(policy.decide(1, &not_found()), RetryDecision::Retry(_)));
    }

    #[test]
    fn test_permanent_errors_skipped_when_classifying() {
        let policy = RetryPolicy {
            retry_all_errors: false,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.decide(1, &not_found()), RetryDecision::Skip);
        assert!(matches!(policy.decide(1, &timeout()), RetryDecision::Retry(_)));
    }

    #[test]
    fn test_session_loss_aborts() {
        let policy = RetryPolicy::default();
        let lost = CaptureError::SessionLost("gone".to_string());
        assert_eq!(policy.decide(1, &lost), RetryDecision::Abort);
        assert_eq!(policy.decide(3, &lost), RetryDecision::Abort);
    }

    #[test]
    fn test_from_config() {
        let mut config = CrawlerConfig::for_origin("https://example.com/");
        config.max_retry = 5;
        config.retry_backoff = 250;
        config.retry_all_errors = false;

        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff, Duration::from_millis(250));
        assert!(!policy.retry_all_errors);
    }

    #[test]
    fn test_single_attempt() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.decide(1, &timeout()), RetryDecision::Skip);
    }
}
