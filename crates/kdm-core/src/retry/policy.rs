use std::time::Duration;

/// High-level classification of a failed attempt for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect or stalled body).
    Timeout,
    /// Server is shedding load (503).
    Throttled,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// Retryable server-side status (5xx).
    Http5xx(u16),
    /// Anything else: client errors, integrity, filename, local disk. Never retried.
    Other,
}

impl ErrorKind {
    pub fn is_transient(self) -> bool {
        !matches!(self, ErrorKind::Other)
    }
}

/// Upper bound on attempts per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxAttempts {
    /// At most this many attempts, including the first.
    Limited(u32),
    /// Keep retrying transient failures until cancelled.
    Unbounded,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Fixed-interval retry policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: MaxAttempts,
    /// Delay between a failed attempt and the next one.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: MaxAttempts::Limited(10),
            interval: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            attempts: MaxAttempts::Limited(1),
            interval: Duration::ZERO,
        }
    }

    /// Decide what to do after `attempt` (1-based) failed with `kind`.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if !kind.is_transient() {
            return RetryDecision::NoRetry;
        }
        match self.attempts {
            MaxAttempts::Limited(max) if attempt >= max => RetryDecision::NoRetry,
            _ => RetryDecision::RetryAfter(self.interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_retry_for_other() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(1, ErrorKind::Other), RetryDecision::NoRetry);
    }

    #[test]
    fn fixed_interval() {
        let p = RetryPolicy {
            attempts: MaxAttempts::Limited(5),
            interval: Duration::from_millis(750),
        };
        for attempt in 1..5 {
            assert_eq!(
                p.decide(attempt, ErrorKind::Connection),
                RetryDecision::RetryAfter(Duration::from_millis(750))
            );
        }
    }

    #[test]
    fn respects_max_attempts() {
        let p = RetryPolicy {
            attempts: MaxAttempts::Limited(3),
            interval: Duration::ZERO,
        };
        assert!(matches!(p.decide(1, ErrorKind::Timeout), RetryDecision::RetryAfter(_)));
        assert!(matches!(p.decide(2, ErrorKind::Http5xx(502)), RetryDecision::RetryAfter(_)));
        assert_eq!(p.decide(3, ErrorKind::Throttled), RetryDecision::NoRetry);
    }

    #[test]
    fn unbounded_keeps_going() {
        let p = RetryPolicy {
            attempts: MaxAttempts::Unbounded,
            interval: Duration::from_secs(1),
        };
        assert!(matches!(p.decide(10_000, ErrorKind::Connection), RetryDecision::RetryAfter(_)));
        assert_eq!(p.decide(2, ErrorKind::Other), RetryDecision::NoRetry);
    }

    #[test]
    fn none_policy_is_single_shot() {
        assert_eq!(RetryPolicy::none().decide(1, ErrorKind::Timeout), RetryDecision::NoRetry);
    }
}
