use log::{debug, info, warn};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

#[derive(Debug, Clone, Error)]
pub enum ArbError {
    /// Connection refused, reset or DNS failure
    #[error("Network Error: {0}")]
    NetworkError(String),

    /// Request exceeded the configured client timeout
    #[error("Timeout Error: {0}")]
    TimeoutError(String),

    /// Remote answered with a non-2xx status; body is kept (truncated) for diagnosis
    #[error("HTTP Error {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// HTTP 200 carrying an `errors` array
    #[error("Remote reported errors: {}", .0.join("; "))]
    RemoteErrors(Vec<String>),

    /// Response did not have the expected shape
    #[error("Parse Error: {0}")]
    ParseError(String),

    #[error("Cache Error: {0}")]
    CacheError(String),

    #[error("Database Error: {0}")]
    DatabaseError(String),

    #[error("Config Error: {0}")]
    ConfigError(String),

    #[error("Notification Error: {0}")]
    NotificationError(String),

    #[error("Unknown venue: {0}")]
    UnknownVenue(String),

    /// A spawned task panicked or was aborted
    #[error("Task Error: {0}")]
    TaskError(String),
}

impl From<serde_json::Error> for ArbError {
    fn from(err: serde_json::Error) -> Self {
        ArbError::ParseError(format!("JSON serialization/deserialization error: {}", err))
    }
}

impl From<reqwest::Error> for ArbError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ArbError::TimeoutError(err.to_string())
        } else if err.is_decode() {
            ArbError::ParseError(format!("Response body decode error: {}", err))
        } else {
            ArbError::NetworkError(err.to_string())
        }
    }
}

impl From<redis::RedisError> for ArbError {
    fn from(err: redis::RedisError) -> Self {
        ArbError::CacheError(err.to_string())
    }
}

impl From<rusqlite::Error> for ArbError {
    fn from(err: rusqlite::Error) -> Self {
        ArbError::DatabaseError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ArbError {
    fn from(err: tokio::task::JoinError) -> Self {
        ArbError::TaskError(err.to_string())
    }
}

impl ArbError {
    /// Transport-level failures that may succeed when the identical request is resent.
    pub fn is_transient(&self) -> bool {
        matches!(self, ArbError::NetworkError(_) | ArbError::TimeoutError(_))
    }

    /// Determines if an error is recoverable on a later cycle
    pub fn is_recoverable(&self) -> bool {
        match self {
            ArbError::NetworkError(_) => true,
            ArbError::TimeoutError(_) => true,
            ArbError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            ArbError::RemoteErrors(_) => true,
            ArbError::ParseError(_) => false,
            ArbError::CacheError(_) => true,
            ArbError::DatabaseError(_) => false,
            ArbError::ConfigError(_) => false,
            ArbError::NotificationError(_) => true,
            ArbError::UnknownVenue(_) => false,
            ArbError::TaskError(_) => true,
        }
    }

    /// Determines if the operation should be retried immediately.
    /// Only transient transport failures qualify; a response that arrived
    /// (even an error response) is never resent.
    pub fn should_retry(&self) -> bool {
        self.is_recoverable() && self.is_transient()
    }
}

pub type Result<T> = std::result::Result<T, ArbError>;

/// Linear backoff: the n-th retry waits `retry_delay * n`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.retry_delay * attempt;
        debug!("Retry attempt {}: delay = {:?}", attempt, delay);
        delay
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or `max_retries` retries have been spent. The closure is expected to
    /// resend the identical request every time.
    pub async fn execute<F, T, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            if attempt > 0 {
                sleep(self.delay_for_attempt(attempt)).await;
            }

            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!("{}: succeeded after {} retries", label, attempt);
                    }
                    return Ok(result);
                }
                Err(e) if !e.should_retry() => {
                    warn!("{}: non-retryable error on attempt {}: {}", label, attempt + 1, e);
                    return Err(e);
                }
                Err(e) if attempt >= self.max_retries => {
                    warn!("{}: all {} attempts failed, last error: {}", label, attempt + 1, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("{}: attempt {} failed: {} (retrying...)", label, attempt + 1, e);
                }
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_linear_backoff_schedule() {
        let policy = RetryPolicy::new(3, Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(600));
    }

    #[test]
    fn test_error_classification() {
        assert!(ArbError::TimeoutError("t".into()).should_retry());
        assert!(ArbError::NetworkError("reset".into()).should_retry());
        assert!(!ArbError::HttpStatus { status: 503, body: String::new() }.should_retry());
        assert!(!ArbError::RemoteErrors(vec!["bad field".into()]).should_retry());
        assert!(!ArbError::ParseError("missing".into()).is_recoverable());
    }

    #[tokio::test]
    async fn test_retry_stops_on_fatal_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let counter = calls.clone();
        let result: Result<()> = policy
            .execute("fatal", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ArbError::HttpStatus { status: 400, body: "bad query".into() })
                }
            })
            .await;
        assert!(matches!(result, Err(ArbError::HttpStatus { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_exhausts_on_transient_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let counter = calls.clone();
        let result: Result<()> = policy
            .execute("transient", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ArbError::TimeoutError("slow".into()))
                }
            })
            .await;
        assert!(matches!(result, Err(ArbError::TimeoutError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let counter = calls.clone();
        let result = policy
            .execute("flaky", || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(ArbError::NetworkError("reset".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
