//! Bounded exponential backoff around transient connector errors (§4.3,
//! §4.5), grounded on the teacher's `engine-core::retry::RetryPolicy`,
//! generalized from its database-call preset since every worker here talks
//! to Postgres.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retry,
    Stop,
}

#[derive(Debug)]
pub enum RetryError<E> {
    Fatal(E),
    AttemptsExceeded(E),
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Fatal(e) => e,
            RetryError::AttemptsExceeded(e) => e,
        }
    }

    /// Attempts beyond the first that were actually made, for metrics.
    pub fn was_retried(&self) -> bool {
        matches!(self, RetryError::AttemptsExceeded(_))
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::for_database()
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: if max_delay.is_zero() { base_delay } else { max_delay },
        }
    }

    /// Preset for the copy/index/vacuum worker bodies: a dropped connection
    /// mid-partition is worth a handful of retries before surfacing.
    pub fn for_database() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }

    pub async fn run<F, Fut, T, E, Classifier>(&self, mut op: F, classify: Classifier) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Classifier: Fn(&E) -> RetryDisposition,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(result) => return Ok(result),
                Err(err) => match classify(&err) {
                    RetryDisposition::Stop => return Err(RetryError::Fatal(err)),
                    RetryDisposition::Retry => {
                        if attempt + 1 >= self.max_attempts {
                            return Err(RetryError::AttemptsExceeded(err));
                        }
                        sleep(self.backoff_delay(attempt)).await;
                        attempt += 1;
                    }
                },
            }
        }
    }

    fn backoff_delay(&self, attempt: usize) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::from_millis(0);
        }
        let factor = 1u128 << attempt.min(6);
        let delay_ms = self.base_delay.as_millis().saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis()) as u64)
    }
}

/// Transport-level failures (connection reset, timeout) are retryable;
/// anything else (constraint violation, bad SQL) is fatal on the first try.
pub fn classify_db_error(err: &pgconn::DbError) -> RetryDisposition {
    match err {
        pgconn::DbError::Postgres(e) if e.is_closed() => RetryDisposition::Retry,
        pgconn::DbError::Io(_) => RetryDisposition::Retry,
        _ => RetryDisposition::Stop,
    }
}

/// Same classification, for call sites that talk to `tokio_postgres::Client`
/// directly (DDL statements) rather than through the `pgconn::DbError` layer.
pub fn classify_pg_error(err: &tokio_postgres::Error) -> RetryDisposition {
    if err.is_closed() { RetryDisposition::Retry } else { RetryDisposition::Stop }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct TestError(&'static str);

    #[tokio::test]
    async fn retries_transient_failure_and_succeeds() {
        let policy = RetryPolicy::new(5, Duration::from_millis(0), Duration::from_millis(0));
        let attempts = Arc::new(AtomicUsize::new(0));
        let op_attempts = attempts.clone();

        let result = policy
            .run(
                move || {
                    let op_attempts = op_attempts.clone();
                    async move {
                        let attempt = op_attempts.fetch_add(1, Ordering::SeqCst);
                        if attempt < 2 { Err(TestError("transient")) } else { Ok::<&'static str, TestError>("done") }
                    }
                },
                |_| RetryDisposition::Retry,
            )
            .await;

        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_never_retry() {
        let policy = RetryPolicy::new(5, Duration::from_millis(0), Duration::from_millis(0));
        let attempts = Arc::new(AtomicUsize::new(0));
        let op_attempts = attempts.clone();

        let result = policy
            .run(
                move || {
                    let op_attempts = op_attempts.clone();
                    async move {
                        op_attempts.fetch_add(1, Ordering::SeqCst);
                        Err::<(), TestError>(TestError("fatal"))
                    }
                },
                |_| RetryDisposition::Stop,
            )
            .await;

        assert!(matches!(result, Err(RetryError::Fatal(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
