//! Retry-then-fallback wrapper around a single upstream call.
//!
//! [`call_with_fallback`] is the generic decorator: it takes the call, a retry predicate,
//! a backoff schedule and a fallback producer, and always returns a value.
//! [`RetryPolicy`] carries the configured schedule for transport calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use metrics::counter;

use crate::transport::{HttpResponse, TransportError};

/// Delay between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed { delay: Duration },
    /// `step × attempt`, with `attempt` starting at 1.
    Linear { step: Duration },
}

impl Backoff {
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Linear { step } => step.saturating_mul(attempt),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Backoff::Linear {
                step: Duration::from_millis(500),
            },
        }
    }
}

impl RetryPolicy {
    pub fn linear(max_retries: u32, step: Duration) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Linear { step },
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            backoff: Backoff::Fixed {
                delay: Duration::ZERO,
            },
        }
    }

    /// Runs an upstream transport call under this policy.
    ///
    /// Transient failures are retried; anything left over becomes
    /// [`HttpResponse::synthetic_empty`].
    pub async fn execute<F, Fut>(&self, source: &str, call: F) -> HttpResponse
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<HttpResponse, TransportError>>,
    {
        let backoff = self.backoff;
        call_with_fallback(
            source,
            self.max_retries,
            call,
            TransportError::is_transient,
            |attempt| backoff.delay(attempt),
            |_| HttpResponse::synthetic_empty(),
        )
        .await
    }
}

/// Calls `call` until it succeeds, the error is not retryable, or `max_retries` is used up.
/// Final failures are handed to `fallback`, whose value is returned instead.
pub async fn call_with_fallback<T, E, Call, Fut, Retry, Delay, Fallback>(
    source: &str,
    max_retries: u32,
    mut call: Call,
    should_retry: Retry,
    backoff: Delay,
    fallback: Fallback,
) -> T
where
    Call: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    Retry: Fn(&E) -> bool,
    Delay: Fn(u32) -> Duration,
    Fallback: FnOnce(E) -> T,
    E: Display,
{
    let mut attempt: u32 = 0;
    loop {
        let err = match call().await {
            Ok(value) => return value,
            Err(e) => e,
        };

        let retryable = should_retry(&err);
        if retryable && attempt < max_retries {
            attempt += 1;
            let delay = backoff(attempt);
            tracing::warn!(
                target: "upstream",
                source,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient upstream failure, retrying"
            );
            counter!("upstream_retries_total", "source" => source.to_string()).increment(1);
            tokio::time::sleep(delay).await;
            continue;
        }

        if retryable {
            tracing::warn!(
                target: "upstream",
                source,
                attempts = attempt + 1,
                error = %err,
                "upstream still failing after retries, using fallback"
            );
        } else {
            tracing::error!(
                target: "upstream",
                source,
                error = %err,
                "non-transient upstream failure, using fallback"
            );
        }
        counter!("upstream_fallbacks_total", "source" => source.to_string()).increment(1);
        return fallback(err);
    }
}
