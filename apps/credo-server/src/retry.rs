//! Bounded fixed-delay retry for notification dispatch.
//!
//! The retry loop suspends the calling request between attempts and holds
//! no store state; the account transition it follows has already been
//! persisted before dispatch begins.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(100),
        }
    }
}

/// Run `op`, pausing `policy.delay` after each failure, until it succeeds
/// or `policy.max_attempts` attempts are spent. The final error is returned
/// unchanged. No backoff, no jitter.
pub async fn dispatch_with_retry<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= policy.max_attempts => return Err(err),
            Err(err) => {
                tracing::debug!(attempt, "dispatch attempt failed, retrying: {err}");
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}
