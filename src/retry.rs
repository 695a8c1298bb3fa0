use crate::Result;
use std::future::Future;
use std::time::Duration;

/// Bounded attempts with a fixed delay between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the budget is spent.
/// The final attempt's error is returned unchanged.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && e.is_retryable() => {
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {}ms",
                    label,
                    attempt,
                    attempts,
                    e,
                    policy.delay.as_millis()
                );
                settle(policy.delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Fixed wait after a DOM-mutating action, for rendering that signals no completion.
pub async fn settle(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
