use super::PageDriver;
use crate::config::TimingConfig;
use crate::retry::{RetryPolicy, retry};
use crate::site::ReadyCondition;
use crate::{Result, ScrapeError, timeouts::{ms, secs}};
use chromiumoxide::Page;
use std::time::Duration;

/// Navigates with the configured attempt budget. Exhaustion surfaces as
/// [`ScrapeError::Navigation`] carrying the last attempt's reason.
pub async fn navigate_with_retry<D: PageDriver + ?Sized>(
    driver: &D,
    url: &str,
    timing: &TimingConfig,
) -> Result<()> {
    let policy = RetryPolicy::new(timing.navigation_attempts, timing.retry_delay());
    let timeout = timing.navigation_timeout();

    tracing::info!("Navigating to {}", url);
    retry(policy, "navigation", |_| driver.navigate(url, timeout))
        .await
        .map_err(|e| {
            let reason = match e {
                ScrapeError::Navigation { reason, .. } => reason,
                other => other.to_string(),
            };
            ScrapeError::Navigation {
                url: url.to_string(),
                attempts: policy.max_attempts,
                reason,
            }
        })
}

/// Polls `condition` until it holds or `timeout` elapses. The condition is
/// always checked at least once. Evaluation errors while polling count as
/// "not ready yet", since the document may still be swapping.
pub async fn wait_for_ready<D: PageDriver + ?Sized>(
    driver: &D,
    condition: &ReadyCondition,
    timeout: Duration,
) -> Result<()> {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        match driver.is_ready(condition).await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) => tracing::debug!("Readiness probe for {} failed: {}", condition.selector, e),
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(ScrapeError::Timeout {
                selector: condition.selector.clone(),
                ms: timeout.as_millis() as u64,
            });
        }

        tokio::time::sleep(Duration::from_millis(ms::POLL_INTERVAL)).await;
    }
}

pub(crate) async fn wait_for_load(page: &Page, timeout: Duration) -> Result<()> {
    tokio::time::timeout(timeout, async {
        let mut stable_count = 0;

        loop {
            match tokio::time::timeout(
                Duration::from_secs(secs::READY_STATE),
                page.evaluate("document.readyState"),
            )
            .await
            {
                Ok(Ok(result)) => {
                    if let Ok(state) = result.into_value::<String>() {
                        if state == "complete" {
                            stable_count += 1;
                            if stable_count >= 2 {
                                return;
                            }
                        } else {
                            stable_count = 0;
                        }
                    }
                }
                Ok(Err(_)) | Err(_) => {
                    stable_count = 0;
                }
            }
            tokio::time::sleep(Duration::from_millis(ms::READY_STATE_POLL)).await;
        }
    })
    .await
    .map_err(|_| ScrapeError::NavigationTimeout(timeout.as_secs()))
}
