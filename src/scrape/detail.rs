use crate::Result;
use crate::chrome::{CaptureFilter, PageDriver, navigate_with_retry};
use crate::config::TimingConfig;
use crate::retry::settle;
use crate::scrape::extract::ExtractedRow;
use crate::scrape::model::DetailLink;
use crate::site::DetailSpec;
use crate::utils::same_page;

/// Outcome of one row's resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub link: DetailLink,
    /// The listing document was reloaded while restoring it; any in-page
    /// state such as an AJAX page position is back to its initial value.
    pub reloaded: bool,
}

impl Resolution {
    fn kept(link: DetailLink) -> Self {
        Self {
            link,
            reloaded: false,
        }
    }
}

/// Recovers detail URLs that only exist behind a script-opened modal or popup.
///
/// The URL is taken from, in order: the first outgoing request accepted by
/// the capture filter (or an intercepted `window.open`), the page URL after
/// the click, the page URL before it. The listing URL is restored before
/// returning whenever the click moved the page.
pub struct DetailLinkResolver<'a, D: PageDriver + ?Sized> {
    driver: &'a D,
    timing: &'a TimingConfig,
    rows: &'a str,
    spec: &'a DetailSpec,
    filter: CaptureFilter,
}

impl<'a, D: PageDriver + ?Sized> DetailLinkResolver<'a, D> {
    pub fn new(
        driver: &'a D,
        timing: &'a TimingConfig,
        rows: &'a str,
        spec: &'a DetailSpec,
    ) -> Result<Self> {
        Ok(Self {
            driver,
            timing,
            rows,
            spec,
            filter: CaptureFilter::from_spec(spec)?,
        })
    }

    pub async fn resolve(&self, row: &ExtractedRow) -> Resolution {
        if !row.has_trigger {
            return Resolution::kept(DetailLink::NotApplicable);
        }

        let before = match self.driver.current_url().await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::debug!("Could not read URL before row {}: {}", row.index, e);
                None
            }
        };

        let observer = match self.driver.arm_observer(self.filter.clone()).await {
            Ok(observer) => Some(observer),
            Err(e) => {
                tracing::warn!("Request observer unavailable: {}", e);
                None
            }
        };

        let clicked = self
            .driver
            .click_in_row(self.rows, row.index, &self.spec.trigger)
            .await;
        if clicked.is_ok() {
            settle(self.timing.detail_settle()).await;
        }

        let intercepted = match observer {
            Some(observer) => self.driver.disarm_observer(observer).await,
            None => None,
        };

        if let Err(e) = clicked {
            tracing::debug!("Trigger for row {} not clickable: {}", row.index, e);
            return Resolution::kept(DetailLink::TriggerMissing);
        }

        let after = self.driver.current_url().await.ok();
        let reloaded = match before {
            Some(ref before) => self.restore(before, after.as_deref()).await,
            None => false,
        };

        let link = match intercepted.or(after).or(before) {
            Some(url) => DetailLink::Resolved { url },
            None => DetailLink::TriggerMissing,
        };
        Resolution { link, reloaded }
    }

    /// Returns to `before` if the click left it: history first, then a direct
    /// navigation. True when the listing document had to be loaded again.
    async fn restore(&self, before: &str, after: Option<&str>) -> bool {
        if after.is_some_and(|after| same_page(after, before)) {
            return false;
        }

        tracing::debug!("Detail view left the listing; going back");
        if let Err(e) = self
            .driver
            .go_back(self.timing.navigation_timeout())
            .await
        {
            tracing::warn!("Back navigation failed: {}", e);
        }
        settle(self.timing.back_settle()).await;

        let landed = self.driver.current_url().await.ok();
        if landed.is_some_and(|landed| same_page(&landed, before)) {
            return true;
        }

        tracing::warn!("Back navigation did not reach the listing; reloading {}", before);
        if let Err(e) = navigate_with_retry(self.driver, before, self.timing).await {
            tracing::warn!("Could not restore listing: {}", e);
        }
        true
    }
}
