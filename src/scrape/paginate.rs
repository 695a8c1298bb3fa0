use crate::chrome::{PageDriver, wait_for_ready};
use crate::config::TimingConfig;
use crate::retry::{RetryPolicy, retry, settle};
use crate::scrape::detail::DetailLinkResolver;
use crate::scrape::extract::extract_section;
use crate::scrape::model::SectionRecord;
use crate::site::SectionSpec;
use crate::{Result, ScrapeError};
use std::time::Duration;

/// The page a walk stopped on and why.
#[derive(Debug)]
pub struct PageFailure {
    pub page: usize,
    pub error: ScrapeError,
}

#[derive(Debug, Default)]
pub struct PageWalk {
    /// Records from every page read, in page then DOM order.
    pub records: Vec<SectionRecord>,
    /// Pages fully read.
    pub pages: usize,
    pub halted: Option<PageFailure>,
}

/// Walks a section's listing pages on the shared page.
///
/// Page 1 must already be loaded. The walk ends normally at `max_pages` or
/// when the control for the next page is absent; any other failure halts it
/// and keeps what earlier pages produced.
pub struct Paginator<'a, D: PageDriver + ?Sized> {
    driver: &'a D,
    timing: &'a TimingConfig,
}

impl<'a, D: PageDriver + ?Sized> Paginator<'a, D> {
    pub fn new(driver: &'a D, timing: &'a TimingConfig) -> Self {
        Self { driver, timing }
    }

    /// Fails only when the section's detail capture filter is invalid.
    pub async fn collect(&self, section: &SectionSpec, max_pages: usize) -> Result<PageWalk> {
        let max_pages = max_pages.max(1);
        let resolver = section
            .detail
            .as_ref()
            .map(|spec| DetailLinkResolver::new(self.driver, self.timing, &section.rows, spec))
            .transpose()?;

        let mut walk = PageWalk::default();
        let mut page = 1;

        loop {
            if let Err(error) = self.await_page(section, page).await {
                tracing::warn!("{}: page {} never became ready: {}", section.name, page, error);
                walk.halted = Some(PageFailure { page, error });
                break;
            }
            settle(self.timing.page_settle()).await;

            let before = walk.records.len();
            match self
                .read_page(section, page, resolver.as_ref(), &mut walk.records)
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        "{}: page {} -> {} records",
                        section.name,
                        page,
                        walk.records.len() - before
                    );
                    walk.pages = page;
                }
                Err(error) => {
                    tracing::warn!("{}: page {} abandoned: {}", section.name, page, error);
                    walk.halted = Some(PageFailure { page, error });
                    break;
                }
            }

            if page >= max_pages {
                tracing::debug!("{}: page cap {} reached", section.name, max_pages);
                break;
            }

            let Some(ref pagination) = section.pagination else {
                break;
            };
            let next = pagination.next_selector(page + 1);

            match self.driver.count(&next).await {
                Ok(0) => {
                    tracing::debug!("{}: no control for page {}", section.name, page + 1);
                    break;
                }
                Ok(_) => {}
                Err(error) => {
                    walk.halted = Some(PageFailure {
                        page: page + 1,
                        error,
                    });
                    break;
                }
            }

            let policy = RetryPolicy::new(self.timing.navigation_attempts, self.timing.retry_delay());
            if let Err(error) = retry(policy, "pagination click", |_| self.driver.click(&next)).await {
                walk.halted = Some(PageFailure {
                    page: page + 1,
                    error,
                });
                break;
            }
            settle(self.timing.interaction_settle()).await;
            page += 1;
        }

        Ok(walk)
    }

    /// Page 1 may reload and wait again, up to the section's `ready_attempts`.
    async fn await_page(&self, section: &SectionSpec, page: usize) -> Result<()> {
        let condition = section.ready_condition();
        let timeout = self.timing.ready_timeout();

        if page > 1 {
            return wait_for_ready(self.driver, &condition, timeout).await;
        }

        let condition = &condition;
        let policy = RetryPolicy::new(section.ready_attempts, Duration::ZERO);
        retry(policy, "readiness wait", |attempt| async move {
            if attempt > 1 {
                self.driver
                    .reload(self.timing.navigation_timeout())
                    .await?;
            }
            wait_for_ready(self.driver, condition, timeout).await
        })
        .await
    }

    /// Records of a page that fails midway are kept in `out`.
    async fn read_page(
        &self,
        section: &SectionSpec,
        page: usize,
        resolver: Option<&DetailLinkResolver<'a, D>>,
        out: &mut Vec<SectionRecord>,
    ) -> Result<()> {
        let rows = extract_section(self.driver, section).await?;
        out.reserve(rows.len());

        for row in rows {
            let Some(resolver) = resolver else {
                out.push(row.record);
                continue;
            };

            let resolution = resolver.resolve(&row).await;
            out.push(row.record.with_detail(resolution.link));
            if resolution.reloaded {
                self.return_to_page(section, page).await?;
            }
        }

        Ok(())
    }

    /// Brings a freshly loaded listing back to `page` by replaying the page controls.
    async fn return_to_page(&self, section: &SectionSpec, page: usize) -> Result<()> {
        let condition = section.ready_condition();
        let timeout = self.timing.ready_timeout();
        wait_for_ready(self.driver, &condition, timeout).await?;

        let Some(ref pagination) = section.pagination else {
            return Ok(());
        };
        if page > 1 {
            tracing::debug!("{}: returning to page {}", section.name, page);
        }
        for n in 2..=page {
            self.driver.click(&pagination.next_selector(n)).await?;
            settle(self.timing.interaction_settle()).await;
            wait_for_ready(self.driver, &condition, timeout).await?;
        }
        Ok(())
    }
}
