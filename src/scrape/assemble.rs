use crate::chrome::{PageDriver, SessionLauncher, navigate_with_retry, wait_for_ready};
use crate::config::Config;
use crate::retry::settle;
use crate::scrape::extract::extract_summary;
use crate::scrape::mode::{PageMode, classify, read_notice};
use crate::scrape::model::{ResultDocument, SectionOutput, SectionRecord};
use crate::scrape::paginate::{PageWalk, Paginator};
use crate::site::{PrepareAction, SectionSpec};
use crate::store::SnapshotStore;
use crate::utils::same_page;
use crate::{Result, ScrapeError};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Runs the whole pipeline on one browser session and persists the result.
///
/// `run` never fails: every error ends up in the document, and the document
/// is written on every path, including a panic inside a stage.
pub struct SnapshotAssembler<L: SessionLauncher> {
    config: Arc<Config>,
    launcher: L,
    store: SnapshotStore,
}

impl<L: SessionLauncher> SnapshotAssembler<L> {
    pub fn new(config: Arc<Config>, launcher: L) -> Self {
        let store = SnapshotStore::new(&config.output.path, config.output.json_pretty);
        Self {
            config,
            launcher,
            store,
        }
    }

    pub fn with_store(mut self, store: SnapshotStore) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub async fn run(&self) -> ResultDocument {
        let mut doc = ResultDocument::new(&self.config.site);
        tracing::info!("Starting snapshot of {}", self.config.site.landing_url);

        match self.launcher.open().await {
            Ok(mut driver) => {
                let collected = AssertUnwindSafe(self.collect(&driver, &mut doc))
                    .catch_unwind()
                    .await;
                if let Err(panic) = collected {
                    let error = ScrapeError::Panicked(panic_message(panic.as_ref()));
                    tracing::error!("Pipeline aborted: {}", error);
                    doc.mark_fatal("session", error.to_string());
                }

                if let Err(e) = driver.close().await {
                    tracing::warn!("Session teardown failed: {}", e);
                }
            }
            Err(e) => {
                tracing::error!("Could not open browser session: {}", e);
                doc.mark_fatal("session", e.to_string());
            }
        }

        doc.finish();
        match self.store.persist(&doc) {
            Ok(()) => tracing::info!(
                "Snapshot ({}) written to {}",
                doc.outcome(),
                self.store.path().display()
            ),
            Err(e) => tracing::error!(
                "Failed to write snapshot to {}: {}",
                self.store.path().display(),
                e
            ),
        }

        doc
    }

    async fn collect<D: PageDriver>(&self, driver: &D, doc: &mut ResultDocument) {
        let site = &self.config.site;
        let timing = &self.config.timing;

        if let Err(e) = navigate_with_retry(driver, &site.landing_url, timing).await {
            tracing::error!("Landing page unavailable: {}", e);
            doc.set_main(SectionRecord::placeholder(e.to_string()));
            doc.note_error("main", e.to_string());
        } else {
            let mode = classify(driver, site.maintenance.as_ref())
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("Maintenance check failed, assuming normal: {}", e);
                    PageMode::Normal
                });

            if mode == PageMode::Maintenance
                && let Some(ref spec) = site.maintenance
            {
                tracing::warn!("Site is under maintenance; skipping extraction");
                doc.enter_maintenance(read_notice(driver, spec).await);
                return;
            }

            match self.read_main(driver).await {
                Ok(main) => doc.set_main(main),
                Err(e) => {
                    tracing::warn!("Summary block unavailable: {}", e);
                    doc.set_main(SectionRecord::placeholder(e.to_string()));
                    doc.note_error("main", e.to_string());
                }
            }
        }

        for section in &site.sections {
            tracing::info!("Section {}", section.name);
            let scraped = AssertUnwindSafe(self.scrape_section(driver, section))
                .catch_unwind()
                .await;
            let output = scraped.unwrap_or_else(|panic| {
                let message = panic_message(panic.as_ref());
                tracing::error!("Section {} aborted: {}", section.name, message);
                SectionOutput {
                    name: section.name.clone(),
                    records: Vec::new(),
                    truncated: None,
                    failure: Some(ScrapeError::Panicked(message)),
                }
            });
            doc.merge(output);
        }
    }

    async fn read_main<D: PageDriver>(&self, driver: &D) -> Result<SectionRecord> {
        let site = &self.config.site;
        if let Some(ref ready) = site.landing_ready {
            wait_for_ready(driver, ready, self.config.timing.ready_timeout()).await?;
        }
        extract_summary(driver, &site.summary).await
    }

    async fn scrape_section<D: PageDriver>(&self, driver: &D, section: &SectionSpec) -> SectionOutput {
        let mut output = SectionOutput {
            name: section.name.clone(),
            records: Vec::new(),
            truncated: None,
            failure: None,
        };

        let mut pages = 0;
        match self.walk_section(driver, section).await {
            Ok(PageWalk {
                records,
                pages: read,
                halted,
            }) => {
                pages = read;
                output.records = records;
                match halted {
                    Some(failure) if failure.page == 1 => output.failure = Some(failure.error),
                    halted => output.truncated = halted,
                }
            }
            Err(e) => output.failure = Some(e),
        }

        if let Some(ref error) = output.failure {
            tracing::warn!("Section {} failed ({}): {}", section.name, error.kind(), error);
        }
        tracing::info!(
            "Section {}: {} records from {} page(s)",
            section.name,
            output.records.len(),
            pages
        );
        output
    }

    async fn walk_section<D: PageDriver>(&self, driver: &D, section: &SectionSpec) -> Result<PageWalk> {
        let timing = &self.config.timing;
        let url = self.config.site.section_url(section);

        let current = driver.current_url().await.unwrap_or_default();
        if !same_page(&current, url) {
            navigate_with_retry(driver, url, timing).await?;
        }

        for action in &section.prepare {
            match action {
                PrepareAction::Click { selector } => driver.click(selector).await?,
                PrepareAction::Select { selector, value } => {
                    driver.select_option(selector, value).await?
                }
            }
            settle(timing.interaction_settle()).await;
        }

        Paginator::new(driver, timing)
            .collect(section, section.max_pages())
            .await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
