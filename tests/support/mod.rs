#![allow(dead_code)]

use render_snapshot::chrome::{
    CaptureFilter, PageDriver, RawRow, RequestObserver, RowQuery, SessionLauncher,
};
use render_snapshot::config::{Config, OutputConfig, TimingConfig};
use render_snapshot::site::{
    DetailSpec, FieldSpec, MaintenanceSpec, PaginationSpec, ReadyCondition, SectionSpec,
    SiteConfig,
};
use render_snapshot::{Result, ScrapeError};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub const LANDING: &str = "https://fire.example/main.do";
pub const SUB1: &str = "https://fire.example/sub1.do";
pub const MARKER: &str = "#maintenance";
pub const NEXT_PREFIX: &str = ".paging a[data-page='";

pub fn detail_url(no: u32) -> String {
    format!("https://fire.example/frfrInfoPop.do?no={}", no)
}

/// What clicking a row's detail control does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// No control in the row.
    None,
    /// Fires a document request (after a listing re-fetch that must be ignored).
    Request(String),
    /// Calls `window.open`, caught in-page.
    Popup(String),
    /// Replaces the page with the detail view.
    Navigate(String),
    /// Clickable, but nothing observable happens.
    Silent,
    /// Detected while reading, gone by the time of the click.
    Vanish,
    Panic,
}

#[derive(Debug, Clone)]
pub struct FakeRow {
    pub values: Vec<Option<String>>,
    pub trigger: Trigger,
}

impl FakeRow {
    pub fn new(values: &[&str], trigger: Trigger) -> Self {
        Self {
            values: values.iter().map(|v| Some(v.to_string())).collect(),
            trigger,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListingPage {
    pub ready: bool,
    pub rows: Vec<FakeRow>,
}

impl ListingPage {
    pub fn ready(rows: Vec<FakeRow>) -> Self {
        Self { ready: true, rows }
    }

    pub fn never_ready() -> Self {
        Self {
            ready: false,
            rows: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub maintenance: bool,
    /// Document-scoped values keyed by field name.
    pub texts: HashMap<String, String>,
    pub listing: Vec<ListingPage>,
    /// Selectors that `click`/`select_option` accept.
    pub controls: Vec<String>,
    /// Page 1 only becomes ready after this many reloads.
    pub reloads_needed: usize,
    /// Reading document-scoped fields panics.
    pub crash_on_read: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    pub pages: HashMap<String, FakePage>,
}

#[derive(Debug, Default)]
pub struct State {
    pub history: Vec<String>,
    pub cursor: usize,
    /// Listing page currently shown, 1-based.
    pub page: usize,
    pub reloads: usize,
    pub nav_failures: HashMap<String, usize>,
    pub calls: Vec<String>,
    pub observer: Option<RequestObserver>,
    pub opens: usize,
    pub closes: usize,
    pub fail_close: bool,
}

impl State {
    pub fn current(&self) -> Option<&str> {
        self.history.get(self.cursor).map(String::as_str)
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls.iter().filter(|c| c.starts_with(prefix)).count()
    }
}

#[derive(Clone)]
pub struct FakeDriver {
    site: Arc<FakeSite>,
    state: Arc<Mutex<State>>,
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn next_page(selector: &str) -> Option<usize> {
    selector
        .strip_prefix(NEXT_PREFIX)?
        .strip_suffix("']")?
        .parse()
        .ok()
}

impl FakeDriver {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site: Arc::new(site),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    fn log(&self, call: String) {
        self.state().calls.push(call);
    }

    fn page(&self, state: &State) -> Option<FakePage> {
        state
            .current()
            .and_then(|url| self.site.pages.get(url))
            .cloned()
    }
}

#[async_trait::async_trait]
impl PageDriver for FakeDriver {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        let mut state = self.state();
        state.calls.push(format!("navigate {}", url));

        if let Some(remaining) = state.nav_failures.get_mut(url)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(ScrapeError::NavigationTimeout(1));
        }

        if !self.site.pages.contains_key(url) {
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                attempts: 1,
                reason: "net::ERR_NAME_NOT_RESOLVED".into(),
            });
        }

        let keep = (state.cursor + 1).min(state.history.len());
        state.history.truncate(keep);
        state.history.push(url.to_string());
        state.cursor = state.history.len() - 1;
        state.page = 1;
        Ok(())
    }

    async fn reload(&self, _timeout: Duration) -> Result<()> {
        let mut state = self.state();
        state.calls.push("reload".into());
        state.reloads += 1;
        state.page = 1;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state().current().unwrap_or("about:blank").to_string())
    }

    async fn is_ready(&self, _condition: &ReadyCondition) -> Result<bool> {
        let state = self.state();
        let Some(page) = self.page(&state) else {
            return Ok(false);
        };
        let Some(listing) = page.listing.get(state.page.saturating_sub(1)) else {
            return Ok(false);
        };
        Ok(listing.ready && (state.page > 1 || state.reloads >= page.reloads_needed))
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let mut state = self.state();
        state.calls.push(format!("count {}", selector));
        let Some(page) = self.page(&state) else {
            return Ok(0);
        };

        if selector == MARKER {
            return Ok(usize::from(page.maintenance));
        }
        if let Some(n) = next_page(selector) {
            return Ok(usize::from(n <= page.listing.len()));
        }
        Ok(usize::from(page.controls.iter().any(|c| c == selector)))
    }

    async fn read_fields(&self, fields: &[FieldSpec]) -> Result<Vec<Option<String>>> {
        let mut state = self.state();
        state.calls.push("read_fields".into());
        let page = self.page(&state).unwrap_or_default();
        drop(state);
        if page.crash_on_read {
            panic!("renderer crashed on landing page");
        }
        Ok(fields
            .iter()
            .map(|f| page.texts.get(&f.name).cloned())
            .collect())
    }

    async fn read_rows(&self, query: &RowQuery<'_>) -> Result<Vec<RawRow>> {
        let mut state = self.state();
        let url = state.current().unwrap_or("about:blank").to_string();
        let shown = state.page;
        state.calls.push(format!("read_rows {} p{}", url, shown));

        let page = self.page(&state).unwrap_or_default();
        let rows = page
            .listing
            .get(state.page.saturating_sub(1))
            .map(|l| l.rows.clone())
            .unwrap_or_default();

        Ok(rows
            .into_iter()
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|row| RawRow {
                values: row.values,
                has_trigger: query.trigger.is_some() && row.trigger != Trigger::None,
            })
            .collect())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut state = self.state();
        state.calls.push(format!("click {}", selector));
        let not_found = || ScrapeError::NotFound {
            selector: selector.to_string(),
        };
        let page = self.page(&state).ok_or_else(not_found)?;

        if let Some(n) = next_page(selector) {
            if n > page.listing.len() {
                return Err(not_found());
            }
            state.page = n;
            return Ok(());
        }

        if page.controls.iter().any(|c| c == selector) {
            Ok(())
        } else {
            Err(not_found())
        }
    }

    async fn click_in_row(&self, _rows: &str, index: usize, target: &str) -> Result<()> {
        let trigger = {
            let mut state = self.state();
            state.calls.push(format!("click_in_row {}", index));
            self.page(&state)
                .and_then(|page| page.listing.get(state.page.saturating_sub(1)).cloned())
                .and_then(|listing| listing.rows.get(index).cloned())
                .map(|row| row.trigger)
                .unwrap_or(Trigger::None)
        };

        let not_found = || ScrapeError::NotFound {
            selector: target.to_string(),
        };

        match trigger {
            Trigger::None | Trigger::Vanish => Err(not_found()),
            Trigger::Panic => panic!("renderer crashed"),
            Trigger::Silent => Ok(()),
            Trigger::Request(url) => {
                let state = self.state();
                if let Some(ref observer) = state.observer {
                    observer.offer(SUB1, Some("Document"));
                    observer.offer(&url, Some("Document"));
                }
                Ok(())
            }
            Trigger::Popup(url) => {
                let state = self.state();
                if let Some(ref observer) = state.observer {
                    observer.offer(&url, None);
                }
                Ok(())
            }
            Trigger::Navigate(url) => {
                let mut state = self.state();
                let keep = state.cursor + 1;
                state.history.truncate(keep);
                state.history.push(url);
                state.cursor += 1;
                Ok(())
            }
        }
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        let mut state = self.state();
        state.calls.push(format!("select {}={}", selector, value));
        let present = self
            .page(&state)
            .is_some_and(|page| page.controls.iter().any(|c| c == selector));
        if present {
            Ok(())
        } else {
            Err(ScrapeError::NotFound {
                selector: selector.to_string(),
            })
        }
    }

    async fn go_back(&self, _timeout: Duration) -> Result<()> {
        let mut state = self.state();
        state.calls.push("go_back".into());
        if state.cursor == 0 {
            return Err(ScrapeError::General("No history to navigate back".into()));
        }
        state.cursor -= 1;
        // History entries reload the document, so in-page paging starts over.
        state.page = 1;
        Ok(())
    }

    async fn arm_observer(&self, filter: CaptureFilter) -> Result<RequestObserver> {
        let mut state = self.state();
        state.calls.push("arm".into());
        let observer = RequestObserver::new(filter);
        state.observer = Some(observer.clone());
        Ok(observer)
    }

    async fn disarm_observer(&self, observer: RequestObserver) -> Option<String> {
        let mut state = self.state();
        state.calls.push("disarm".into());
        state.observer = None;
        observer.captured()
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.state();
        state.calls.push("close".into());
        state.closes += 1;
        if state.fail_close {
            return Err(ScrapeError::Teardown("browser: connection reset".into()));
        }
        Ok(())
    }
}

pub struct FakeLauncher {
    driver: FakeDriver,
}

impl FakeLauncher {
    pub fn new(site: FakeSite) -> Self {
        Self {
            driver: FakeDriver::new(site),
        }
    }

    pub fn fail_navigation(self, url: &str, times: usize) -> Self {
        self.driver
            .state()
            .nav_failures
            .insert(url.to_string(), times);
        self
    }

    pub fn fail_close(self) -> Self {
        self.driver.state().fail_close = true;
        self
    }

    /// Shares state with every driver this launcher opens.
    pub fn driver(&self) -> FakeDriver {
        self.driver.clone()
    }
}

#[async_trait::async_trait]
impl SessionLauncher for FakeLauncher {
    type Driver = FakeDriver;

    async fn open(&self) -> Result<FakeDriver> {
        self.driver.state().opens += 1;
        Ok(self.driver.clone())
    }
}

pub struct FailingLauncher;

#[async_trait::async_trait]
impl SessionLauncher for FailingLauncher {
    type Driver = FakeDriver;

    async fn open(&self) -> Result<FakeDriver> {
        Err(ScrapeError::LaunchFailed(
            "Could not find Chrome/Chromium executable".into(),
        ))
    }
}

pub fn fire_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::cell("start", 1),
        FieldSpec::cell("location", 3),
        FieldSpec::cell("status", 4),
    ]
}

pub fn fires_section() -> SectionSpec {
    SectionSpec {
        name: "fires".into(),
        url: Some(SUB1.into()),
        rows: "#fire-list tr".into(),
        ready: None,
        fields: fire_fields(),
        max_rows: None,
        ready_attempts: 1,
        prepare: Vec::new(),
        pagination: Some(PaginationSpec {
            next: format!("{}{{page}}']", NEXT_PREFIX),
            max_pages: 3,
        }),
        detail: Some(DetailSpec {
            trigger: "button.detail".into(),
            capture: Some(r"frfrInfoPop\.do".into()),
            exclude: vec!["sub1.do".into(), "sub2.do".into()],
            resource_types: vec!["Document".into()],
        }),
    }
}

pub fn warnings_section() -> SectionSpec {
    SectionSpec {
        name: "warnings".into(),
        url: None,
        rows: "#warn-list li".into(),
        ready: None,
        fields: vec![
            FieldSpec::selector("title", "span.title"),
            FieldSpec::selector("issued", "time").with_attribute("datetime"),
        ],
        max_rows: Some(2),
        ready_attempts: 1,
        prepare: Vec::new(),
        pagination: None,
        detail: None,
    }
}

pub fn site_config() -> SiteConfig {
    let mut maintenance = MaintenanceSpec::new(MARKER);
    maintenance.title = Some("#mt-title".into());
    maintenance.message = Some("#mt-message".into());
    maintenance.schedule = Some("#mt-schedule".into());

    SiteConfig {
        landing_url: LANDING.into(),
        landing_ready: None,
        summary: vec![
            FieldSpec::selector("level", "#level").with_default("N/A"),
            FieldSpec::selector("active", "#active").with_default("N/A"),
        ],
        maintenance: Some(maintenance),
        sections: vec![fires_section(), warnings_section()],
    }
}

pub fn config(dir: &Path, site: SiteConfig) -> Arc<Config> {
    Arc::new(Config {
        timing: TimingConfig::immediate(),
        output: OutputConfig {
            path: dir.join("snapshot.json"),
            json_pretty: true,
        },
        site,
        ..Default::default()
    })
}

pub fn landing_page() -> FakePage {
    FakePage {
        texts: HashMap::from([("level".to_string(), " 관심 ".to_string())]),
        listing: vec![ListingPage::ready(vec![
            FakeRow::new(&["건조주의보", "2026-03-01T09:00"], Trigger::None),
            FakeRow::new(&["강풍주의보", "2026-03-01T10:00"], Trigger::None),
            FakeRow::new(&["한파주의보", "2026-03-01T11:00"], Trigger::None),
        ])],
        ..Default::default()
    }
}

pub fn fire_row(location: &str, trigger: Trigger) -> FakeRow {
    FakeRow::new(&["2026-03-01 14:20", location, "진화중"], trigger)
}

/// Three listing pages exercising every detail outcome.
pub fn fire_listing() -> Vec<ListingPage> {
    vec![
        ListingPage::ready(vec![
            fire_row("강원 강릉시", Trigger::Request(detail_url(1))),
            fire_row(" 경북 의성군 ", Trigger::None),
            fire_row("충남 홍성군", Trigger::Navigate(detail_url(3))),
        ]),
        ListingPage::ready(vec![
            fire_row("전남 순천시", Trigger::Silent),
            fire_row("경남 산청군", Trigger::Popup(detail_url(5))),
        ]),
        ListingPage::ready(vec![fire_row("울산 울주군", Trigger::Vanish)]),
    ]
}

pub fn standard_site() -> FakeSite {
    FakeSite {
        pages: HashMap::from([
            (LANDING.to_string(), landing_page()),
            (
                SUB1.to_string(),
                FakePage {
                    listing: fire_listing(),
                    ..Default::default()
                },
            ),
        ]),
    }
}

pub fn read_snapshot(path: &Path) -> serde_json::Value {
    let body = std::fs::read_to_string(path).expect("snapshot written");
    serde_json::from_str(&body).expect("snapshot is valid JSON")
}
