use super::observer::{CaptureFilter, RequestObserver};
use super::wait::wait_for_load;
use super::{PageDriver, RawRow, RowQuery, SessionLauncher};
use crate::config::{BrowserConfig, Config};
use crate::retry::{RetryPolicy, retry};
use crate::site::{FieldSpec, ReadyCondition};
use crate::{
    Result, ScrapeError, js_templates,
    timeouts::{ms, secs},
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventRequestWillBeSent, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    GetNavigationHistoryParams, NavigateParams, NavigateToHistoryEntryParams, ReloadParams,
};
use chromiumoxide::handler::HandlerConfig;
use chromiumoxide::{Browser, BrowserConfig as LaunchConfig, Handler, Page};
use futures::StreamExt;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Deserialize)]
struct Found {
    found: bool,
}

/// One Chrome page owned for the duration of a run.
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    /// False when attached to a browser somebody else started.
    launched: bool,
    profile_dir: Option<PathBuf>,
    closed: bool,
}

impl ChromeSession {
    /// Runs a DOM projection in the page and decodes its JSON result.
    async fn evaluate<T: DeserializeOwned>(&self, script: impl Into<String>) -> Result<T> {
        let result = self
            .page
            .evaluate(script.into())
            .await
            .map_err(|e| ScrapeError::Evaluation(e.to_string()))?;

        result
            .into_value::<T>()
            .map_err(|e| ScrapeError::Evaluation(format!("Unexpected result shape: {}", e)))
    }

    async fn expect_found(&self, script: String, selector: &str) -> Result<()> {
        let found: Found = self.evaluate(script).await?;
        if found.found {
            Ok(())
        } else {
            Err(ScrapeError::NotFound {
                selector: selector.to_string(),
            })
        }
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!("Chrome session dropped without close; aborting handler");
            self.handler.abort();
        }
    }
}

#[async_trait::async_trait]
impl PageDriver for ChromeSession {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| ScrapeError::General(format!("Failed to build navigate params: {}", e)))?;

        let response = tokio::time::timeout(timeout, self.page.execute(nav_params))
            .await
            .map_err(|_| ScrapeError::NavigationTimeout(timeout.as_secs()))?
            .map_err(|e| ScrapeError::Navigation {
                url: url.to_string(),
                attempts: 1,
                reason: e.to_string(),
            })?;

        if let Some(ref error_text) = response.error_text {
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                attempts: 1,
                reason: error_text.clone(),
            });
        }

        wait_for_load(&self.page, timeout).await
    }

    async fn reload(&self, timeout: Duration) -> Result<()> {
        tracing::debug!("Reloading page");
        self.page
            .execute(ReloadParams::builder().build())
            .await
            .map_err(|e| ScrapeError::Navigation {
                url: "(reload)".to_string(),
                attempts: 1,
                reason: e.to_string(),
            })?;

        wait_for_load(&self.page, timeout).await
    }

    async fn current_url(&self) -> Result<String> {
        self.page
            .url()
            .await
            .map_err(|e| ScrapeError::Evaluation(e.to_string()))
            .map(|url| url.unwrap_or_default())
    }

    async fn is_ready(&self, condition: &ReadyCondition) -> Result<bool> {
        self.evaluate(js_templates::ready_check(condition)).await
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        self.evaluate(js_templates::count_elements(selector)).await
    }

    async fn read_fields(&self, fields: &[FieldSpec]) -> Result<Vec<Option<String>>> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        self.evaluate(js_templates::read_fields(fields)).await
    }

    async fn read_rows(&self, query: &RowQuery<'_>) -> Result<Vec<RawRow>> {
        self.evaluate(js_templates::read_rows(
            query.rows,
            query.fields,
            query.trigger,
            query.limit,
        ))
        .await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.expect_found(js_templates::click_element(selector), selector)
            .await
    }

    async fn click_in_row(&self, rows: &str, index: usize, target: &str) -> Result<()> {
        self.expect_found(js_templates::click_in_row(rows, index, target), target)
            .await
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        self.expect_found(js_templates::select_option(selector, value), selector)
            .await
    }

    async fn go_back(&self, timeout: Duration) -> Result<()> {
        let history = self
            .page
            .execute(GetNavigationHistoryParams::default())
            .await
            .map_err(|e| ScrapeError::General(format!("Failed to get navigation history: {}", e)))?;

        let current_index = history.current_index;
        if current_index <= 0 {
            return Err(ScrapeError::General(
                "No history to navigate back".to_string(),
            ));
        }

        let target_entry = history
            .entries
            .get((current_index - 1) as usize)
            .ok_or_else(|| ScrapeError::General("Invalid history entry".to_string()))?;

        self.page
            .execute(NavigateToHistoryEntryParams::new(target_entry.id))
            .await
            .map_err(|e| {
                ScrapeError::General(format!("Failed to navigate to history entry: {}", e))
            })?;

        wait_for_load(&self.page, timeout).await
    }

    async fn arm_observer(&self, filter: CaptureFilter) -> Result<RequestObserver> {
        let observer = RequestObserver::new(filter);

        let mut request_stream = self
            .page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| {
                ScrapeError::General(format!("Failed to attach network listener: {}", e))
            })?;

        let sink = observer.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = request_stream.next().await {
                let resource_type = event.r#type.as_ref().map(|t| format!("{:?}", t));
                sink.offer(&event.request.url, resource_type.as_deref());
            }
        });
        observer.track(task.abort_handle());

        if let Err(e) = self
            .evaluate::<bool>(js_templates::POPUP_RECORDER)
            .await
        {
            tracing::debug!("Popup recorder not installed: {}", e);
        }

        Ok(observer)
    }

    async fn disarm_observer(&self, observer: RequestObserver) -> Option<String> {
        observer.stop();

        // Drain even when the network already matched, so window.open is restored.
        match self.evaluate::<Vec<String>>(js_templates::POPUP_DRAIN).await {
            Ok(opened) => {
                for url in opened {
                    if observer.offer(&url, None) {
                        break;
                    }
                }
            }
            Err(e) => tracing::debug!("Popup recorder not drained: {}", e),
        }

        observer.captured()
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut failures = Vec::new();

        if let Err(e) = self.page.clone().close().await {
            failures.push(format!("page: {}", e));
        }

        if self.launched {
            if let Err(e) = self.browser.close().await {
                failures.push(format!("browser: {}", e));
            }
            if let Err(e) = self.browser.wait().await {
                failures.push(format!("browser process: {}", e));
            }
        }

        self.handler.abort();

        if let Some(dir) = self.profile_dir.take()
            && let Err(e) = std::fs::remove_dir_all(&dir)
        {
            tracing::debug!("Could not remove profile {}: {}", dir.display(), e);
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ScrapeError::Teardown(failures.join("; ")))
        }
    }
}

/// Launches (or attaches to) Chrome and opens the single page a run works on.
pub struct ChromeLauncher {
    config: Arc<Config>,
}

impl ChromeLauncher {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl SessionLauncher for ChromeLauncher {
    type Driver = ChromeSession;

    async fn open(&self) -> Result<ChromeSession> {
        let browser_config = &self.config.browser;

        let (browser, mut handler, launched, profile_dir) =
            match browser_config.remote_debugging_port {
                Some(port) => {
                    let policy = RetryPolicy::new(
                        3,
                        Duration::from_millis(ms::CONNECT_RETRY),
                    );
                    let (browser, handler) =
                        retry(policy, "browser connect", |_| connect_to_existing(port)).await?;
                    tracing::info!("Attached to Chrome on port {}", port);
                    (browser, handler, false, None)
                }
                None => {
                    let (browser, handler, profile_dir) = launch_browser(browser_config).await?;
                    tracing::info!("Launched Chrome (profile {})", profile_dir.display());
                    (browser, handler, true, Some(profile_dir))
                }
            };

        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = match open_page(&browser, browser_config).await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(e);
            }
        };

        Ok(ChromeSession {
            browser,
            page,
            handler,
            launched,
            profile_dir,
            closed: false,
        })
    }
}

async fn open_page(browser: &Browser, config: &BrowserConfig) -> Result<Page> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| ScrapeError::LaunchFailed(format!("Failed to create page: {}", e)))?;

    page.execute(NetworkEnableParams::default())
        .await
        .map_err(|e| ScrapeError::General(format!("Failed to enable Network domain: {}", e)))?;

    if let Some(ref user_agent) = config.user_agent {
        page.execute(SetUserAgentOverrideParams::new(user_agent.clone()))
            .await
            .map_err(|e| ScrapeError::General(format!("Failed to set user agent: {}", e)))?;
    }

    Ok(page)
}

async fn launch_browser(config: &BrowserConfig) -> Result<(Browser, Handler, PathBuf)> {
    let chrome_path = match config.chrome_path {
        Some(ref path) => path.clone(),
        None => crate::utils::find_chrome_executable()?,
    };

    // A fresh profile per run keeps Chrome's singleton lock out of the way.
    let profile_dir =
        std::env::temp_dir().join(format!("render-snapshot-{}", uuid::Uuid::new_v4()));

    let mut builder = LaunchConfig::builder()
        .chrome_executable(&chrome_path)
        .user_data_dir(&profile_dir)
        .request_timeout(Duration::from_secs(secs::REQUEST))
        .window_size(config.window_width, config.window_height)
        .viewport(None)
        .arg("--no-first-run")
        .arg("--disable-dev-shm-usage");

    if !config.headless {
        builder = builder.with_head();
    }

    if config.no_sandbox {
        builder = builder.no_sandbox();
    }

    let launch_config = builder.build().map_err(ScrapeError::LaunchFailed)?;

    let (browser, handler) = Browser::launch(launch_config)
        .await
        .map_err(|e| ScrapeError::LaunchFailed(e.to_string()))?;

    Ok((browser, handler, profile_dir))
}

async fn connect_to_existing(port: u16) -> Result<(Browser, Handler)> {
    let url = format!("http://127.0.0.1:{}/json/version", port);

    let response: serde_json::Value = reqwest::Client::new()
        .get(&url)
        .send()
        .await
        .map_err(|e| ScrapeError::Connection(e.to_string()))?
        .json()
        .await
        .map_err(|e| ScrapeError::Connection(e.to_string()))?;

    let ws_url = response
        .get("webSocketDebuggerUrl")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ScrapeError::Connection("No webSocketDebuggerUrl advertised".into()))?;

    let handler_config = HandlerConfig {
        request_timeout: Duration::from_secs(secs::REQUEST),
        ..Default::default()
    };

    Browser::connect_with_config(ws_url, handler_config)
        .await
        .map_err(|e| ScrapeError::Connection(e.to_string()))
}
