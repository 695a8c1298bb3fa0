use crate::site::SiteConfig;
use crate::{Result, ScrapeError, timeouts};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub site: SiteConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    pub chrome_path: Option<PathBuf>,
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Attach to a running Chrome on this port instead of launching one.
    pub remote_debugging_port: Option<u16>,
    /// Required when Chrome runs as root inside a container.
    #[serde(default)]
    pub no_sandbox: bool,
    pub user_agent: Option<String>,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,
    #[serde(default = "default_navigation_attempts")]
    pub navigation_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_ms: u64,
    /// Applied once a readiness condition holds.
    #[serde(default = "default_page_settle")]
    pub page_settle_ms: u64,
    /// Applied after clicks, dropdown changes and pagination.
    #[serde(default = "default_interaction_settle")]
    pub interaction_settle_ms: u64,
    /// Window in which a detail trigger is expected to fire a request.
    #[serde(default = "default_detail_settle")]
    pub detail_settle_ms: u64,
    #[serde(default = "default_back_settle")]
    pub back_settle_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
    #[serde(default = "default_json_pretty")]
    pub json_pretty: bool,
}

fn default_headless() -> bool {
    true
}
fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    800
}
fn default_navigation_timeout() -> u64 {
    timeouts::secs::NAVIGATION
}
fn default_navigation_attempts() -> u32 {
    timeouts::NAVIGATION_ATTEMPTS
}
fn default_retry_delay() -> u64 {
    timeouts::ms::RETRY_DELAY
}
fn default_ready_timeout() -> u64 {
    timeouts::ms::READY_TIMEOUT
}
fn default_page_settle() -> u64 {
    timeouts::ms::PAGE_SETTLE
}
fn default_interaction_settle() -> u64 {
    timeouts::ms::INTERACTION_SETTLE
}
fn default_detail_settle() -> u64 {
    timeouts::ms::DETAIL_SETTLE
}
fn default_back_settle() -> u64 {
    timeouts::ms::BACK_SETTLE
}
fn default_output_path() -> PathBuf {
    PathBuf::from("snapshot.json")
}
fn default_json_pretty() -> bool {
    true
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: default_headless(),
            remote_debugging_port: None,
            no_sandbox: false,
            user_agent: None,
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_secs: default_navigation_timeout(),
            navigation_attempts: default_navigation_attempts(),
            retry_delay_ms: default_retry_delay(),
            ready_timeout_ms: default_ready_timeout(),
            page_settle_ms: default_page_settle(),
            interaction_settle_ms: default_interaction_settle(),
            detail_settle_ms: default_detail_settle(),
            back_settle_ms: default_back_settle(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            json_pretty: default_json_pretty(),
        }
    }
}

impl TimingConfig {
    /// Every delay set to zero; used by tests and dry runs against fakes.
    pub fn immediate() -> Self {
        Self {
            retry_delay_ms: 0,
            ready_timeout_ms: 0,
            page_settle_ms: 0,
            interaction_settle_ms: 0,
            detail_settle_ms: 0,
            back_settle_ms: 0,
            ..Self::default()
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }

    pub fn interaction_settle(&self) -> Duration {
        Duration::from_millis(self.interaction_settle_ms)
    }

    pub fn detail_settle(&self) -> Duration {
        Duration::from_millis(self.detail_settle_ms)
    }

    pub fn back_settle(&self) -> Duration {
        Duration::from_millis(self.back_settle_ms)
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    default_config_dir().map(|p| p.join("config.toml"))
}

pub fn default_config_dir() -> Result<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .map(|p| p.join("render-snapshot"))
        .ok_or_else(|| ScrapeError::Config("Could not determine config directory".into()))
}

pub const PROJECT_CONFIG_FILE: &str = ".render-snapshot.toml";

fn read_table(path: &Path) -> Result<toml::Table> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

fn merge_table(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(nested) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_table(existing, nested);
                continue;
            }
            base.insert(key, toml::Value::Table(nested));
        } else {
            base.insert(key, value);
        }
    }
}

impl Config {
    /// Global file, then the project file, then environment overrides.
    pub fn load() -> Result<Self> {
        let mut layers = Vec::new();

        let global_path = default_config_path()?;
        if global_path.exists() {
            layers.push(read_table(&global_path)?);
        }

        let project_path = PathBuf::from(PROJECT_CONFIG_FILE);
        if project_path.exists() {
            layers.push(read_table(&project_path)?);
        }

        let mut config = Self::from_layers(layers)?;
        config.load_from_env();

        Ok(config)
    }

    /// An explicit file replaces the global and project files; env still applies.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.load_from_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn load_with_overrides(&self, cli_overrides: ConfigOverrides) -> Self {
        let mut config = self.clone();

        if let Some(headless) = cli_overrides.headless {
            config.browser.headless = headless;
        }
        if let Some(chrome_path) = cli_overrides.chrome_path {
            config.browser.chrome_path = Some(chrome_path);
        }
        if let Some(timeout) = cli_overrides.timeout {
            config.timing.navigation_timeout_secs = timeout;
        }
        if let Some(output) = cli_overrides.output {
            config.output.path = output;
        }

        config
    }

    /// Later layers win key by key; a layer with a `[site]` table replaces the site whole.
    fn from_layers(layers: impl IntoIterator<Item = toml::Table>) -> Result<Self> {
        let mut merged = toml::Table::new();
        for layer in layers {
            if layer.contains_key("site") {
                merged.remove("site");
            }
            merge_table(&mut merged, layer);
        }
        Ok(merged.try_into()?)
    }

    fn load_from_env(&mut self) {
        if let Ok(headless) = std::env::var("SNAPSHOT_HEADLESS") {
            self.browser.headless = headless == "true" || headless == "1";
        }
        if let Ok(path) = std::env::var("CHROME_PATH") {
            self.browser.chrome_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("SNAPSHOT_OUTPUT") {
            self.output.path = PathBuf::from(path);
        }
        if let Ok(timeout) = std::env::var("SNAPSHOT_TIMEOUT")
            && let Ok(timeout) = timeout.parse()
        {
            self.timing.navigation_timeout_secs = timeout;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.timing.navigation_timeout_secs == 0 {
            return Err(ScrapeError::Config(
                "navigation_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.timing.navigation_attempts == 0 {
            return Err(ScrapeError::Config(
                "navigation_attempts must be at least 1".into(),
            ));
        }

        if let Some(port) = self.browser.remote_debugging_port
            && port < 1024
        {
            return Err(ScrapeError::Config(format!(
                "remote_debugging_port {} is out of range (1024-65535)",
                port
            )));
        }

        if let Some(ref path) = self.browser.chrome_path
            && !path.exists()
        {
            return Err(ScrapeError::Config(format!(
                "Chrome path does not exist: {}",
                path.display()
            )));
        }

        if self.output.path.as_os_str().is_empty() {
            return Err(ScrapeError::Config("output.path must not be empty".into()));
        }

        self.site.validate()
    }

    pub fn summary(&self) -> String {
        let sections = self
            .site
            .sections
            .iter()
            .map(|s| {
                format!(
                    "  - {} ({}; pages: {}; detail: {})",
                    s.name,
                    self.site.section_url(s),
                    s.max_pages(),
                    if s.detail.is_some() { "yes" } else { "no" }
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"Browser:
  Chrome Path: {}
  Headless: {}
  Remote Port: {}

Timing:
  Navigation Timeout: {}s x {} attempt(s)
  Ready Timeout: {}ms
  Settle: page {}ms, interaction {}ms, detail {}ms

Output:
  Path: {}

Site:
  Landing: {}
  Maintenance Marker: {}
  Summary Fields: {}
Sections:
{}
"#,
            self.browser
                .chrome_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "auto-detect".into()),
            self.browser.headless,
            self.browser
                .remote_debugging_port
                .map(|p| p.to_string())
                .unwrap_or_else(|| "launch".into()),
            self.timing.navigation_timeout_secs,
            self.timing.navigation_attempts,
            self.timing.ready_timeout_ms,
            self.timing.page_settle_ms,
            self.timing.interaction_settle_ms,
            self.timing.detail_settle_ms,
            self.output.path.display(),
            self.site.landing_url,
            self.site
                .maintenance
                .as_ref()
                .map(|m| m.marker.as_str())
                .unwrap_or("none"),
            self.site.summary.len(),
            if sections.is_empty() {
                "  (none)".to_string()
            } else {
                sections
            },
        )
    }
}

#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub headless: Option<bool>,
    pub chrome_path: Option<PathBuf>,
    pub timeout: Option<u64>,
    pub output: Option<PathBuf>,
}
