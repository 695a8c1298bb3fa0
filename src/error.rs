use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Navigation to {url} failed after {attempts} attempt(s): {reason}")]
    Navigation {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("Navigation timeout after {0}s")]
    NavigationTimeout(u64),

    #[error("Timed out after {ms}ms waiting for {selector}")]
    Timeout { selector: String, ms: u64 },

    #[error("Element not found: {selector}")]
    NotFound { selector: String },

    #[error("Session teardown failed: {0}")]
    Teardown(String),

    #[error("JavaScript evaluation failed: {0}")]
    Evaluation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config file parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Invalid capture pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Scraping stage panicked: {0}")]
    Panicked(String),

    #[error("General error: {0}")]
    General(String),
}

impl ScrapeError {
    /// Whether the shared retry primitive may attempt the operation again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::Navigation { .. }
                | Self::NavigationTimeout(_)
                | Self::Timeout { .. }
                | Self::Evaluation(_)
        )
    }

    /// Short class label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LaunchFailed(_) | Self::Connection(_) => "session",
            Self::Navigation { .. } | Self::NavigationTimeout(_) => "navigation",
            Self::Timeout { .. } => "timeout",
            Self::NotFound { .. } => "not_found",
            Self::Teardown(_) => "teardown",
            Self::Evaluation(_) => "evaluation",
            Self::Config(_) | Self::TomlDe(_) | Self::Pattern(_) => "config",
            Self::Io(_) | Self::Json(_) => "persist",
            Self::Panicked(_) => "panic",
            Self::General(_) => "general",
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::LaunchFailed(_) => vec![
                "Ensure Chrome/Chromium is installed".into(),
                "Try specifying Chrome path with --chrome-path or CHROME_PATH".into(),
                "Set browser.no_sandbox = true when running as root in a container".into(),
            ],
            Self::Connection(_) => vec![
                "Check that Chrome is listening on browser.remote_debugging_port".into(),
                "Remove remote_debugging_port to launch a fresh browser instead".into(),
            ],
            Self::Navigation { .. } | Self::NavigationTimeout(_) => vec![
                "Increase timing.navigation_timeout_secs or pass --timeout".into(),
                "Check network connectivity".into(),
                "Verify the site URL is reachable from this host".into(),
            ],
            Self::Timeout { selector, .. } => vec![
                format!("Check if '{}' still exists on the page", selector),
                "Increase timing.ready_timeout_ms".into(),
            ],
            Self::NotFound { selector } => vec![
                "Verify the selector syntax is correct".into(),
                format!("Check if element '{}' exists on the page", selector),
            ],
            Self::Config(_) | Self::TomlDe(_) | Self::Pattern(_) => vec![
                "Check configuration file syntax".into(),
                "Run `render-snapshot config` to see the effective configuration".into(),
            ],
            _ => vec!["Run with --verbose for more details".into()],
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::LaunchFailed(_) | Self::Connection(_) => 3,
            Self::Navigation { .. } | Self::NavigationTimeout(_) => 4,
            Self::Timeout { .. } | Self::NotFound { .. } => 5,
            Self::Io(_) | Self::Json(_) => 6,
            Self::Config(_) | Self::TomlDe(_) | Self::Pattern(_) => 7,
            _ => 1,
        }
    }
}
