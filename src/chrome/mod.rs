pub mod observer;
pub mod session;
pub mod wait;

use crate::Result;
use crate::site::{FieldSpec, ReadyCondition};
use serde::Deserialize;
use std::time::Duration;

pub use observer::{CaptureFilter, RequestObserver};
pub use session::{ChromeLauncher, ChromeSession};
pub use wait::{navigate_with_retry, wait_for_ready};

/// One rendered row as read from the DOM, before field defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRow {
    pub values: Vec<Option<String>>,
    #[serde(default)]
    pub has_trigger: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct RowQuery<'a> {
    pub rows: &'a str,
    pub fields: &'a [FieldSpec],
    pub trigger: Option<&'a str>,
    pub limit: Option<usize>,
}

/// A single browser page shared by every stage of a run.
///
/// Calls are strictly sequential; cookies and in-page globals carry over from
/// one section to the next.
#[async_trait::async_trait]
pub trait PageDriver: Send + Sync {
    /// One navigation attempt; retries live in [`navigate_with_retry`].
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    async fn reload(&self, timeout: Duration) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn is_ready(&self, condition: &ReadyCondition) -> Result<bool>;

    async fn count(&self, selector: &str) -> Result<usize>;

    /// Document-scoped reads, one value per field, `None` where the element is absent.
    async fn read_fields(&self, fields: &[FieldSpec]) -> Result<Vec<Option<String>>>;

    async fn read_rows(&self, query: &RowQuery<'_>) -> Result<Vec<RawRow>>;

    async fn click(&self, selector: &str) -> Result<()>;

    /// Clicks `target` inside the `index`th match of `rows`.
    async fn click_in_row(&self, rows: &str, index: usize, target: &str) -> Result<()>;

    async fn select_option(&self, selector: &str, value: &str) -> Result<()>;

    async fn go_back(&self, timeout: Duration) -> Result<()>;

    /// Starts recording outgoing requests that pass `filter`.
    async fn arm_observer(&self, filter: CaptureFilter) -> Result<RequestObserver>;

    /// Stops recording and yields the first captured URL, if any.
    async fn disarm_observer(&self, observer: RequestObserver) -> Option<String>;

    /// Tears the session down. Must be called exactly once.
    async fn close(&mut self) -> Result<()>;
}

#[async_trait::async_trait]
pub trait SessionLauncher: Send + Sync {
    type Driver: PageDriver;

    async fn open(&self) -> Result<Self::Driver>;
}
