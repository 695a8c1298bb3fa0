use crate::Result;
use crate::site::DetailSpec;
use regex::Regex;
use std::sync::{Arc, Mutex};
use tokio::task::AbortHandle;

/// Decides which outgoing requests count as a detail-link capture.
#[derive(Debug, Clone)]
pub struct CaptureFilter {
    pattern: Option<Regex>,
    exclude: Vec<String>,
    resource_types: Vec<String>,
}

impl CaptureFilter {
    pub fn new(pattern: Option<Regex>, exclude: Vec<String>, resource_types: Vec<String>) -> Self {
        Self {
            pattern,
            exclude,
            resource_types,
        }
    }

    pub fn from_spec(spec: &DetailSpec) -> Result<Self> {
        let pattern = spec.capture.as_deref().map(Regex::new).transpose()?;
        Ok(Self::new(
            pattern,
            spec.exclude.clone(),
            spec.resource_types.clone(),
        ))
    }

    /// `resource_type` is `None` for URLs recovered in-page (e.g. `window.open`).
    pub fn accepts(&self, url: &str, resource_type: Option<&str>) -> bool {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return false;
        }

        if let Some(res_type) = resource_type
            && !self.resource_types.is_empty()
            && !self
                .resource_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(res_type))
        {
            return false;
        }

        if self.exclude.iter().any(|e| url.contains(e.as_str())) {
            return false;
        }

        self.pattern.as_ref().is_none_or(|p| p.is_match(url))
    }
}

/// Records the first accepted request URL seen while armed.
#[derive(Debug, Clone)]
pub struct RequestObserver {
    filter: Arc<CaptureFilter>,
    captured: Arc<Mutex<Option<String>>>,
    tasks: Arc<Mutex<Vec<AbortHandle>>>,
}

impl RequestObserver {
    pub fn new(filter: CaptureFilter) -> Self {
        Self {
            filter: Arc::new(filter),
            captured: Arc::new(Mutex::new(None)),
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns true when `url` became the capture.
    pub fn offer(&self, url: &str, resource_type: Option<&str>) -> bool {
        if !self.filter.accepts(url, resource_type) {
            return false;
        }

        let Ok(mut slot) = self.captured.lock() else {
            return false;
        };
        if slot.is_some() {
            return false;
        }
        tracing::debug!("Captured detail request: {}", url);
        *slot = Some(url.to_string());
        true
    }

    pub fn captured(&self) -> Option<String> {
        self.captured.lock().ok().and_then(|slot| slot.clone())
    }

    pub fn track(&self, handle: AbortHandle) {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push(handle);
        }
    }

    pub fn stop(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for handle in tasks.drain(..) {
                handle.abort();
            }
        }
    }
}
