//! Site definitions: which pages to visit and how their DOM maps onto records.
//!
//! Everything here is configuration. The pipeline never hard-codes a selector
//! or a column layout, because target markup drifts between releases of a site.

use crate::{Result, ScrapeError, timeouts};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SiteConfig {
    #[serde(default)]
    pub landing_url: String,
    /// Awaited on the landing page after maintenance classification.
    #[serde(default)]
    pub landing_ready: Option<ReadyCondition>,
    /// Single-value fields read from the landing page into the `main` block.
    #[serde(default)]
    pub summary: Vec<FieldSpec>,
    #[serde(default)]
    pub maintenance: Option<MaintenanceSpec>,
    #[serde(default)]
    pub sections: Vec<SectionSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    /// At least one element matches.
    #[default]
    Present,
    /// The first match has at least one child element.
    Populated,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReadyCondition {
    pub selector: String,
    #[serde(default)]
    pub state: ReadyState,
}

impl ReadyCondition {
    pub fn present(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            state: ReadyState::Present,
        }
    }

    pub fn populated(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            state: ReadyState::Populated,
        }
    }
}

/// Locates one value relative to a row (or to the document for summary fields).
///
/// Resolution order: `cell` picks `row.cells[i]`, then `selector` is queried
/// inside it, then `attribute` is read. Without an attribute the text content
/// is used. `href` and `src` resolve to absolute URLs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub cell: Option<usize>,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub attribute: Option<String>,
    /// Used when the element is missing or its value is blank.
    #[serde(default)]
    pub default: Option<String>,
}

impl FieldSpec {
    pub fn cell(name: impl Into<String>, cell: usize) -> Self {
        Self {
            name: name.into(),
            cell: Some(cell),
            selector: None,
            attribute: None,
            default: None,
        }
    }

    pub fn selector(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cell: None,
            selector: Some(selector.into()),
            attribute: None,
            default: None,
        }
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Trims the raw value and substitutes the default for missing or blank input.
    pub fn resolve(&self, raw: Option<&str>) -> String {
        match raw.map(str::trim) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => self.default.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum PrepareAction {
    Click { selector: String },
    Select { selector: String, value: String },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaginationSpec {
    /// Selector template for the control leading to page N; `{page}` is replaced.
    pub next: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl PaginationSpec {
    pub fn next_selector(&self, page: usize) -> String {
        self.next.replace("{page}", &page.to_string())
    }
}

fn default_max_pages() -> usize {
    timeouts::MAX_PAGES
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetailSpec {
    /// Control inside a row that opens the detail modal or popup.
    pub trigger: String,
    /// Regex an intercepted URL must match.
    #[serde(default)]
    pub capture: Option<String>,
    /// URL substrings that are never captured (the listing routes themselves).
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default = "default_resource_types")]
    pub resource_types: Vec<String>,
}

fn default_resource_types() -> Vec<String> {
    vec!["Document".to_string()]
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SectionSpec {
    pub name: String,
    /// Page hosting the listing; the landing page when absent.
    #[serde(default)]
    pub url: Option<String>,
    /// Selector matching one element per record.
    pub rows: String,
    /// Defaults to "rows present".
    #[serde(default)]
    pub ready: Option<ReadyCondition>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub max_rows: Option<usize>,
    #[serde(default = "default_ready_attempts")]
    pub ready_attempts: u32,
    #[serde(default)]
    pub prepare: Vec<PrepareAction>,
    #[serde(default)]
    pub pagination: Option<PaginationSpec>,
    #[serde(default)]
    pub detail: Option<DetailSpec>,
}

fn default_ready_attempts() -> u32 {
    1
}

impl SectionSpec {
    pub fn ready_condition(&self) -> ReadyCondition {
        self.ready
            .clone()
            .unwrap_or_else(|| ReadyCondition::present(self.rows.clone()))
    }

    pub fn max_pages(&self) -> usize {
        self.pagination.as_ref().map(|p| p.max_pages).unwrap_or(1)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MaintenanceSpec {
    /// Banner element that only exists on the maintenance rendering.
    pub marker: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default = "default_maintenance_title")]
    pub default_title: String,
    #[serde(default = "default_maintenance_schedule")]
    pub default_schedule: String,
}

fn default_maintenance_title() -> String {
    "System maintenance".to_string()
}

fn default_maintenance_schedule() -> String {
    "unknown".to_string()
}

impl MaintenanceSpec {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            title: None,
            message: None,
            target: None,
            schedule: None,
            note: None,
            default_title: default_maintenance_title(),
            default_schedule: default_maintenance_schedule(),
        }
    }

    /// Notice fields in document order. Fields without a selector read as missing.
    pub fn fields(&self) -> Vec<FieldSpec> {
        let field = |name: &str, selector: &Option<String>, default: Option<&String>| FieldSpec {
            name: name.to_string(),
            cell: None,
            selector: selector.clone(),
            attribute: None,
            default: default.cloned(),
        };

        vec![
            field("title", &self.title, Some(&self.default_title)),
            field("message", &self.message, None),
            field("target", &self.target, None),
            field("schedule", &self.schedule, Some(&self.default_schedule)),
            field("note", &self.note, None),
        ]
    }
}

impl SiteConfig {
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    /// The page a section lives on.
    pub fn section_url<'a>(&'a self, section: &'a SectionSpec) -> &'a str {
        section.url.as_deref().unwrap_or(&self.landing_url)
    }

    pub fn validate(&self) -> Result<()> {
        if self.landing_url.trim().is_empty() {
            return Err(ScrapeError::Config("site.landing_url is required".into()));
        }
        check_url("site.landing_url", &self.landing_url)?;

        let mut seen = HashSet::new();
        for section in &self.sections {
            if section.name.trim().is_empty() {
                return Err(ScrapeError::Config("every section needs a name".into()));
            }
            if !seen.insert(section.name.as_str()) {
                return Err(ScrapeError::Config(format!(
                    "duplicate section name: {}",
                    section.name
                )));
            }
            if section.rows.trim().is_empty() {
                return Err(ScrapeError::Config(format!(
                    "section '{}' has no row selector",
                    section.name
                )));
            }
            if let Some(ref url) = section.url {
                check_url(&format!("section '{}' url", section.name), url)?;
            }
            if section.ready_attempts == 0 {
                return Err(ScrapeError::Config(format!(
                    "section '{}': ready_attempts must be at least 1",
                    section.name
                )));
            }
            if let Some(ref pagination) = section.pagination {
                if !pagination.next.contains("{page}") {
                    return Err(ScrapeError::Config(format!(
                        "section '{}': pagination.next must contain {{page}}",
                        section.name
                    )));
                }
                if pagination.max_pages == 0 {
                    return Err(ScrapeError::Config(format!(
                        "section '{}': pagination.max_pages must be greater than 0",
                        section.name
                    )));
                }
            }
            if let Some(ref detail) = section.detail
                && let Some(ref pattern) = detail.capture
            {
                regex::Regex::new(pattern)?;
            }
        }

        Ok(())
    }
}

fn check_url(what: &str, raw: &str) -> Result<()> {
    Url::parse(raw)
        .map(|_| ())
        .map_err(|e| ScrapeError::Config(format!("{} is not a valid URL ({}): {}", what, e, raw)))
}
