use crate::ScrapeError;
use crate::scrape::paginate::PageFailure;
use crate::site::SiteConfig;
use chrono::{SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Outcome of recovering a row's modal-only detail URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetailLink {
    Resolved { url: String },
    /// The row has no trigger control.
    NotApplicable,
    /// The control disappeared between detection and click.
    TriggerMissing,
}

/// Named string fields in configured order, plus the detail link when resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SectionRecord {
    fields: Vec<(String, String)>,
    detail: Option<DetailLink>,
}

impl SectionRecord {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self {
            fields,
            detail: None,
        }
    }

    pub fn placeholder(message: impl Into<String>) -> Self {
        Self::new(vec![("error".to_string(), message.into())])
    }

    pub fn with_detail(mut self, detail: DetailLink) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn detail(&self) -> Option<&DetailLink> {
        self.detail.as_ref()
    }

    pub fn is_placeholder(&self) -> bool {
        self.fields.len() == 1 && self.fields[0].0 == "error" && self.detail.is_none()
    }
}

impl Serialize for SectionRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.fields.len() + usize::from(self.detail.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        if let Some(ref detail) = self.detail {
            map.serialize_entry("detail", detail)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceNotice {
    pub title: String,
    pub message: String,
    pub target: String,
    pub schedule: String,
    pub note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Complete,
    Partial,
    Maintenance,
    Failed,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RunOutcome::Complete => "complete",
            RunOutcome::Partial => "partial",
            RunOutcome::Maintenance => "maintenance",
            RunOutcome::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// `main`, `session`, a section name, or `section/page N`.
    pub scope: String,
    pub message: String,
}

/// Section slots in configured order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections(Vec<(String, Vec<SectionRecord>)>);

impl Sections {
    pub fn get(&self, name: &str) -> Option<&[SectionRecord]> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, records)| records.as_slice())
    }

    fn slot(&mut self, name: &str) -> &mut Vec<SectionRecord> {
        let index = match self.0.iter().position(|(key, _)| key == name) {
            Some(index) => index,
            None => {
                self.0.push((name.to_string(), Vec::new()));
                self.0.len() - 1
            }
        };
        &mut self.0[index].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[SectionRecord])> {
        self.0
            .iter()
            .map(|(name, records)| (name.as_str(), records.as_slice()))
    }
}

impl Serialize for Sections {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, records) in &self.0 {
            map.serialize_entry(name, records)?;
        }
        map.end()
    }
}

/// Everything one section produced, merged into the document as a unit.
#[derive(Debug)]
pub struct SectionOutput {
    pub name: String,
    pub records: Vec<SectionRecord>,
    /// A later page failed; earlier pages are kept.
    pub truncated: Option<PageFailure>,
    /// The section could not produce its first page.
    pub failure: Option<ScrapeError>,
}

/// The run's accumulator and its persisted form.
///
/// Every key is present from construction on, so a document persisted after
/// a fatal error has the same shape as a complete one.
#[derive(Debug, Clone, Serialize)]
pub struct ResultDocument {
    timestamp: String,
    outcome: RunOutcome,
    main: SectionRecord,
    sections: Sections,
    maintenance: Option<MaintenanceNotice>,
    errors: Vec<ErrorEntry>,
    #[serde(skip)]
    fatal: bool,
}

impl ResultDocument {
    pub fn new(site: &SiteConfig) -> Self {
        let mut sections = Sections::default();
        for name in site.section_names() {
            sections.slot(name);
        }

        Self {
            timestamp: String::new(),
            outcome: RunOutcome::Complete,
            main: SectionRecord::default(),
            sections,
            maintenance: None,
            errors: Vec::new(),
            fatal: false,
        }
    }

    pub fn set_main(&mut self, main: SectionRecord) {
        self.main = main;
    }

    pub fn merge(&mut self, output: SectionOutput) {
        let SectionOutput {
            name,
            records,
            truncated,
            failure,
        } = output;

        if let Some(PageFailure { page, error }) = truncated {
            self.note_error(format!("{}/page {}", name, page), error.to_string());
        }

        let slot = self.sections.slot(&name);
        slot.extend(records);

        if let Some(error) = failure {
            let message = error.to_string();
            slot.push(SectionRecord::placeholder(message.clone()));
            self.note_error(name, message);
        }
    }

    pub fn note_error(&mut self, scope: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ErrorEntry {
            scope: scope.into(),
            message: message.into(),
        });
    }

    pub fn enter_maintenance(&mut self, notice: MaintenanceNotice) {
        self.maintenance = Some(notice);
    }

    pub fn mark_fatal(&mut self, scope: impl Into<String>, message: impl Into<String>) {
        self.fatal = true;
        self.note_error(scope, message);
    }

    /// Stamps the document and settles its outcome. Called once, right before persisting.
    pub fn finish(&mut self) {
        self.timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.outcome = if self.fatal {
            RunOutcome::Failed
        } else if self.maintenance.is_some() {
            RunOutcome::Maintenance
        } else if !self.errors.is_empty() {
            RunOutcome::Partial
        } else {
            RunOutcome::Complete
        };
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn outcome(&self) -> RunOutcome {
        self.outcome
    }

    pub fn main(&self) -> &SectionRecord {
        &self.main
    }

    pub fn section(&self, name: &str) -> Option<&[SectionRecord]> {
        self.sections.get(name)
    }

    pub fn sections(&self) -> &Sections {
        &self.sections
    }

    pub fn maintenance(&self) -> Option<&MaintenanceNotice> {
        self.maintenance.as_ref()
    }

    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }
}
