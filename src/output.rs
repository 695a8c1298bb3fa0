use crate::scrape::{ResultDocument, RunOutcome};
use serde::Serialize;
use std::path::Path;

pub trait OutputFormatter {
    fn format_text(&self) -> String;
    fn format_json(&self, pretty: bool) -> crate::Result<String>;
}

pub fn print_output<T: OutputFormatter>(data: &T, as_json: bool) -> crate::Result<()> {
    let output = if as_json {
        data.format_json(true)?
    } else {
        data.format_text()
    };

    println!("{}", output);
    Ok(())
}

pub fn to_json<T: Serialize>(data: &T, pretty: bool) -> crate::Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(data)?)
    } else {
        Ok(serde_json::to_string(data)?)
    }
}

pub mod text {
    use colored::Colorize;

    pub fn success(msg: &str) -> String {
        format!("{} {}", "✓".green().bold(), msg)
    }

    pub fn error(msg: &str) -> String {
        format!("{} {}", "✗".red().bold(), msg)
    }

    pub fn warning(msg: &str) -> String {
        format!("{} {}", "⚠".yellow().bold(), msg)
    }

    pub fn section(title: &str) -> String {
        format!("\n{}\n{}", title.bold(), "─".repeat(title.chars().count()))
    }

    pub fn key_value(key: &str, value: &str) -> String {
        format!("  {}: {}", key.bold(), value)
    }

    pub fn bullet(msg: &str) -> String {
        format!("  • {}", msg)
    }

    pub fn table_row(values: &[String]) -> String {
        values
            .iter()
            .map(|v| format!("{:20}", v))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", kept)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionCount {
    pub name: String,
    pub records: usize,
    pub failed: bool,
}

/// What the CLI reports after a run; the document itself is on disk.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub timestamp: String,
    pub path: String,
    pub sections: Vec<SectionCount>,
    pub errors: Vec<String>,
}

impl RunSummary {
    pub fn new(doc: &ResultDocument, path: &Path) -> Self {
        let sections = doc
            .sections()
            .iter()
            .map(|(name, records)| SectionCount {
                name: name.to_string(),
                records: records.iter().filter(|r| !r.is_placeholder()).count(),
                failed: records.iter().any(|r| r.is_placeholder()),
            })
            .collect();

        Self {
            outcome: doc.outcome(),
            timestamp: doc.timestamp().to_string(),
            path: path.display().to_string(),
            sections,
            errors: doc
                .errors()
                .iter()
                .map(|e| format!("{}: {}", e.scope, e.message))
                .collect(),
        }
    }
}

impl OutputFormatter for RunSummary {
    fn format_text(&self) -> String {
        let headline = format!("Snapshot {} ({})", self.outcome, self.path);
        let mut out = vec![match self.outcome {
            RunOutcome::Complete => text::success(&headline),
            RunOutcome::Partial | RunOutcome::Maintenance => text::warning(&headline),
            RunOutcome::Failed => text::error(&headline),
        }];
        out.push(text::key_value("Timestamp", &self.timestamp));

        if !self.sections.is_empty() {
            out.push(text::section("Sections"));
            for section in &self.sections {
                let status = if section.failed { "failed" } else { "ok" };
                out.push(format!(
                    "  {}",
                    text::table_row(&[
                        section.name.clone(),
                        format!("{} records", section.records),
                        status.to_string(),
                    ])
                ));
            }
        }

        if !self.errors.is_empty() {
            out.push(text::section("Errors"));
            out.extend(self.errors.iter().map(|e| text::bullet(&text::truncate(e, 120))));
        }

        out.join("\n")
    }

    fn format_json(&self, pretty: bool) -> crate::Result<String> {
        to_json(self, pretty)
    }
}
