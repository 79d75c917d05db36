//! Report rendering with Handlebars template engine
//!
//! Renders a [`Report`] as a Markdown table or pretty JSON and writes it to
//! stdout or a file.

use handlebars::Handlebars;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

use super::{Outcome, Report, ReportFormat, ReportRow};
use crate::error::Result;

/// Default report template
const DEFAULT_TEMPLATE: &str = include_str!("../../templates/report.hbs");

const EMPTY_CELL: &str = "-";

/// Template data for the whole report
#[derive(Debug, Serialize)]
struct ReportTemplateData {
    backend: String,
    generated_at: String,
    extended: bool,
    rows: Vec<RowTemplateData>,
}

/// Template data for one table row; every cell is pre-escaped
#[derive(Debug, Serialize)]
struct RowTemplateData {
    entity: String,
    sentiment: String,
    tone_and_style: String,
    emotion: String,
    intent: String,
    stance: String,
}

impl From<&ReportRow> for RowTemplateData {
    fn from(row: &ReportRow) -> Self {
        let cell = |value: Option<String>| {
            value
                .map(|v| escape_cell(&v))
                .unwrap_or_else(|| EMPTY_CELL.to_string())
        };

        match &row.outcome {
            Outcome::Classified(result) => Self {
                entity: escape_cell(&row.entity),
                sentiment: escape_cell(result.sentiment.as_str()),
                tone_and_style: cell(result.tone_and_style.map(|t| t.to_string())),
                emotion: cell(result.emotion.map(|e| e.to_string())),
                intent: cell(result.intent.clone()),
                stance: cell(result.stance.map(|s| s.to_string())),
            },
            Outcome::Unclassified { reason } => Self {
                entity: escape_cell(&row.entity),
                sentiment: escape_cell(&format!("Unclassified ({reason})")),
                tone_and_style: EMPTY_CELL.to_string(),
                emotion: EMPTY_CELL.to_string(),
                intent: EMPTY_CELL.to_string(),
                stance: EMPTY_CELL.to_string(),
            },
        }
    }
}

impl From<&Report> for ReportTemplateData {
    fn from(report: &Report) -> Self {
        Self {
            backend: report.backend.clone(),
            generated_at: report.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            extended: report.has_extended_fields(),
            rows: report.rows.iter().map(RowTemplateData::from).collect(),
        }
    }
}

/// Report writer with Handlebars template engine
pub struct ReportWriter<'a> {
    handlebars: Handlebars<'a>,
}

impl<'a> ReportWriter<'a> {
    /// Create a new ReportWriter with the built-in template
    pub fn new() -> Result<Self> {
        Self::from_template(DEFAULT_TEMPLATE)
    }

    fn from_template(template: &str) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.register_template_string("report", template)?;

        Ok(Self { handlebars })
    }

    /// Render report to a Markdown string
    pub fn render_markdown(&self, report: &Report) -> Result<String> {
        let data = ReportTemplateData::from(report);
        Ok(self.handlebars.render("report", &data)?)
    }

    /// Render report to pretty JSON
    pub fn render_json(&self, report: &Report) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }

    /// Render in the requested format
    pub fn render(&self, report: &Report, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Markdown => self.render_markdown(report),
            ReportFormat::Json => self.render_json(report),
        }
    }

    /// Render and write to `path`, or to stdout when `path` is `None`
    pub fn write(&self, report: &Report, format: ReportFormat, path: Option<&Path>) -> Result<()> {
        let rendered = self.render(report, format)?;

        match path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, rendered)?;
                tracing::info!(path = %path.display(), format = %format, "Report written");
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(rendered.as_bytes())?;
                if !rendered.ends_with('\n') {
                    stdout.write_all(b"\n")?;
                }
                stdout.flush()?;
            }
        }

        Ok(())
    }
}

/// Make a value safe to place inside a Markdown table cell
fn escape_cell(value: &str) -> String {
    value
        .replace('|', "\\|")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
