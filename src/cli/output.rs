use chrono::NaiveDate;
use serde::Serialize;

use crate::io::template_io::TemplateError;
use crate::model::format::{CaptureMode, Vocabulary};
use crate::model::metadata::{DATE_FORMAT, DateField, MetadataRecord, PartialMetadata};
use crate::parse::LineScan;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct CaptureJson<'a> {
    pub mode: CaptureMode,
    pub vocabulary: Vocabulary,
    pub text: &'a str,
    pub record: &'a MetadataRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_error: Option<TemplateErrorJson>,
}

#[derive(Serialize)]
pub struct TemplateErrorJson {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
}

impl From<&TemplateError> for TemplateErrorJson {
    fn from(e: &TemplateError) -> Self {
        let kind = match e {
            TemplateError::NotConfigured => "not-configured",
            TemplateError::NotFound { .. } => "not-found",
            TemplateError::Unreadable { .. } => "unreadable",
        };
        TemplateErrorJson {
            kind,
            path: e.path().map(|p| p.display().to_string()),
            message: e.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanJson<'a> {
    pub cleaned_line: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDate>,
}

impl<'a> From<&'a LineScan> for ScanJson<'a> {
    fn from(scan: &'a LineScan) -> Self {
        ScanJson {
            cleaned_line: &scan.cleaned_line,
            start_date: scan.start_date,
            due_date: scan.due_date,
            scheduled_date: scan.scheduled_date,
        }
    }
}

#[derive(Serialize)]
pub struct ExtractJson<'a> {
    pub cleaned: &'a str,
    pub metadata: &'a PartialMetadata,
    pub tags: &'a [String],
}

#[derive(Serialize)]
pub struct ModeJson {
    pub mode: CaptureMode,
    pub config: String,
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn date_label(field: DateField) -> &'static str {
    match field {
        DateField::Start => "start",
        DateField::Due => "due",
        DateField::Scheduled => "scheduled",
    }
}

/// Format a scan result: the cleaned line, then one line per date found
pub fn format_scan(scan: &LineScan) -> Vec<String> {
    let mut lines = vec![scan.cleaned_line.clone()];
    for field in DateField::ALL {
        if let Some(date) = scan.date(field) {
            lines.push(format!("{}: {}", date_label(field), date.format(DATE_FORMAT)));
        }
    }
    lines
}

/// Format extracted metadata as `key: value` lines, tags last
pub fn format_extracted(metadata: &PartialMetadata, tags: &[String]) -> Vec<String> {
    let mut lines = Vec::new();
    for field in DateField::ALL {
        if let Some(date) = metadata.date(field) {
            lines.push(format!("{}: {}", date_label(field), date.format(DATE_FORMAT)));
        }
    }
    if let Some(p) = metadata.priority {
        lines.push(format!("priority: {} ({})", p.level(), p.name()));
    }
    let labels = [
        ("project", &metadata.project),
        ("context", &metadata.context),
        ("repeat", &metadata.recurrence),
        ("target", &metadata.target_file),
    ];
    for (key, value) in labels {
        if let Some(value) = value {
            lines.push(format!("{}: {}", key, value));
        }
    }
    if let Some(status) = metadata.status_marker {
        lines.push(format!("status: [{}]", status));
    }
    if !tags.is_empty() {
        lines.push(format!(
            "tags: {}",
            tags.iter()
                .map(|t| format!("#{}", t))
                .collect::<Vec<_>>()
                .join(" ")
        ));
    }
    lines
}
