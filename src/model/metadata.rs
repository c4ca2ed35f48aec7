use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::model::task::Priority;
use crate::util::unicode::single_char;

/// Date format used everywhere a date is written out
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Error for a structured-control edit that cannot be applied
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: Field, value: String },
}

/// Every scalar field of the metadata record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    StartDate,
    DueDate,
    ScheduledDate,
    Priority,
    Project,
    Context,
    Recurrence,
    Status,
    Location,
    TargetFile,
}

impl Field {
    pub fn key(self) -> &'static str {
        match self {
            Field::StartDate => "startDate",
            Field::DueDate => "dueDate",
            Field::ScheduledDate => "scheduledDate",
            Field::Priority => "priority",
            Field::Project => "project",
            Field::Context => "context",
            Field::Recurrence => "recurrence",
            Field::Status => "status",
            Field::Location => "location",
            Field::TargetFile => "targetFile",
        }
    }

    pub fn as_date(self) -> Option<DateField> {
        match self {
            Field::StartDate => Some(DateField::Start),
            Field::DueDate => Some(DateField::Due),
            Field::ScheduledDate => Some(DateField::Scheduled),
            _ => None,
        }
    }

    /// Fields that survive a session reset
    pub fn is_session_scoped(self) -> bool {
        matches!(self, Field::Location | Field::TargetFile)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Field {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "startdate" | "start" => Ok(Field::StartDate),
            "duedate" | "due" => Ok(Field::DueDate),
            "scheduleddate" | "scheduled" => Ok(Field::ScheduledDate),
            "priority" => Ok(Field::Priority),
            "project" => Ok(Field::Project),
            "context" => Ok(Field::Context),
            "recurrence" | "repeat" => Ok(Field::Recurrence),
            "status" | "statusmarker" => Ok(Field::Status),
            "location" => Ok(Field::Location),
            "targetfile" | "target" => Ok(Field::TargetFile),
            _ => Err(FieldError::UnknownField(s.to_string())),
        }
    }
}

/// The three date fields a temporal phrase can land in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateField {
    Start,
    Due,
    Scheduled,
}

impl DateField {
    pub const ALL: [DateField; 3] = [DateField::Start, DateField::Due, DateField::Scheduled];

    pub fn field(self) -> Field {
        match self {
            DateField::Start => Field::StartDate,
            DateField::Due => Field::DueDate,
            DateField::Scheduled => Field::ScheduledDate,
        }
    }
}

/// Per-field pin flags. A pinned field was set through a structured control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinSet(BTreeSet<Field>);

impl PinSet {
    pub fn is_pinned(&self, field: Field) -> bool {
        self.0.contains(&field)
    }

    pub fn pin(&mut self, field: Field) {
        self.0.insert(field);
    }

    pub fn unpin(&mut self, field: Field) {
        self.0.remove(&field);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.iter().copied()
    }
}

/// Metadata found in a piece of text. Only fields actually present are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_marker: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_file: Option<String>,
}

impl PartialMetadata {
    pub fn is_empty(&self) -> bool {
        self == &PartialMetadata::default()
    }

    pub fn date(&self, field: DateField) -> Option<NaiveDate> {
        match field {
            DateField::Start => self.start_date,
            DateField::Due => self.due_date,
            DateField::Scheduled => self.scheduled_date,
        }
    }

    pub fn date_mut(&mut self, field: DateField) -> &mut Option<NaiveDate> {
        match field {
            DateField::Start => &mut self.start_date,
            DateField::Due => &mut self.due_date,
            DateField::Scheduled => &mut self.scheduled_date,
        }
    }

    /// Whether `field` carries a value
    pub fn has(&self, field: Field) -> bool {
        match field {
            Field::StartDate => self.start_date.is_some(),
            Field::DueDate => self.due_date.is_some(),
            Field::ScheduledDate => self.scheduled_date.is_some(),
            Field::Priority => self.priority.is_some(),
            Field::Project => self.project.is_some(),
            Field::Context => self.context.is_some(),
            Field::Recurrence => self.recurrence.is_some(),
            Field::Status => self.status_marker.is_some(),
            Field::TargetFile => self.target_file.is_some(),
            Field::Location => false,
        }
    }

    /// Fill every unset field from `other`. Values already present win.
    pub fn fill_missing(&mut self, other: &PartialMetadata) {
        fn fill<T: Clone>(slot: &mut Option<T>, from: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(from);
            }
        }
        fill(&mut self.start_date, &other.start_date);
        fill(&mut self.due_date, &other.due_date);
        fill(&mut self.scheduled_date, &other.scheduled_date);
        fill(&mut self.priority, &other.priority);
        fill(&mut self.project, &other.project);
        fill(&mut self.context, &other.context);
        fill(&mut self.recurrence, &other.recurrence);
        fill(&mut self.status_marker, &other.status_marker);
        fill(&mut self.target_file, &other.target_file);
    }
}

/// The canonical metadata record of one capture session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_marker: Option<char>,
    /// Labels without the `#`, deduplicated, in first-seen order
    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    pub tags: IndexSet<String>,
    /// Destination kind (e.g. `fixed`, `daily-note`); survives reset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Destination file; survives reset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_file: Option<String>,
    #[serde(default, skip_serializing_if = "PinSet::is_empty")]
    pub pinned: PinSet,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date(&self, field: DateField) -> Option<NaiveDate> {
        match field {
            DateField::Start => self.start_date,
            DateField::Due => self.due_date,
            DateField::Scheduled => self.scheduled_date,
        }
    }

    pub fn date_mut(&mut self, field: DateField) -> &mut Option<NaiveDate> {
        match field {
            DateField::Start => &mut self.start_date,
            DateField::Due => &mut self.due_date,
            DateField::Scheduled => &mut self.scheduled_date,
        }
    }

    pub fn is_pinned(&self, field: Field) -> bool {
        self.pinned.is_pinned(field)
    }

    /// Whether `field` carries a value
    pub fn has(&self, field: Field) -> bool {
        match field {
            Field::StartDate => self.start_date.is_some(),
            Field::DueDate => self.due_date.is_some(),
            Field::ScheduledDate => self.scheduled_date.is_some(),
            Field::Priority => self.priority.is_some(),
            Field::Project => self.project.is_some(),
            Field::Context => self.context.is_some(),
            Field::Recurrence => self.recurrence.is_some(),
            Field::Status => self.status_marker.is_some(),
            Field::Location => self.location.is_some(),
            Field::TargetFile => self.target_file.is_some(),
        }
    }

    /// Parse `value` for `field` and store it. An empty value clears the field.
    /// Pin flags are left alone; that is the session's job.
    pub fn set_from_str(&mut self, field: Field, value: &str) -> Result<(), FieldError> {
        // The not-started symbol is a space, so status is checked before trimming
        if field == Field::Status
            && let Some(c) = single_char(value)
        {
            self.status_marker = Some(c);
            return Ok(());
        }
        let value = value.trim();
        if value.is_empty() {
            self.clear(field);
            return Ok(());
        }
        let invalid = || FieldError::InvalidValue {
            field,
            value: value.to_string(),
        };
        match field {
            Field::StartDate | Field::DueDate | Field::ScheduledDate => {
                let date = NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| invalid())?;
                if let Some(df) = field.as_date() {
                    *self.date_mut(df) = Some(date);
                }
            }
            Field::Priority => self.priority = Some(Priority::from_name(value).ok_or_else(invalid)?),
            Field::Project => self.project = Some(value.to_string()),
            Field::Context => self.context = Some(value.to_string()),
            Field::Recurrence => self.recurrence = Some(value.to_string()),
            Field::Status => self.status_marker = Some(single_char(value).ok_or_else(invalid)?),
            Field::Location => self.location = Some(value.to_string()),
            Field::TargetFile => self.target_file = Some(value.to_string()),
        }
        Ok(())
    }

    pub fn clear(&mut self, field: Field) {
        match field {
            Field::StartDate => self.start_date = None,
            Field::DueDate => self.due_date = None,
            Field::ScheduledDate => self.scheduled_date = None,
            Field::Priority => self.priority = None,
            Field::Project => self.project = None,
            Field::Context => self.context = None,
            Field::Recurrence => self.recurrence = None,
            Field::Status => self.status_marker = None,
            Field::Location => self.location = None,
            Field::TargetFile => self.target_file = None,
        }
    }

    /// Copy one field's value from a partial scan result. Absent values are skipped.
    pub fn take_from(&mut self, partial: &PartialMetadata, field: Field) -> bool {
        if !partial.has(field) {
            return false;
        }
        match field {
            Field::StartDate => self.start_date = partial.start_date,
            Field::DueDate => self.due_date = partial.due_date,
            Field::ScheduledDate => self.scheduled_date = partial.scheduled_date,
            Field::Priority => self.priority = partial.priority,
            Field::Project => self.project.clone_from(&partial.project),
            Field::Context => self.context.clone_from(&partial.context),
            Field::Recurrence => self.recurrence.clone_from(&partial.recurrence),
            Field::Status => self.status_marker = partial.status_marker,
            Field::TargetFile => self.target_file.clone_from(&partial.target_file),
            Field::Location => return false,
        }
        true
    }

    /// Add a tag, returning false if it was already present
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim().trim_start_matches('#');
        if tag.is_empty() {
            return false;
        }
        self.tags.insert(tag.to_string())
    }

    /// Everything except the session-scoped destination fields goes back to empty
    pub fn reset_keeping_destination(&mut self) {
        let kept = MetadataRecord {
            location: self.location.take(),
            target_file: self.target_file.take(),
            ..MetadataRecord::default()
        };
        *self = kept;
    }

    /// The record as a partial, dropping tags and pins
    pub fn to_partial(&self) -> PartialMetadata {
        PartialMetadata {
            start_date: self.start_date,
            due_date: self.due_date,
            scheduled_date: self.scheduled_date,
            priority: self.priority,
            project: self.project.clone(),
            context: self.context.clone(),
            recurrence: self.recurrence.clone(),
            status_marker: self.status_marker,
            target_file: self.target_file.clone(),
        }
    }
}

impl From<PartialMetadata> for MetadataRecord {
    fn from(p: PartialMetadata) -> Self {
        MetadataRecord {
            start_date: p.start_date,
            due_date: p.due_date,
            scheduled_date: p.scheduled_date,
            priority: p.priority,
            project: p.project,
            context: p.context,
            recurrence: p.recurrence,
            status_marker: p.status_marker,
            target_file: p.target_file,
            ..MetadataRecord::default()
        }
    }
}
