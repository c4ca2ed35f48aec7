use std::collections::BTreeMap;

use indexmap::IndexSet;
use tracing::debug;

use crate::io::template_io::TemplateSource;
use crate::model::format::{CaptureMode, Vocabulary};
use crate::model::metadata::{Field, FieldError, MetadataRecord, PartialMetadata};
use crate::model::task::TaskStatus;
use crate::ops::synthesize::{CaptureEngine, DocumentOutput};
use crate::util::unicode::single_char;

/// Fields free text can fill in. Location only ever comes from a control.
const TEXT_FIELDS: [Field; 9] = [
    Field::StartDate,
    Field::DueDate,
    Field::ScheduledDate,
    Field::Priority,
    Field::Project,
    Field::Context,
    Field::Recurrence,
    Field::Status,
    Field::TargetFile,
];

/// Where a field's current value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Pre-filled by the caller when the session started
    Seed,
    /// Set through a structured control; the field is pinned
    Control,
    /// Inferred from the captured text
    Text,
}

/// One input to the session reducer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    SetField { field: Field, value: String },
    ClearField(Field),
    AddTag(String),
    RemoveTag(String),
    TextChanged(String),
    SwitchMode(CaptureMode),
    Reset,
}

/// State of one capture: the buffer, the metadata record and where each
/// value came from.
///
/// Values set through a control are pinned and never replaced by text
/// inference. Values inferred from text follow the text: when the marker or
/// phrase disappears the field falls back to its seed value, or to empty.
#[derive(Debug, Clone)]
pub struct CaptureSession<'e> {
    engine: &'e CaptureEngine,
    mode: CaptureMode,
    vocabulary: Vocabulary,
    content: String,
    record: MetadataRecord,
    seed: PartialMetadata,
    sources: BTreeMap<Field, Provenance>,
    explicit_tags: IndexSet<String>,
    inferred_tags: IndexSet<String>,
}

impl<'e> CaptureSession<'e> {
    /// Empty, unpinned session in the configured default mode and vocabulary
    pub fn new(engine: &'e CaptureEngine) -> Self {
        CaptureSession {
            engine,
            mode: engine.config().default_mode,
            vocabulary: engine.config().vocabulary,
            content: String::new(),
            record: MetadataRecord::new(),
            seed: PartialMetadata::default(),
            sources: BTreeMap::new(),
            explicit_tags: IndexSet::new(),
            inferred_tags: IndexSet::new(),
        }
    }

    /// Pre-fill the record. Seeded values are not pinned; tags in the seed
    /// count as explicit tags and `location` is kept as well.
    pub fn with_seed(mut self, seed: MetadataRecord) -> Self {
        self.seed = seed.to_partial();
        for field in TEXT_FIELDS {
            if self.record.take_from(&self.seed, field) {
                self.sources.insert(field, Provenance::Seed);
            }
        }
        if seed.location.is_some() {
            self.record.location = seed.location;
            self.sources.insert(Field::Location, Provenance::Seed);
        }
        self.explicit_tags = seed.tags;
        self.refresh_tags();
        self
    }

    pub fn with_mode(mut self, mode: CaptureMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn vocabulary(&self) -> Vocabulary {
        self.vocabulary
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// The current record. Its tags are the explicit tags followed by the
    /// tags found in the text.
    pub fn record(&self) -> &MetadataRecord {
        &self.record
    }

    pub fn provenance(&self, field: Field) -> Option<Provenance> {
        self.sources.get(&field).copied()
    }

    pub fn is_pinned(&self, field: Field) -> bool {
        self.record.is_pinned(field)
    }

    /// Feed one event through the reducer
    pub fn apply(&mut self, event: CaptureEvent) -> Result<(), FieldError> {
        match event {
            CaptureEvent::SetField { field, value } => self.set_field(field, &value)?,
            CaptureEvent::ClearField(field) => self.clear_field(field),
            CaptureEvent::AddTag(tag) => self.add_tag(&tag),
            CaptureEvent::RemoveTag(tag) => self.remove_tag(&tag),
            CaptureEvent::TextChanged(text) => self.update_text(&text),
            CaptureEvent::SwitchMode(mode) => self.switch_mode(mode),
            CaptureEvent::Reset => self.reset(),
        }
        Ok(())
    }

    /// Structured-control edit: store the value and pin the field. An empty
    /// value clears and unpins it. On error nothing changes.
    pub fn set_field(&mut self, field: Field, value: &str) -> Result<(), FieldError> {
        if field == Field::Status {
            return match self.parse_status(value)? {
                Some(symbol) => {
                    self.record.status_marker = Some(symbol);
                    self.pin(field);
                    Ok(())
                }
                None => {
                    self.clear_field(field);
                    Ok(())
                }
            };
        }
        if value.trim().is_empty() {
            self.clear_field(field);
            return Ok(());
        }
        self.record.set_from_str(field, value)?;
        self.pin(field);
        Ok(())
    }

    /// Like [`set_field`](Self::set_field) with the field given by name
    /// (`due`, `dueDate`, `scheduled_date`, ...)
    pub fn set_field_str(&mut self, name: &str, value: &str) -> Result<(), FieldError> {
        self.set_field(name.parse()?, value)
    }

    /// Structured-control clear: empty the field and unpin it
    pub fn clear_field(&mut self, field: Field) {
        self.record.clear(field);
        self.record.pinned.unpin(field);
        self.sources.remove(&field);
        debug!(field = %field, "field cleared");
    }

    pub fn add_tag(&mut self, tag: &str) {
        let tag = tag.trim().trim_start_matches('#');
        if !tag.is_empty() {
            self.explicit_tags.insert(tag.to_string());
            self.refresh_tags();
        }
    }

    pub fn remove_tag(&mut self, tag: &str) {
        let tag = tag.trim().trim_start_matches('#');
        if self.explicit_tags.shift_remove(tag) {
            self.refresh_tags();
        }
    }

    /// Free-text change: re-run the scanners over the whole buffer and
    /// reconcile every unpinned field with what they found
    pub fn update_text(&mut self, text: &str) {
        self.content = text.to_string();
        let (cleaned, mut found, tags) = self.engine.extract_metadata_and_tags(text);
        // First date of each kind across all lines
        for line in cleaned.lines().filter(|l| !l.trim().is_empty()) {
            found.fill_missing(&self.engine.scan_line(line).dates());
        }

        for field in TEXT_FIELDS {
            if self.record.is_pinned(field) {
                if found.has(field) {
                    debug!(field = %field, "field is pinned, scanned value discarded");
                }
                continue;
            }
            if self.record.take_from(&found, field) {
                self.sources.insert(field, Provenance::Text);
            } else if self.provenance(field) == Some(Provenance::Text) {
                self.fall_back_to_seed(field);
            }
        }

        self.inferred_tags = tags.into_iter().collect();
        self.refresh_tags();
    }

    /// Change the output target. The record, pins and content are kept.
    pub fn switch_mode(&mut self, mode: CaptureMode) {
        if mode != self.mode {
            debug!(from = %self.mode, to = %mode, "capture mode switched");
            self.mode = mode;
        }
    }

    /// Start over for another capture. Only the destination fields survive,
    /// along with their pins.
    pub fn reset(&mut self) {
        let pinned: Vec<Field> = self
            .record
            .pinned
            .iter()
            .filter(|f| f.is_session_scoped())
            .collect();
        self.record.reset_keeping_destination();
        for field in pinned {
            self.record.pinned.pin(field);
        }
        self.sources.retain(|field, _| field.is_session_scoped());
        self.seed = PartialMetadata {
            target_file: self.seed.target_file.take(),
            ..PartialMetadata::default()
        };
        self.content.clear();
        self.explicit_tags.clear();
        self.inferred_tags.clear();
        debug!("capture session reset");
    }

    /// Text the current state would produce. Side-effect free.
    pub fn preview(&self) -> String {
        match self.mode {
            CaptureMode::InlineTask => self.engine.synthesize_inline(
                &self.content,
                &self.synthesis_record(),
                self.vocabulary,
            ),
            CaptureMode::Document => self
                .engine
                .synthesize_document(&self.content, &self.synthesis_record()),
        }
    }

    /// Final text for the current state
    pub fn submit(&self) -> String {
        let text = self.preview();
        debug!(mode = %self.mode, bytes = text.len(), "capture submitted");
        text
    }

    /// Final text, merging the content into a template when in document
    /// mode. Inline captures ignore the template.
    pub fn submit_with_template(
        &self,
        source: &dyn TemplateSource,
        template_path: &str,
    ) -> DocumentOutput {
        match self.mode {
            CaptureMode::InlineTask => DocumentOutput {
                text: self.submit(),
                template_error: None,
            },
            CaptureMode::Document => self.engine.synthesize_document_with_template(
                &self.content,
                &self.synthesis_record(),
                source,
                template_path,
            ),
        }
    }

    /// The record handed to the synthesizer: every value, with only the
    /// explicit tags. Tags written in the content stay where they are
    /// (inline) or are harvested by the engine when configured to (document).
    fn synthesis_record(&self) -> MetadataRecord {
        let mut record = self.record.clone();
        record.tags = self.explicit_tags.clone();
        record
    }

    fn pin(&mut self, field: Field) {
        self.record.pinned.pin(field);
        self.sources.insert(field, Provenance::Control);
        debug!(field = %field, "field pinned");
    }

    fn fall_back_to_seed(&mut self, field: Field) {
        if self.record.take_from(&self.seed, field) {
            self.sources.insert(field, Provenance::Seed);
        } else {
            self.record.clear(field);
            self.sources.remove(&field);
        }
    }

    fn refresh_tags(&mut self) {
        self.record.tags = self
            .explicit_tags
            .iter()
            .chain(&self.inferred_tags)
            .cloned()
            .collect();
    }

    /// A configured symbol or a status name; `None` for an empty value
    fn parse_status(&self, value: &str) -> Result<Option<char>, FieldError> {
        let invalid = || FieldError::InvalidValue {
            field: Field::Status,
            value: value.to_string(),
        };
        if let Some(symbol) = single_char(value) {
            return if self.engine.is_status_symbol(symbol) {
                Ok(Some(symbol))
            } else {
                Err(invalid())
            };
        }
        if value.trim().is_empty() {
            return Ok(None);
        }
        let status: TaskStatus = value.parse().map_err(|_| invalid())?;
        Ok(Some(self.engine.config().status.symbol(status)))
    }
}
