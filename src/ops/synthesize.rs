use chrono::NaiveDate;
use indexmap::IndexSet;
use tracing::{debug, warn};

use crate::io::template_io::{TemplateError, TemplateSource};
use crate::model::config::{CaptureConfig, ConfigError, EngineConfig};
use crate::model::format::{CaptureMode, Vocabulary};
use crate::model::metadata::{MetadataRecord, PartialMetadata};
use crate::model::task::TaskStatus;
use crate::parse::{
    DateScanner, LineScan, MarkerParser, TaskLineWriter, has_preamble, merge_template,
    preamble_lines, serialize_preamble,
};

/// Result of a document synthesis that went through an external template
#[derive(Debug)]
pub struct DocumentOutput {
    /// The document text; always starts with a preamble
    pub text: String,
    /// Set when the template could not be used and the minimal preamble
    /// was written instead
    pub template_error: Option<TemplateError>,
}

/// The synthesis engine: scanners plus serializers over one validated
/// configuration and reference date. Immutable once built; every method is
/// a pure function of its arguments.
#[derive(Debug, Clone)]
pub struct CaptureEngine {
    config: EngineConfig,
    scanner: DateScanner,
    markers: MarkerParser,
}

impl CaptureEngine {
    /// Validate `config` and build the engine. Any configuration problem is
    /// reported here rather than on first use.
    pub fn new(config: &CaptureConfig, today: NaiveDate) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        let scanner = DateScanner::new(&config.dates, today)?;
        let markers = MarkerParser::new(&config.markers)?;
        debug!(
            vocabulary = %config.vocabulary,
            default_mode = %config.default_mode,
            %today,
            "capture engine ready"
        );
        Ok(CaptureEngine {
            config,
            scanner,
            markers,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.scanner.today()
    }

    pub fn scan_line(&self, line: &str) -> LineScan {
        self.scanner.scan_line(line)
    }

    pub fn extract_metadata_and_tags(&self, text: &str) -> (String, PartialMetadata, Vec<String>) {
        self.markers.extract_metadata_and_tags(text)
    }

    /// Textual status for a status symbol; unmapped symbols read as not started
    pub fn status_text(&self, marker: Option<char>) -> &'static str {
        self.config.status.status_text(marker)
    }

    /// Whether `symbol` is a configured status symbol
    pub fn is_status_symbol(&self, symbol: char) -> bool {
        self.config.status.is_mapped(symbol)
    }

    /// Render `content` with `record` in the given mode and vocabulary.
    /// Total over every record; never fails.
    pub fn synthesize(
        &self,
        content: &str,
        record: &MetadataRecord,
        mode: CaptureMode,
        vocabulary: Vocabulary,
    ) -> String {
        match mode {
            CaptureMode::InlineTask => self.synthesize_inline(content, record, vocabulary),
            CaptureMode::Document => self.synthesize_document(content, record),
        }
    }

    /// One task line per captured line
    pub fn synthesize_inline(&self, content: &str, record: &MetadataRecord, vocabulary: Vocabulary) -> String {
        let writer = TaskLineWriter {
            scanner: &self.scanner,
            markers: &self.markers,
            marker_config: &self.config.markers,
            vocabulary,
            default_status: self.config.status.symbol(TaskStatus::NotStarted),
        };
        writer.write(content, record)
    }

    /// Prefix `content` with a preamble built from `record`. Content that
    /// already has a preamble is returned as is.
    pub fn synthesize_document(&self, content: &str, record: &MetadataRecord) -> String {
        if has_preamble(content) {
            return content.to_string();
        }
        let tags = self.document_tags(content, record);
        let lines = preamble_lines(record, self.status_text(record.status_marker), &tags);
        serialize_preamble(&lines, content)
    }

    /// Merge `content` into the template at `template_path`, then make sure
    /// the result has at least a status preamble.
    ///
    /// A template that cannot be loaded is not fatal: the content gets the
    /// minimal preamble and the error is handed back next to the text.
    pub fn synthesize_document_with_template(
        &self,
        content: &str,
        record: &MetadataRecord,
        source: &dyn TemplateSource,
        template_path: &str,
    ) -> DocumentOutput {
        let (merged, template_error) = match source.load(template_path) {
            Ok(template) => (merge_template(&template, content), None),
            Err(e) => {
                warn!(template = template_path, error = %e, "template unavailable, using minimal preamble");
                (content.to_string(), Some(e))
            }
        };
        let text = if has_preamble(&merged) {
            merged
        } else {
            self.minimal_document(&merged, record)
        };
        DocumentOutput {
            text,
            template_error,
        }
    }

    fn minimal_document(&self, content: &str, record: &MetadataRecord) -> String {
        let lines = preamble_lines(
            &MetadataRecord::new(),
            self.status_text(record.status_marker),
            &[],
        );
        serialize_preamble(&lines, content)
    }

    /// Record tags, plus the tags written in the content when configured
    fn document_tags(&self, content: &str, record: &MetadataRecord) -> Vec<String> {
        let mut tags: IndexSet<String> = record.tags.clone();
        if self.config.document.write_content_tags {
            tags.extend(self.markers.find_tags(content));
        }
        tags.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::Priority;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 14).unwrap()
    }

    fn engine() -> CaptureEngine {
        CaptureEngine::new(&CaptureConfig::default(), today()).unwrap()
    }

    struct FixedTemplate(Result<&'static str, ()>);

    impl TemplateSource for FixedTemplate {
        fn load(&self, path: &str) -> Result<String, TemplateError> {
            self.0.map(str::to_string).map_err(|_| TemplateError::NotFound {
                path: PathBuf::from(path),
            })
        }
    }

    #[test]
    fn test_invalid_config_fails_at_construction() {
        let mut config = CaptureConfig::default();
        config.capture.vocabulary = "xml".into();
        assert!(matches!(
            CaptureEngine::new(&config, today()),
            Err(ConfigError::InvalidVocabulary(_))
        ));
    }

    #[test]
    fn test_empty_document_is_status_only() {
        let out = engine().synthesize("", &MetadataRecord::new(), CaptureMode::Document, Vocabulary::Symbol);
        assert_eq!(out, "---\nstatus: \"not-started\"\n---\n\n");
    }

    #[test]
    fn test_document_with_preamble_untouched() {
        let content = "---\ntitle: x\n---\nbody";
        let mut record = MetadataRecord::new();
        record.priority = Priority::new(5);
        let out = engine().synthesize(content, &record, CaptureMode::Document, Vocabulary::Bracket);
        assert_eq!(out, content);
    }

    #[test]
    fn test_document_uses_status_mapping() {
        let mut record = MetadataRecord::new();
        record.status_marker = Some('>');
        record.project = Some("garden".into());
        let out = engine().synthesize_document("Plant beans", &record);
        assert_eq!(
            out,
            "---\nstatus: \"in-progress\"\nproject: \"garden\"\n---\n\nPlant beans"
        );

        record.status_marker = Some('k');
        let out = engine().synthesize_document("", &record);
        assert!(out.starts_with("---\nstatus: \"not-started\"\n"));
    }

    #[test]
    fn test_content_tags_only_when_enabled() {
        let mut record = MetadataRecord::new();
        record.add_tag("errand");
        let out = engine().synthesize_document("buy #milk", &record);
        assert!(out.contains("tags: [\"errand\"]"));

        let mut config = CaptureConfig::default();
        config.document.write_content_tags = true;
        let e = CaptureEngine::new(&config, today()).unwrap();
        let out = e.synthesize_document("buy #milk", &record);
        assert!(out.contains("tags: [\"errand\", \"milk\"]"));
    }

    #[test]
    fn test_template_merge() {
        let out = engine().synthesize_document_with_template(
            "Body text",
            &MetadataRecord::new(),
            &FixedTemplate(Ok("---\nkind: note\n---\n# Title\n{{CONTENT}}\n")),
            "Note",
        );
        assert!(out.template_error.is_none());
        assert_eq!(out.text, "---\nkind: note\n---\n# Title\nBody text\n");
    }

    #[test]
    fn test_template_without_preamble_gets_minimal_one() {
        let mut record = MetadataRecord::new();
        record.priority = Priority::new(2);
        let out = engine().synthesize_document_with_template(
            "Body",
            &record,
            &FixedTemplate(Ok("# Header")),
            "Note",
        );
        assert_eq!(out.text, "---\nstatus: \"not-started\"\n---\n\n# Header\n\nBody");
    }

    #[test]
    fn test_template_failure_falls_back() {
        let out = engine().synthesize_document_with_template(
            "Body",
            &MetadataRecord::new(),
            &FixedTemplate(Err(())),
            "Missing",
        );
        assert_eq!(out.text, "---\nstatus: \"not-started\"\n---\n\nBody");
        match out.template_error {
            Some(TemplateError::NotFound { path }) => assert_eq!(path, PathBuf::from("Missing")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_vocabulary_never_mixed() {
        let mut record = MetadataRecord::new();
        record.priority = Priority::new(4);
        record.project = Some("p".into());
        record.due_date = NaiveDate::from_ymd_opt(2025, 6, 1);
        let e = engine();
        let symbol = e.synthesize("a\nb tomorrow", &record, CaptureMode::InlineTask, Vocabulary::Symbol);
        assert!(!symbol.contains("::"));
        let bracket = e.synthesize("a\nb tomorrow", &record, CaptureMode::InlineTask, Vocabulary::Bracket);
        for icon in ["📅", "⏫", "#project/"] {
            assert!(!bracket.contains(icon), "{icon} in {bracket}");
        }
    }
}
