use chrono::NaiveDate;

use crate::model::config::MarkerConfig;
use crate::model::format::Vocabulary;
use crate::model::metadata::{DATE_FORMAT, DateField, MetadataRecord, PartialMetadata};
use crate::model::task::Priority;
use crate::parse::date_scanner::{DateScanner, LineScan};
use crate::parse::marker_parser::MarkerParser;
use crate::util::unicode::leading_indent;

const DATE_ICONS: [&str; 6] = ["🛫", "📅", "⏳", "✅", "➕", "❌"];
const VALUE_ICONS: [&str; 2] = ["📁", "🔁"];

/// Render the metadata suffix of a task line.
///
/// Fields are written in a fixed order (start, due, scheduled, priority,
/// project, context, recurrence) in exactly one vocabulary. Absent fields
/// are skipped; an empty string means nothing to write. In the symbol
/// vocabulary whitespace inside a project or context becomes `-`, since a
/// `#project/x` or `@x` marker ends at the first space.
pub fn metadata_suffix(meta: &PartialMetadata, vocabulary: Vocabulary, markers: &MarkerConfig) -> String {
    let mut parts = Vec::new();

    for (field, icon, key) in [
        (DateField::Start, "🛫", "start"),
        (DateField::Due, "📅", "due"),
        (DateField::Scheduled, "⏳", "scheduled"),
    ] {
        if let Some(date) = meta.date(field) {
            let date = date.format(DATE_FORMAT);
            parts.push(match vocabulary {
                Vocabulary::Symbol => format!("{icon} {date}"),
                Vocabulary::Bracket => format!("[{key}:: {date}]"),
            });
        }
    }

    if let Some(priority) = meta.priority {
        parts.push(match vocabulary {
            Vocabulary::Symbol => priority.icon().to_string(),
            Vocabulary::Bracket => format!("[priority:: {}]", priority.name()),
        });
    }

    if let Some(ref project) = meta.project {
        parts.push(match vocabulary {
            Vocabulary::Symbol => format!("#{}/{}", markers.project_prefix, hyphenate(project)),
            Vocabulary::Bracket => format!("[{}:: {}]", markers.project_prefix, project),
        });
    }

    if let Some(ref context) = meta.context {
        parts.push(match vocabulary {
            Vocabulary::Symbol => format!("{}{}", markers.context_prefix, hyphenate(context)),
            Vocabulary::Bracket => format!("[context:: {}]", context),
        });
    }

    if let Some(ref rule) = meta.recurrence {
        parts.push(match vocabulary {
            Vocabulary::Symbol => format!("🔁 {rule}"),
            Vocabulary::Bracket => format!("[repeat:: {rule}]"),
        });
    }

    parts.join(" ")
}

fn hyphenate(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Drop stand-alone shorthand a user may type while capturing: runs of `!`
/// or `~`, a lone priority icon, and a value icon with no value after it.
pub fn clean_transient_marks(text: &str) -> String {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut kept = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        let next = tokens.get(i + 1).copied();
        if !is_transient(token, next) {
            kept.push(*token);
        }
    }
    kept.join(" ")
}

fn is_transient(token: &str, next: Option<&str>) -> bool {
    if token.chars().all(|c| c == '!') || token.chars().all(|c| c == '~') {
        return true;
    }
    let icon = token.trim_end_matches('\u{fe0f}');
    if Priority::from_icon(icon).is_some() {
        return true;
    }
    if DATE_ICONS.contains(&icon) {
        return !next.is_some_and(|n| NaiveDate::parse_from_str(n, DATE_FORMAT).is_ok());
    }
    if VALUE_ICONS.contains(&icon) {
        return next.is_none_or(|n| {
            let n = n.trim_end_matches('\u{fe0f}');
            DATE_ICONS.contains(&n) || VALUE_ICONS.contains(&n) || Priority::from_icon(n).is_some()
        });
    }
    false
}

/// `- [x] rest`, `1. [ ] rest`
fn split_checkbox(line: &str) -> Option<(&str, char, &str)> {
    let (prefix, rest) = split_list_prefix(line)?;
    let rest = rest.strip_prefix('[')?;
    let mut chars = rest.chars();
    let status = chars.next()?;
    let rest = chars.as_str().strip_prefix(']')?;
    if status == '[' || status == ']' {
        return None;
    }
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((prefix, status, rest.trim_start()))
}

/// `- rest`, `* rest`, `+ rest`, `12. rest`, `3) rest`
fn split_list_prefix(line: &str) -> Option<(&str, &str)> {
    let marker_len = if line.starts_with(['-', '*', '+']) {
        1
    } else {
        let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 || !line[digits..].starts_with(['.', ')']) {
            return None;
        }
        digits + 1
    };
    let rest = &line[marker_len..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((&line[..marker_len], rest.trim_start()))
}

/// Writes captured lines as task lines
pub struct TaskLineWriter<'a> {
    pub scanner: &'a DateScanner,
    pub markers: &'a MarkerParser,
    pub marker_config: &'a MarkerConfig,
    pub vocabulary: Vocabulary,
    /// Status written when the record has none
    pub default_status: char,
}

impl TaskLineWriter<'_> {
    /// Convert every line of `content`. Blank lines pass through, indented
    /// lines are sub-items and only lose transient marks, everything else
    /// becomes a task line carrying the record's metadata.
    pub fn write(&self, content: &str, record: &MetadataRecord) -> String {
        let in_content = self.markers.find_tags(content);
        let control_tags: Vec<&str> = record
            .tags
            .iter()
            .filter(|t| !in_content.contains(*t))
            .map(String::as_str)
            .collect();

        content
            .split('\n')
            .map(|line| self.write_line(line, record, &control_tags))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn write_line(&self, line: &str, record: &MetadataRecord, control_tags: &[&str]) -> String {
        if line.trim().is_empty() {
            return line.to_string();
        }
        let scan = self.scanner.scan_line(line);

        let indent = leading_indent(line);
        if !indent.is_empty() {
            let body = clean_transient_marks(scan.cleaned_line.trim());
            if body.is_empty() {
                return String::new();
            }
            return format!("{indent}{body}");
        }

        let cleaned = scan.cleaned_line.trim_end();
        if split_checkbox(cleaned).is_some() {
            return self.finish_checkbox_line(cleaned, &scan, record, control_tags);
        }

        let (prefix, rest) = split_list_prefix(cleaned).unwrap_or(("-", cleaned));
        let (body, local) = self.markers.extract_line(rest);
        let body = clean_transient_marks(&body);

        let mut fields = local;
        fields.fill_missing(&scan.dates());
        fields.fill_missing(&record.to_partial());

        let status = record.status_marker.unwrap_or(self.default_status);
        let mut parts = vec![format!("{prefix} [{status}]")];
        if !body.is_empty() {
            parts.push(body);
        }
        self.push_suffix(&mut parts, &fields, control_tags);
        parts.join(" ")
    }

    /// An existing checkbox line keeps its text; only fields it does not
    /// already carry are appended
    fn finish_checkbox_line(
        &self,
        line: &str,
        scan: &LineScan,
        record: &MetadataRecord,
        control_tags: &[&str],
    ) -> String {
        let (_, present) = self.markers.extract_line(line);

        let mut fields = scan.dates();
        fields.fill_missing(&record.to_partial());
        for field in DateField::ALL {
            if present.date(field).is_some() {
                *fields.date_mut(field) = None;
            }
        }
        if present.priority.is_some() {
            fields.priority = None;
        }
        if present.project.is_some() {
            fields.project = None;
        }
        if present.context.is_some() {
            fields.context = None;
        }
        if present.recurrence.is_some() {
            fields.recurrence = None;
        }

        let mut parts = vec![line.to_string()];
        self.push_suffix(&mut parts, &fields, control_tags);
        parts.join(" ")
    }

    fn push_suffix(&self, parts: &mut Vec<String>, fields: &PartialMetadata, control_tags: &[&str]) {
        let suffix = metadata_suffix(fields, self.vocabulary, self.marker_config);
        if !suffix.is_empty() {
            parts.push(suffix);
        }
        parts.extend(control_tags.iter().map(|t| format!("#{t}")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::CaptureConfig;
    use pretty_assertions::assert_eq;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 14).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn write(content: &str, record: &MetadataRecord, vocabulary: Vocabulary) -> String {
        let engine = CaptureConfig::default().validate().unwrap();
        let scanner = DateScanner::new(&engine.dates, today()).unwrap();
        let markers = MarkerParser::new(&engine.markers).unwrap();
        let writer = TaskLineWriter {
            scanner: &scanner,
            markers: &markers,
            marker_config: &engine.markers,
            vocabulary,
            default_status: ' ',
        };
        writer.write(content, record)
    }

    #[test]
    fn test_symbol_values_with_spaces_survive_extraction() {
        let meta = PartialMetadata {
            project: Some("my garden".into()),
            context: Some("back  office".into()),
            ..Default::default()
        };
        let suffix = metadata_suffix(&meta, Vocabulary::Symbol, &MarkerConfig::default());
        assert_eq!(suffix, "#project/my-garden @back-office");

        let markers = MarkerParser::new(&MarkerConfig::default()).unwrap();
        let (cleaned, found, _) = markers.extract_metadata_and_tags(&format!("water {suffix}"));
        assert_eq!(cleaned, "water");
        assert_eq!(found.project.as_deref(), Some("my-garden"));
        assert_eq!(found.context.as_deref(), Some("back-office"));

        let bracket = metadata_suffix(&meta, Vocabulary::Bracket, &MarkerConfig::default());
        assert_eq!(bracket, "[project:: my garden] [context:: back  office]");
    }

    fn full() -> PartialMetadata {
        PartialMetadata {
            start_date: Some(date("2025-05-01")),
            due_date: Some(date("2025-05-14")),
            scheduled_date: Some(date("2025-05-10")),
            priority: Priority::new(4),
            project: Some("garden".into()),
            context: Some("home".into()),
            recurrence: Some("every week".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_symbol_suffix_order() {
        let suffix = metadata_suffix(&full(), Vocabulary::Symbol, &MarkerConfig::default());
        assert_eq!(
            suffix,
            "🛫 2025-05-01 📅 2025-05-14 ⏳ 2025-05-10 ⏫ #project/garden @home 🔁 every week"
        );
    }

    #[test]
    fn test_bracket_suffix_order() {
        let suffix = metadata_suffix(&full(), Vocabulary::Bracket, &MarkerConfig::default());
        assert_eq!(
            suffix,
            "[start:: 2025-05-01] [due:: 2025-05-14] [scheduled:: 2025-05-10] [priority:: high] [project:: garden] [context:: home] [repeat:: every week]"
        );
    }

    #[test]
    fn test_empty_suffix() {
        let suffix = metadata_suffix(&PartialMetadata::default(), Vocabulary::Symbol, &MarkerConfig::default());
        assert_eq!(suffix, "");
    }

    #[test]
    fn test_clean_transient_marks() {
        assert_eq!(clean_transient_marks("call ! back ~ now"), "call back now");
        assert_eq!(clean_transient_marks("urgent 🔺 fix"), "urgent fix");
        assert_eq!(clean_transient_marks("pay 📅 later"), "pay later");
        assert_eq!(clean_transient_marks("pay 📅 2025-01-01"), "pay 📅 2025-01-01");
        assert_eq!(clean_transient_marks("file 📁"), "file");
        assert_eq!(clean_transient_marks("Hello! world"), "Hello! world");
    }

    #[test]
    fn test_split_checkbox() {
        assert_eq!(split_checkbox("- [ ] Buy milk"), Some(("-", ' ', "Buy milk")));
        assert_eq!(split_checkbox("12. [x] Done"), Some(("12.", 'x', "Done")));
        assert_eq!(split_checkbox("- [due:: 2025-01-01] x"), None);
        assert_eq!(split_checkbox("-[ ] tight"), None);
        assert_eq!(split_checkbox("plain"), None);
    }

    #[test]
    fn test_checkbox_line_without_metadata_unchanged() {
        let out = write("- [ ] Buy milk", &MetadataRecord::new(), Vocabulary::Symbol);
        assert_eq!(out, "- [ ] Buy milk");
    }

    #[test]
    fn test_plain_line_gets_checkbox_and_priority() {
        let mut record = MetadataRecord::new();
        record.priority = Priority::new(3);
        let out = write("Call mom", &record, Vocabulary::Symbol);
        assert_eq!(out, "- [ ] Call mom 🔼");
    }

    #[test]
    fn test_list_item_converted() {
        let mut record = MetadataRecord::new();
        record.status_marker = Some('/');
        let out = write("* Water plants !", &record, Vocabulary::Symbol);
        assert_eq!(out, "* [/] Water plants");
    }

    #[test]
    fn test_line_dates_override_record() {
        let mut record = MetadataRecord::new();
        record.due_date = Some(date("2025-06-30"));
        let out = write("Pay rent tomorrow\nWater plants", &record, Vocabulary::Bracket);
        assert_eq!(
            out,
            "- [ ] Pay rent [due:: 2025-05-15]\n- [ ] Water plants [due:: 2025-06-30]"
        );
    }

    #[test]
    fn test_sub_items_get_no_metadata() {
        let mut record = MetadataRecord::new();
        record.priority = Priority::new(5);
        let out = write("Trip\n  - pack bags ! 🔺\n\n  - book hotel", &record, Vocabulary::Symbol);
        insta::assert_snapshot!(out, @r"
        - [ ] Trip 🔺
          - pack bags

          - book hotel
        ");
    }

    #[test]
    fn test_line_markers_are_local() {
        let out = write(
            "Urgent thing ⏫ #project/work\nOther thing",
            &MetadataRecord::new(),
            Vocabulary::Bracket,
        );
        assert_eq!(
            out,
            "- [ ] Urgent thing [priority:: high] [project:: work]\n- [ ] Other thing"
        );
    }

    #[test]
    fn test_checkbox_line_only_gets_missing_fields() {
        let mut record = MetadataRecord::new();
        record.priority = Priority::new(3);
        record.project = Some("home".into());
        let out = write("- [x] Fix sink 🔽", &record, Vocabulary::Symbol);
        assert_eq!(out, "- [x] Fix sink 🔽 #project/home");
    }

    #[test]
    fn test_control_tags_appended_once() {
        let mut record = MetadataRecord::new();
        record.add_tag("errand");
        record.add_tag("home");
        let out = write("Buy milk #home", &record, Vocabulary::Symbol);
        assert_eq!(out, "- [ ] Buy milk #home #errand");
    }

    #[test]
    fn test_rewriting_output_is_stable() {
        let mut record = MetadataRecord::new();
        record.priority = Priority::new(2);
        record.context = Some("desk".into());
        record.add_tag("admin");
        for vocabulary in [Vocabulary::Symbol, Vocabulary::Bracket] {
            let once = write("File taxes by next week\n  - find receipts\nCall bank", &record, vocabulary);
            let twice = write(&once, &record, vocabulary);
            assert_eq!(twice, once);
        }
    }
}
