use chrono::NaiveDate;
use indexmap::IndexSet;
use regex::{Captures, Regex};
use tracing::debug;

use crate::model::config::{ConfigError, MarkerConfig};
use crate::model::metadata::{DATE_FORMAT, DateField, PartialMetadata};
use crate::model::task::Priority;
use crate::parse::tidy_line;
use crate::util::unicode::leading_indent;

/// Removing one marker can expose another (`x🔼#tag` becomes `x #tag`),
/// so a line is re-scanned until nothing changes
const MAX_PASSES: usize = 8;

const CHECKBOX: &str = r"^(?:[-*+]|\d+[.)])\s+\[([^\[\]])\]\s*";
const BRACKET_FIELD: &str = r"\[\s*([A-Za-z][\w-]*)\s*::\s*([^\[\]\n]*?)\s*\]";
const ICON_DATE: &str = r"(🛫|📅|⏳)\x{FE0F}?\s*(\d{4}-\d{2}-\d{2})";
const RECURRENCE: &str = r"🔁\x{FE0F}?([^📅🛫⏳✅➕❌🔺⏫🔼🔽⏬📁#\[\n]*)";
const LOCATION: &str = r"📁\x{FE0F}?\s*([^\s\[]+)";
const PRIORITY: &str = r"(🔺|⏫|🔼|🔽|⏬)\x{FE0F}?";
const TAG: &str = r"(?:^|\s)#([\p{L}\p{N}_/-]+)";

/// How much of a line the extractor is allowed to consume
#[derive(Debug, Clone, Copy)]
struct Scope {
    /// Read a leading checkbox as the status
    status: bool,
    /// Consume plain `#tags` (project tags are always consumed)
    tags: bool,
}

/// Extracts shorthand markers (status, priority, dates, recurrence, project,
/// context, location, tags) from free text.
#[derive(Debug, Clone)]
pub struct MarkerParser {
    project_prefix: String,
    checkbox: Regex,
    bracket: Regex,
    icon_date: Regex,
    recurrence: Regex,
    location: Regex,
    priority: Regex,
    context: Regex,
    tag: Regex,
}

impl MarkerParser {
    pub fn new(markers: &MarkerConfig) -> Result<Self, ConfigError> {
        let context = format!(
            r"(?:^|\s){}([\p{{L}}\p{{N}}_/-]+)",
            regex::escape(&markers.context_prefix)
        );
        Ok(MarkerParser {
            project_prefix: markers.project_prefix.to_lowercase(),
            checkbox: Regex::new(CHECKBOX)?,
            bracket: Regex::new(BRACKET_FIELD)?,
            icon_date: Regex::new(ICON_DATE)?,
            recurrence: Regex::new(RECURRENCE)?,
            location: Regex::new(LOCATION)?,
            priority: Regex::new(PRIORITY)?,
            context: Regex::new(&context)?,
            tag: Regex::new(TAG)?,
        })
    }

    /// Extract every marker from `text`.
    ///
    /// Returns the text with markers removed, the scalar fields found (the
    /// first occurrence of a field wins) and the tags in first-seen order,
    /// without duplicates. A checkbox leading the first line, once any
    /// markers in front of it are gone, is read as the status. Lines keep
    /// their indentation; a line made only of markers comes back empty.
    pub fn extract_metadata_and_tags(&self, text: &str) -> (String, PartialMetadata, Vec<String>) {
        let mut meta = PartialMetadata::default();
        let mut tags = IndexSet::new();
        let lines: Vec<String> = text
            .split('\n')
            .enumerate()
            .map(|(idx, line)| {
                let scope = Scope {
                    status: idx == 0,
                    tags: true,
                };
                self.extract_line_into(line, scope, &mut meta, &mut tags)
            })
            .collect();
        if !meta.is_empty() || !tags.is_empty() {
            debug!(?meta, ?tags, "extracted markers");
        }
        (lines.join("\n"), meta, tags.into_iter().collect())
    }

    /// Extract the field markers of a single line, leaving plain `#tags`
    /// and any checkbox where they are
    pub fn extract_line(&self, line: &str) -> (String, PartialMetadata) {
        let mut meta = PartialMetadata::default();
        let mut tags = IndexSet::new();
        let scope = Scope {
            status: false,
            tags: false,
        };
        let cleaned = self.extract_line_into(line, scope, &mut meta, &mut tags);
        (cleaned, meta)
    }

    /// Tags present in `text`, without consuming anything
    pub fn find_tags(&self, text: &str) -> IndexSet<String> {
        let mut tags = IndexSet::new();
        for caps in self.tag.captures_iter(text) {
            if self.project_value(&caps[1]).is_none() {
                tags.insert(caps[1].to_string());
            }
        }
        tags
    }

    fn extract_line_into(
        &self,
        line: &str,
        scope: Scope,
        meta: &mut PartialMetadata,
        tags: &mut IndexSet<String>,
    ) -> String {
        let indent = leading_indent(line);
        let mut body = line[indent.len()..].to_string();
        let mut changed = false;

        for _ in 0..MAX_PASSES {
            let unboxed = if scope.status {
                self.take_checkbox(&body, meta)
            } else {
                None
            };
            let next = self.extract_pass(unboxed.as_deref().unwrap_or(&body), scope, meta, tags);
            if next == body {
                break;
            }
            body = next;
            changed = true;
        }

        if changed {
            tidy_line(indent, &body)
        } else {
            line.to_string()
        }
    }

    fn extract_pass(
        &self,
        text: &str,
        scope: Scope,
        meta: &mut PartialMetadata,
        tags: &mut IndexSet<String>,
    ) -> String {
        let text = self
            .bracket
            .replace_all(text, |caps: &Captures<'_>| {
                if self.take_bracket_field(&caps[1], &caps[2], meta) {
                    " ".to_string()
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();

        let text = self
            .icon_date
            .replace_all(&text, |caps: &Captures<'_>| {
                let field = match &caps[1] {
                    "🛫" => DateField::Start,
                    "⏳" => DateField::Scheduled,
                    _ => DateField::Due,
                };
                match NaiveDate::parse_from_str(&caps[2], DATE_FORMAT) {
                    Ok(date) => {
                        meta.date_mut(field).get_or_insert(date);
                        " ".to_string()
                    }
                    Err(_) => caps[0].to_string(),
                }
            })
            .into_owned();

        let text = self
            .recurrence
            .replace_all(&text, |caps: &Captures<'_>| {
                let rule = caps[1].trim();
                if rule.is_empty() {
                    return caps[0].to_string();
                }
                meta.recurrence.get_or_insert_with(|| rule.to_string());
                " ".to_string()
            })
            .into_owned();

        let text = self
            .location
            .replace_all(&text, |caps: &Captures<'_>| {
                meta.target_file.get_or_insert_with(|| caps[1].to_string());
                " "
            })
            .into_owned();

        let text = self
            .priority
            .replace_all(&text, |caps: &Captures<'_>| {
                if let Some(p) = Priority::from_icon(&caps[1]) {
                    meta.priority.get_or_insert(p);
                }
                " "
            })
            .into_owned();

        let text = self
            .context
            .replace_all(&text, |caps: &Captures<'_>| {
                meta.context.get_or_insert_with(|| caps[1].to_string());
                " "
            })
            .into_owned();

        self.tag
            .replace_all(&text, |caps: &Captures<'_>| {
                if let Some(project) = self.project_value(&caps[1]) {
                    meta.project.get_or_insert_with(|| project.to_string());
                    return " ".to_string();
                }
                if !scope.tags {
                    return caps[0].to_string();
                }
                tags.insert(caps[1].to_string());
                " ".to_string()
            })
            .into_owned()
    }

    /// Strip a checkbox leading `text`, which may only have become leading
    /// after markers in front of it were removed. The first one is the status.
    fn take_checkbox(&self, text: &str, meta: &mut PartialMetadata) -> Option<String> {
        let text = text.trim_start();
        let caps = self.checkbox.captures(text)?;
        if meta.status_marker.is_none() {
            meta.status_marker = caps[1].chars().next();
        }
        Some(text[caps[0].len()..].to_string())
    }

    /// `project/garden` -> `garden` when the prefix is the project prefix
    fn project_value<'a>(&self, tag: &'a str) -> Option<&'a str> {
        let (prefix, value) = tag.split_once('/')?;
        (prefix.to_lowercase() == self.project_prefix && !value.is_empty()).then_some(value)
    }

    /// Store a `[key:: value]` field. Unknown keys and values that do not
    /// parse are not consumed.
    fn take_bracket_field(&self, key: &str, value: &str, meta: &mut PartialMetadata) -> bool {
        if value.is_empty() {
            return false;
        }
        let key = key.to_lowercase().replace(['-', '_'], "");
        let date_field = match key.as_str() {
            "start" | "startdate" => Some(DateField::Start),
            "due" | "duedate" => Some(DateField::Due),
            "scheduled" | "scheduleddate" => Some(DateField::Scheduled),
            _ => None,
        };
        if let Some(field) = date_field {
            let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) else {
                return false;
            };
            meta.date_mut(field).get_or_insert(date);
            return true;
        }
        match key.as_str() {
            "priority" => {
                let Some(p) = Priority::from_name(value) else {
                    return false;
                };
                meta.priority.get_or_insert(p);
            }
            "context" => {
                meta.context.get_or_insert_with(|| value.to_string());
            }
            "repeat" | "recurrence" => {
                meta.recurrence.get_or_insert_with(|| value.to_string());
            }
            k if k == "project" || k == self.project_prefix => {
                meta.project.get_or_insert_with(|| value.to_string());
            }
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parser() -> MarkerParser {
        MarkerParser::new(&MarkerConfig::default()).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_duplicate_tags_collapse() {
        let (cleaned, meta, tags) = parser().extract_metadata_and_tags("#urgent buy milk #urgent");
        assert_eq!(cleaned, "buy milk");
        assert_eq!(tags, vec!["urgent".to_string()]);
        assert!(meta.is_empty());
    }

    #[test]
    fn test_symbol_markers() {
        let (cleaned, meta, tags) = parser().extract_metadata_and_tags(
            "Plan trip 🔼 📅 2025-06-01 🛫 2025-05-20 @home #project/travel #fun 🔁 every year",
        );
        assert_eq!(cleaned, "Plan trip");
        assert_eq!(meta.priority, Priority::new(3));
        assert_eq!(meta.due_date, Some(date("2025-06-01")));
        assert_eq!(meta.start_date, Some(date("2025-05-20")));
        assert_eq!(meta.context.as_deref(), Some("home"));
        assert_eq!(meta.project.as_deref(), Some("travel"));
        assert_eq!(meta.recurrence.as_deref(), Some("every year"));
        assert_eq!(tags, vec!["fun".to_string()]);
    }

    #[test]
    fn test_bracket_markers() {
        let (cleaned, meta, _) = parser().extract_metadata_and_tags(
            "Plan trip [due:: 2025-06-01] [priority:: high] [project:: travel] [repeat:: every week]",
        );
        assert_eq!(cleaned, "Plan trip");
        assert_eq!(meta.due_date, Some(date("2025-06-01")));
        assert_eq!(meta.priority, Priority::new(4));
        assert_eq!(meta.project.as_deref(), Some("travel"));
        assert_eq!(meta.recurrence.as_deref(), Some("every week"));
    }

    #[test]
    fn test_leading_checkbox_is_status() {
        let (cleaned, meta, _) = parser().extract_metadata_and_tags("- [/] Draft post\n- [x] other");
        assert_eq!(meta.status_marker, Some('/'));
        assert_eq!(cleaned, "Draft post\n- [x] other");
    }

    #[test]
    fn test_checkbox_exposed_by_removed_marker_is_status() {
        let p = parser();
        let (cleaned, meta, tags) = p.extract_metadata_and_tags("#work - [ ] call mom");
        assert_eq!(cleaned, "call mom");
        assert_eq!(meta.status_marker, Some(' '));
        assert_eq!(tags, vec!["work".to_string()]);

        let (cleaned, meta, _) = p.extract_metadata_and_tags("- [x] - [ ] foo");
        assert_eq!(cleaned, "foo");
        assert_eq!(meta.status_marker, Some('x'));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let (_, meta, _) = parser().extract_metadata_and_tags("a 🔺 b ⏬\nc 📅 2025-01-01\nd 📅 2025-02-02");
        assert_eq!(meta.priority, Priority::new(5));
        assert_eq!(meta.due_date, Some(date("2025-01-01")));
    }

    #[test]
    fn test_malformed_markers_left_alone() {
        let text = "Odd [due:: soonish] [colour:: red] 📅 someday # alone";
        let (cleaned, meta, tags) = parser().extract_metadata_and_tags(text);
        assert_eq!(cleaned, text);
        assert!(meta.is_empty());
        assert!(tags.is_empty());
    }

    #[test]
    fn test_location_marker() {
        let (cleaned, meta, _) = parser().extract_metadata_and_tags("Idea 📁 Inbox/Ideas.md");
        assert_eq!(cleaned, "Idea");
        assert_eq!(meta.target_file.as_deref(), Some("Inbox/Ideas.md"));
    }

    #[test]
    fn test_removal_exposes_tag() {
        let (cleaned, meta, tags) = parser().extract_metadata_and_tags("ship🔼#release");
        assert_eq!(cleaned, "ship");
        assert_eq!(meta.priority, Priority::new(3));
        assert_eq!(tags, vec!["release".to_string()]);
    }

    #[test]
    fn test_indent_preserved_and_marker_only_line_emptied() {
        let (cleaned, _, tags) = parser().extract_metadata_and_tags("Parent\n  - child #a\n#b");
        assert_eq!(cleaned, "Parent\n  - child\n");
        assert_eq!(tags, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let p = parser();
        for text in [
            "- [x] #a done 🔼 #a @work",
            "#project/home fix sink [due:: 2025-03-03]\n  sub 📅 2025-01-01",
            "- [x] #only\n- [ ] next",
            "plain text, nothing here",
            "🔁 every day #x 🔁 every week",
            "#work - [ ] call mom",
            "- [x] - [ ] foo",
            "🔼 - [/] draft",
        ] {
            let (once, _, _) = p.extract_metadata_and_tags(text);
            let (twice, meta, tags) = p.extract_metadata_and_tags(&once);
            assert_eq!(twice, once, "cleaned text changed for {text:?}");
            assert!(meta.is_empty(), "found more metadata in {once:?}");
            assert!(tags.is_empty(), "found more tags in {once:?}");
        }
    }

    #[test]
    fn test_extract_line_keeps_plain_tags() {
        let (cleaned, meta) = parser().extract_line("- [ ] Call mom #family 🔼 #project/home");
        assert_eq!(cleaned, "- [ ] Call mom #family");
        assert_eq!(meta.priority, Priority::new(3));
        assert_eq!(meta.project.as_deref(), Some("home"));
        assert_eq!(meta.status_marker, None);
    }

    #[test]
    fn test_custom_prefixes() {
        let markers = MarkerConfig {
            project_prefix: "proj".into(),
            context_prefix: "+".into(),
        };
        let p = MarkerParser::new(&markers).unwrap();
        let (cleaned, meta, tags) = p.extract_metadata_and_tags("x #proj/a +office #project/b");
        assert_eq!(cleaned, "x");
        assert_eq!(meta.project.as_deref(), Some("a"));
        assert_eq!(meta.context.as_deref(), Some("office"));
        assert_eq!(tags, vec!["project/b".to_string()]);
    }

    #[test]
    fn test_find_tags_skips_project_tags() {
        let tags = parser().find_tags("a #one #project/x #two #one");
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["one", "two"]);
    }
}
