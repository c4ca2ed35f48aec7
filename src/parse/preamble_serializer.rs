use crate::model::metadata::{DATE_FORMAT, MetadataRecord};

/// Opening and closing line of a preamble block
pub const PREAMBLE_DELIMITER: &str = "---";

/// Whether `content` already starts with a preamble block
pub fn has_preamble(content: &str) -> bool {
    content.trim_start().starts_with(PREAMBLE_DELIMITER)
}

/// Double-quoted, escaped scalar. Safe for any string.
fn quote(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// Build the `key: value` lines of a preamble.
///
/// `status` is always written; every other key only when the record has a
/// value. `tags` is written as a bracketed list when not empty.
pub fn preamble_lines(record: &MetadataRecord, status: &str, tags: &[String]) -> Vec<String> {
    let mut lines = vec![format!("status: {}", quote(status))];

    let dates = [
        ("dueDate", record.due_date),
        ("startDate", record.start_date),
        ("scheduledDate", record.scheduled_date),
    ];
    for (key, date) in dates {
        if let Some(date) = date {
            lines.push(format!("{key}: {}", quote(&date.format(DATE_FORMAT).to_string())));
        }
    }
    if let Some(priority) = record.priority {
        lines.push(format!("priority: {}", quote(&priority.level().to_string())));
    }
    let labels = [
        ("project", &record.project),
        ("context", &record.context),
        ("repeat", &record.recurrence),
    ];
    for (key, value) in labels {
        if let Some(value) = value {
            lines.push(format!("{key}: {}", quote(value)));
        }
    }
    if !tags.is_empty() {
        let list: Vec<String> = tags.iter().map(|t| quote(t)).collect();
        lines.push(format!("tags: [{}]", list.join(", ")));
    }
    lines
}

/// Prefix `content` with a delimited preamble and a blank line
pub fn serialize_preamble(lines: &[String], content: &str) -> String {
    format!(
        "{delim}\n{}\n{delim}\n\n{content}",
        lines.join("\n"),
        delim = PREAMBLE_DELIMITER
    )
}

/// Put `content` into `template`.
///
/// Every `{{CONTENT}}` placeholder (any case, inner whitespace allowed) is
/// replaced. Without a placeholder the content follows the template after a
/// blank line.
pub fn merge_template(template: &str, content: &str) -> String {
    let mut out = String::with_capacity(template.len() + content.len());
    let mut rest = template;
    let mut found = false;

    while let Some(open) = rest.find("{{") {
        let inner = &rest[open + 2..];
        match inner.find("}}") {
            Some(close) if inner[..close].trim().eq_ignore_ascii_case("content") => {
                out.push_str(&rest[..open]);
                out.push_str(content);
                rest = &inner[close + 2..];
                found = true;
            }
            _ => {
                out.push_str(&rest[..open + 2]);
                rest = inner;
            }
        }
    }
    out.push_str(rest);

    if found {
        return out;
    }
    let base = template.trim_end();
    if base.is_empty() {
        content.to_string()
    } else {
        format!("{base}\n\n{content}")
    }
}
