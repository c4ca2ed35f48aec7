use chrono::NaiveDateTime;
use chrono::format::{Item, StrftimeItems};

use crate::util::unicode::truncate_graphemes;

/// moment.js tokens and their chrono equivalents, longest first
const MOMENT_TOKENS: [(&str, &str); 18] = [
    ("YYYY", "%Y"),
    ("MMMM", "%B"),
    ("dddd", "%A"),
    ("MMM", "%b"),
    ("ddd", "%a"),
    ("YY", "%y"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("HH", "%H"),
    ("hh", "%I"),
    ("mm", "%M"),
    ("ss", "%S"),
    ("M", "%-m"),
    ("D", "%-d"),
    ("H", "%-H"),
    ("h", "%-I"),
    ("A", "%p"),
    ("a", "%P"),
];

const UNSAFE: [char; 8] = ['<', '>', ':', '"', '|', '*', '?', '\\'];

/// Longest title, in characters, that goes into a file name
const MAX_TITLE: usize = 100;

/// Translate a moment.js format (`YYYY-MM-DD`, `[Week] ww`) into a chrono
/// format string. Text in square brackets is literal.
pub fn moment_to_chrono(format: &str) -> String {
    let mut out = String::with_capacity(format.len() * 2);
    let mut rest = format;
    'outer: while let Some(c) = rest.chars().next() {
        if c == '['
            && let Some(end) = rest.find(']')
        {
            out.push_str(&rest[1..end].replace('%', "%%"));
            rest = &rest[end + 1..];
            continue;
        }
        for (token, spec) in MOMENT_TOKENS {
            if let Some(after) = rest.strip_prefix(token) {
                out.push_str(spec);
                rest = after;
                continue 'outer;
            }
        }
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// Replace every `{{DATE:<format>}}` (or `{{date:...}}`) with `now`
/// formatted. Tokens with an empty or unusable format are left as written.
pub fn render_date_tokens(template: &str, now: NaiveDateTime) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        let inner = &rest[open + 2..];
        let rendered = inner.find("}}").and_then(|close| {
            let (tag, format) = inner[..close].split_once(':')?;
            if !tag.trim().eq_ignore_ascii_case("date") {
                return None;
            }
            let format = format.trim();
            if format.is_empty() {
                return None;
            }
            let chrono_fmt = moment_to_chrono(format);
            let items: Vec<Item<'_>> = StrftimeItems::new(&chrono_fmt).collect();
            if items.iter().any(|i| matches!(i, Item::Error)) {
                return None;
            }
            Some((close, now.format_with_items(items.into_iter()).to_string()))
        });
        match rendered {
            Some((close, text)) => {
                out.push_str(&rest[..open]);
                out.push_str(&text);
                rest = &inner[close + 2..];
            }
            None => {
                out.push_str(&rest[..open + 2]);
                rest = inner;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Replace characters that are unsafe in file names with `-` and normalize
/// whitespace in every path component
pub fn sanitize_path(path: &str) -> String {
    path.split('/')
        .map(|part| {
            part.replace(UNSAFE, "-")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the file name for a captured document.
///
/// Date tokens in `template` are rendered and `title` (if any) is shortened
/// and appended. The result is sanitized, loses a dangling ` -` separator
/// and gets `.md` when missing. `default_folder` is prefixed when the name
/// has no directory part.
pub fn document_file_name(
    template: &str,
    title: Option<&str>,
    now: NaiveDateTime,
    default_folder: &str,
) -> String {
    let mut name = render_date_tokens(template, now);
    if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
        name.push_str(truncate_graphemes(title, MAX_TITLE).trim_end());
    }
    let mut name = sanitize_path(&name);
    while name.ends_with(['-', ' ']) {
        name.pop();
    }
    if name.is_empty() {
        name = now.format("%Y-%m-%d").to_string();
    }
    if !name.to_lowercase().ends_with(".md") {
        name.push_str(".md");
    }
    let folder = default_folder.trim().trim_end_matches('/');
    if !name.contains('/') && !folder.is_empty() {
        name = format!("{folder}/{name}");
    }
    name
}
