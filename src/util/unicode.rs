use unicode_segmentation::UnicodeSegmentation;

/// The only character of `s`, if `s` is exactly one grapheme made of one char.
/// Whitespace counts, so `" "` yields `Some(' ')`.
pub fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// At most `max` user-perceived characters of `s`, never splitting an emoji
/// or a combining sequence.
pub fn truncate_graphemes(s: &str, max: usize) -> &str {
    match s.grapheme_indices(true).nth(max) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Leading spaces and tabs of a line.
pub fn leading_indent(line: &str) -> &str {
    let body = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - body.len()]
}

/// Collapse runs of spaces/tabs inside a line into one space and trim the
/// end. Leading indentation is kept verbatim.
pub fn collapse_spaces(line: &str) -> String {
    let indent = leading_indent(line);
    let body = &line[indent.len()..];
    let mut out = String::with_capacity(line.len());
    out.push_str(indent);
    let mut first = true;
    for word in body.split([' ', '\t']).filter(|w| !w.is_empty()) {
        if !first {
            out.push(' ');
        }
        out.push_str(word);
        first = false;
    }
    if first {
        // Nothing but whitespace
        return String::new();
    }
    out
}
