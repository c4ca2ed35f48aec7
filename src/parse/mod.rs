pub mod date_scanner;
pub mod marker_parser;
pub mod preamble_serializer;
pub mod span;
pub mod task_serializer;

pub use date_scanner::{DateScanner, LineScan};
pub use marker_parser::MarkerParser;
pub use preamble_serializer::{has_preamble, merge_template, preamble_lines, serialize_preamble};
pub use task_serializer::{TaskLineWriter, clean_transient_marks, metadata_suffix};

use crate::util::unicode::collapse_spaces;

/// Re-join a line after pieces were cut out of `body`: the original indent
/// is kept, the body is collapsed to single spaces and loses dangling
/// separators. A body with nothing left yields an empty line.
pub(crate) fn tidy_line(indent: &str, body: &str) -> String {
    let mut body = collapse_spaces(body.trim_start())
        .replace(" ,", ",")
        .replace(" ;", ";");
    while body.ends_with([',', ';', ' ']) {
        body.pop();
    }
    if body.is_empty() {
        return String::new();
    }
    format!("{indent}{body}")
}
