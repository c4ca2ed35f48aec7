use std::ops::Range;

/// Byte range inside a single line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub range: Range<usize>,
}

impl TextSpan {
    pub fn new(start: usize, end: usize) -> Self {
        TextSpan { range: start..end }
    }

    pub fn start(&self) -> usize {
        self.range.start
    }

    pub fn end(&self) -> usize {
        self.range.end
    }

    pub fn overlaps(&self, other: &Range<usize>) -> bool {
        self.range.start < other.end && other.start < self.range.end
    }
}

/// True if `range` touches any of `spans`
pub fn overlaps_any(spans: &[TextSpan], range: &Range<usize>) -> bool {
    spans.iter().any(|s| s.overlaps(range))
}

/// Remove every span from `line`. Spans must not overlap.
pub fn remove_spans(line: &str, spans: &[TextSpan]) -> String {
    let mut sorted: Vec<&TextSpan> = spans.iter().collect();
    sorted.sort_by_key(|s| s.start());
    let mut out = String::with_capacity(line.len());
    let mut pos = 0;
    for span in sorted {
        if span.start() < pos {
            continue;
        }
        out.push_str(&line[pos..span.start()]);
        out.push(' ');
        pos = span.end();
    }
    out.push_str(&line[pos..]);
    out
}
