//! Text-preserving XML edits
//!
//! Documents are parsed with roxmltree only to locate nodes; edits are byte
//! splices on the original text so comments, formatting and untouched
//! attributes survive a rewrite.

use regex::Regex;
use std::ops::Range;

pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Byte range of the start tag of the element beginning at `element_start`.
pub fn start_tag_range(text: &str, element_start: usize) -> Option<Range<usize>> {
    let mut quote = None;
    for (offset, c) in text[element_start..].char_indices() {
        match (quote, c) {
            (None, '"') | (None, '\'') => quote = Some(c),
            (Some(q), c) if q == c => quote = None,
            (None, '>') => return Some(element_start..element_start + offset + 1),
            _ => {}
        }
    }
    None
}

/// Byte range of the attribute `name="..."` inside a start tag.
pub fn attribute_range(text: &str, tag: Range<usize>, name: &str) -> Option<Range<usize>> {
    let pattern = format!(r#"\s{}\s*=\s*("[^"]*"|'[^']*')"#, regex::escape(name));
    let re = Regex::new(&pattern).ok()?;
    let found = re.find(&text[tag.clone()])?;
    // Keep the leading whitespace outside the range.
    let leading = found.as_str().len() - found.as_str().trim_start().len();
    Some(tag.start + found.start() + leading..tag.start + found.end())
}

/// A set of non-overlapping replacements applied in one pass.
#[derive(Debug, Default)]
pub struct Splice {
    edits: Vec<(Range<usize>, String)>,
}

impl Splice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, range: Range<usize>, replacement: impl Into<String>) {
        self.edits.push((range, replacement.into()));
    }

    pub fn insert(&mut self, at: usize, content: impl Into<String>) {
        self.edits.push((at..at, content.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn apply(mut self, text: &str) -> String {
        self.edits.sort_by_key(|(range, _)| (range.start, range.end));
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for (range, replacement) in self.edits {
            if range.start < cursor {
                continue;
            }
            out.push_str(&text[cursor..range.start]);
            out.push_str(&replacement);
            cursor = range.end;
        }
        out.push_str(&text[cursor..]);
        out
    }
}
