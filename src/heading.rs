//! Heading detection from table-of-contents text.

use crate::book::TocEntry;
use crate::util::unescape_html;

/// TOC text → heading level, in TOC order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadingIndex {
    entries: Vec<(String, usize)>,
}

impl HeadingIndex {
    pub fn from_toc(toc: &[TocEntry]) -> Self {
        let mut entries: Vec<(String, usize)> = Vec::with_capacity(toc.len());
        for entry in toc {
            let key = normalize(&entry.text);
            if key.is_empty() {
                continue;
            }
            match entries.iter_mut().find(|(text, _)| *text == key) {
                Some(existing) => existing.1 = entry.level,
                None => entries.push((key, entry.level)),
            }
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Level of the first TOC entry whose text contains the line.
    ///
    /// `line` is the escaped plain text of an assembled line. Overlapping
    /// entries resolve to the earliest one in TOC order.
    pub fn match_line(&self, line: &str) -> Option<usize> {
        let needle = normalize(&unescape_html(line).replace("&nbsp;", ""));
        if needle.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(text, _)| text.contains(&needle))
            .map(|(_, level)| *level)
    }
}

/// Heading tag for a TOC level (`0` is the top level).
pub fn heading_tag(level: usize) -> &'static str {
    match level {
        0 => "h1",
        1 => "h2",
        2 => "h3",
        3 => "h4",
        4 => "h5",
        _ => "h6",
    }
}

fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect()
}
