//! Book-wide footnote anchor markers.
//!
//! Footnote anchors in a snapshot link to fragments such as
//! `chapter_00003.xhtml#note-fwd-4`, and the back-link from the note uses the
//! same fragment with a different marker (`note-back-4`). The pair of marker
//! tokens is constant for a whole book, so it is learned once up front and
//! then used to turn every forward anchor into its back-reference and vice
//! versa.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::book::ChapterSource;
use crate::layout::FootnoteLink;
use crate::svg::{self, Element};

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z_-]+").expect("valid marker regex"));

/// The two marker tokens used by a book's footnote anchors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FootnoteDelimiters {
    pub marker_a: String,
    /// Empty when the book only ever uses one marker.
    pub marker_b: String,
}

impl FootnoteDelimiters {
    pub fn new(marker_a: impl Into<String>, marker_b: impl Into<String>) -> Self {
        Self {
            marker_a: marker_a.into(),
            marker_b: marker_b.into(),
        }
    }

    /// Scan the book's anchors for at most two distinct marker tokens.
    ///
    /// Fragments that fail to parse are skipped here; the assembler reports
    /// them properly when it reaches that chapter.
    pub fn learn<'a, I>(chapters: I) -> Self
    where
        I: IntoIterator<Item = &'a ChapterSource>,
    {
        let mut found: Vec<String> = Vec::with_capacity(2);

        'chapters: for chapter in chapters {
            for content in &chapter.contents {
                let root = match svg::parse_fragment(&chapter.chapter_id, content) {
                    Ok(root) => root,
                    Err(e) => {
                        warn!(chapter = %chapter.chapter_id, error = %e, "skipping fragment while learning footnote markers");
                        continue;
                    }
                };
                for token in anchor_tokens(&root) {
                    if !found.contains(&token) {
                        found.push(token);
                    }
                    if found.len() == 2 {
                        break 'chapters;
                    }
                }
            }
        }

        let mut found = found.into_iter();
        let delimiters = Self {
            marker_a: found.next().unwrap_or_default(),
            marker_b: found.next().unwrap_or_default(),
        };
        debug!(marker_a = %delimiters.marker_a, marker_b = %delimiters.marker_b, "learned footnote markers");
        delimiters
    }

    /// Swap the marker in an anchor fragment for its counterpart.
    pub fn translate(&self, fragment: &str) -> String {
        if self.marker_a.is_empty() || self.marker_b.is_empty() {
            return fragment.to_string();
        }
        if fragment.contains(&self.marker_a) {
            fragment.replace(&self.marker_a, &self.marker_b)
        } else if fragment.contains(&self.marker_b) {
            fragment.replace(&self.marker_b, &self.marker_a)
        } else {
            fragment.to_string()
        }
    }

    /// Build the link target and anchor id for a footnote `href` found in
    /// `chapter_id`.
    ///
    /// Returns `(link, anchor_id)`. Targets are document-local (`#file_frag`)
    /// because every chapter ends up in the same output document or next to
    /// its siblings.
    pub fn link_for(&self, chapter_id: &str, href: &str, style: &str) -> (FootnoteLink, String) {
        let last = href.rsplit('/').next().unwrap_or(href);
        let (target, id) = match last.split_once('#') {
            Some((file, fragment)) => (
                format!("#{}_{}", file, self.translate(fragment)),
                format!("{chapter_id}_{fragment}"),
            ),
            None => (format!("#{last}"), chapter_id.to_string()),
        };
        (
            FootnoteLink {
                href: target,
                style: style.to_string(),
            },
            id,
        )
    }
}

/// Marker tokens of every footnote anchor directly under `root`, in order.
fn anchor_tokens(root: &Element) -> Vec<String> {
    let mut tokens = Vec::new();
    for child in &root.children {
        if child.name != "text" || !child.content.is_empty() || child.children.is_empty() {
            continue;
        }
        for anchor in child.children.iter().filter(|c| c.name == "a") {
            let Some(href) = anchor.attr("href") else {
                continue;
            };
            let last = href.rsplit('/').next().unwrap_or(href);
            let target = last.split_once('#').map_or(last, |(_, fragment)| fragment);
            if let Some(m) = MARKER_RE.find(target) {
                tokens.push(m.as_str().to_string());
            }
        }
    }
    tokens
}
