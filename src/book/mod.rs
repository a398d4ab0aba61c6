//! Book input model: chapters of SVG snapshot fragments plus the flat table
//! of contents, as loaded from a JSON manifest.

use serde::Deserialize;

/// A book as delivered by the snapshot source: ordered chapters plus the
/// table of contents. Nothing in here is mutated by the conversion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Book {
    #[serde(default)]
    pub title: String,
    pub chapters: Vec<ChapterSource>,
    #[serde(default)]
    pub toc: Vec<TocEntry>,
}

/// One chapter's raw SVG fragments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChapterSource {
    #[serde(alias = "chapterId")]
    pub chapter_id: String,
    #[serde(default, alias = "orderIndex")]
    pub order_index: usize,
    pub contents: Vec<String>,
}

/// A flat table of contents entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TocEntry {
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub level: usize,
    #[serde(default, alias = "playOrder")]
    pub play_order: usize,
    pub text: String,
}

impl Book {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_chapter(mut self, chapter: ChapterSource) -> Self {
        self.chapters.push(chapter);
        self
    }

    pub fn with_toc_entry(mut self, entry: TocEntry) -> Self {
        self.toc.push(entry);
        self
    }

    /// Parse a book manifest (`{title, chapters, toc}`) from JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Chapters in reading order. The sort is stable, so chapters that share
    /// an order index keep their manifest order.
    pub fn sorted_chapters(&self) -> Vec<&ChapterSource> {
        let mut chapters: Vec<&ChapterSource> = self.chapters.iter().collect();
        chapters.sort_by_key(|c| c.order_index);
        chapters
    }
}

impl ChapterSource {
    pub fn new(chapter_id: impl Into<String>, order_index: usize) -> Self {
        Self {
            chapter_id: chapter_id.into(),
            order_index,
            contents: Vec::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.contents.push(content.into());
        self
    }

    /// Add a fragment from raw bytes, repairing invalid UTF-8.
    pub fn with_raw_content(self, bytes: &[u8]) -> Self {
        let content = crate::util::decode_text(bytes, None).into_owned();
        self.with_content(content)
    }
}

impl TocEntry {
    pub fn new(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            href: href.into(),
            ..Default::default()
        }
    }

    pub fn with_level(mut self, level: usize) -> Self {
        self.level = level;
        self
    }

    /// The document part of the href (everything before `#`).
    pub fn chapter_href(&self) -> &str {
        self.href.split('#').next().unwrap_or("")
    }

    /// The anchor inside the chapter, if the href carries one.
    pub fn fragment(&self) -> Option<&str> {
        self.href.split_once('#').map(|(_, frag)| frag)
    }
}
