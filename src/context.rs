//! Run-scoped shared state.

use tracing::info;

use crate::book::Book;
use crate::footnote::FootnoteDelimiters;
use crate::heading::HeadingIndex;
use crate::layout::LayoutConfig;

/// Everything chapter assembly reads but never writes.
///
/// Built once per conversion, before any chapter is processed, and shared by
/// reference with every worker.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub delimiters: FootnoteDelimiters,
    pub headings: HeadingIndex,
    pub layout: LayoutConfig,
}

impl RunContext {
    /// Run the whole-book pre-passes: footnote marker learning and heading
    /// index construction.
    pub fn build(book: &Book, layout: LayoutConfig) -> Self {
        let delimiters = FootnoteDelimiters::learn(book.sorted_chapters());
        let headings = HeadingIndex::from_toc(&book.toc);
        info!(
            chapters = book.chapters.len(),
            headings = headings.len(),
            "prepared run context"
        );
        Self {
            delimiters,
            headings,
            layout,
        }
    }
}
