//! Single-document HTML exporter.

use std::io::{Seek, Write};

use tracing::info;

use crate::assemble::{Flavor, ImageRender, RenderedImage, assemble_book, standard_image};
use crate::book::Book;
use crate::context::RunContext;
use crate::entities::decode_cosmetic_entities;
use crate::error::Result;
use crate::layout::LayoutConfig;

use super::Exporter;
use super::document::{document_end, head_html, toc_html};

/// Configuration for HTML export.
#[derive(Debug, Clone)]
pub struct HtmlConfig {
    /// Value of the `lang` attribute on `<html>`.
    pub lang: String,
    /// Heading of the TOC anchor block.
    pub toc_title: String,
    pub layout: LayoutConfig,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            lang: "zh-CN".to_string(),
            toc_title: "目 录".to_string(),
            layout: LayoutConfig::default(),
        }
    }
}

/// Images stay in the flow, cover included.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlFlavor;

impl Flavor for HtmlFlavor {
    fn render_image(&self, image: &ImageRender<'_>) -> RenderedImage {
        RenderedImage {
            markup: standard_image(image),
            aside: None,
        }
    }
}

/// HTML format exporter.
///
/// Writes the whole book as one self-contained document: the TOC anchor
/// block sits between the first and second chapter, and every chapter ends
/// with a forced page break.
pub struct HtmlExporter {
    config: HtmlConfig,
}

impl HtmlExporter {
    /// Create a new exporter with default configuration.
    pub fn new() -> Self {
        Self {
            config: HtmlConfig::default(),
        }
    }

    /// Configure the exporter with custom settings.
    pub fn with_config(mut self, config: HtmlConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the final document in memory.
    pub fn render(&self, book: &Book) -> Result<String> {
        let ctx = RunContext::build(book, self.config.layout.clone());
        let document = assemble_book(book, &ctx, &HtmlFlavor)?;

        let mut out = head_html(&self.config.lang, &book.title);
        for chapter in &document.chapters {
            if chapter.index == 1 {
                out.push_str(&toc_html(&book.toc, &self.config.toc_title));
            }
            out.push_str(&chapter.body);
            out.push_str("\n<div style=\"page-break-after: always;\"></div>");
        }
        out.push_str(document_end());

        Ok(decode_cosmetic_entities(&out))
    }
}

impl Default for HtmlExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Exporter for HtmlExporter {
    fn export<W: Write + Seek>(&self, book: &Book, writer: &mut W) -> Result<()> {
        let html = self.render(book)?;
        writer.write_all(html.as_bytes())?;
        info!(bytes = html.len(), chapters = book.chapters.len(), "wrote HTML");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{ChapterSource, TocEntry};

    fn book() -> Book {
        Book::new("Sample")
            .with_chapter(
                ChapterSource::new("c0", 0)
                    .with_content(r#"<svg><image x="0" y="1" width="300" height="400" href="cover.jpg"/></svg>"#),
            )
            .with_chapter(
                ChapterSource::new("c1", 1)
                    .with_content(r#"<svg><text x="0" y="10" id="a">Chapter One</text><text x="0" y="30">a&nbsp;b &lt;script&gt;</text></svg>"#),
            )
            .with_toc_entry(TocEntry::new("Chapter One", "c1#a").with_level(0))
    }

    #[test]
    fn test_document_layout() {
        let html = HtmlExporter::new().render(&book()).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.ends_with("</html>"));

        let cover = html.find("cover.jpg").unwrap();
        let toc = html.find("<div id=\"toc\">").unwrap();
        let chapter = html.find("<div id=\"c1\">").unwrap();
        assert!(cover < toc && toc < chapter);
        assert_eq!(html.matches("page-break-after: always;").count(), 3);
    }

    #[test]
    fn test_heading_and_entities() {
        let html = HtmlExporter::new().render(&book()).unwrap();
        assert!(html.contains("<h1><span id=\"a\">Chapter One</span></h1>"), "{html}");
        // U+00A0 from the source survives, escaped tags stay escaped
        assert!(html.contains("<p>a\u{a0}b &lt;script&gt;</p>"), "{html}");
    }

    #[test]
    fn test_config() {
        let config = HtmlConfig {
            lang: "en".to_string(),
            toc_title: "Contents".to_string(),
            ..Default::default()
        };
        let html = HtmlExporter::new().with_config(config).render(&book()).unwrap();
        assert!(html.contains("lang=\"en\""));
        assert!(html.contains(">Contents</span>"));
    }

    #[test]
    fn test_export_writes_bytes() {
        let mut out = std::io::Cursor::new(Vec::new());
        HtmlExporter::new().export(&book(), &mut out).unwrap();
        assert!(String::from_utf8(out.into_inner()).unwrap().contains("<div id=\"c0\">"));
    }
}
