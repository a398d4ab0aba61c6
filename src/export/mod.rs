//! Export module for writing reconstructed books to various formats.
//!
//! Provides the `Exporter` trait and format-specific implementations.
//!
//! # Architecture
//!
//! The `Exporter` trait uses a builder pattern:
//! - `new()` creates an exporter with default configuration
//! - `with_config()` allows customization
//! - `export()` writes to any `Write + Seek` destination
//!
//! Every exporter runs the same pipeline: build the [`RunContext`] once,
//! assemble all chapters with the format's [`Flavor`], then wrap the chapter
//! markup the way the format expects.
//!
//! # Example
//!
//! ```no_run
//! use svgbook::Book;
//! use svgbook::export::{Exporter, HtmlExporter};
//! use std::fs::File;
//!
//! let book = Book::from_json(&std::fs::read_to_string("book.json")?)?;
//! let mut file = File::create("book.html")?;
//! HtmlExporter::new().export(&book, &mut file)?;
//! # Ok::<(), svgbook::Error>(())
//! ```
//!
//! [`RunContext`]: crate::context::RunContext
//! [`Flavor`]: crate::assemble::Flavor

use std::io::{Seek, Write};

use crate::book::Book;
use crate::error::Result;

mod cover;
mod document;
mod epub;
mod html;
mod pdf;

pub use cover::{CoverFetcher, FsCoverFetcher};
pub use document::{document_end, head_html, toc_html};
pub use epub::{EpubChapter, EpubConfig, EpubExporter, EpubFlavor};
pub use html::{HtmlConfig, HtmlExporter, HtmlFlavor};
pub use pdf::{PdfConfig, PdfDocuments, PdfExporter, PdfFlavor, PdfRenderer, WkhtmltopdfRenderer};

/// Trait for exporting books to specific formats.
///
/// Exporters use a builder pattern where configuration is held in the struct,
/// and the `export` method writes to any `Write + Seek` destination.
pub trait Exporter {
    /// Export the book to the provided writer.
    ///
    /// The writer can be:
    /// - `std::fs::File` for disk output
    /// - `std::io::Cursor<Vec<u8>>` for seekable in-memory output
    /// - Any other type implementing `Write + Seek`
    fn export<W: Write + Seek>(&self, book: &Book, writer: &mut W) -> Result<()>;
}

/// Output formats, for callers that pick an exporter at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Html,
    Pdf,
    Epub,
}

impl Format {
    /// Guess the format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "html" | "htm" => Some(Format::Html),
            "pdf" => Some(Format::Pdf),
            "epub" => Some(Format::Epub),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Html => "html",
            Format::Pdf => "pdf",
            Format::Epub => "epub",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_extension("HTML"), Some(Format::Html));
        assert_eq!(Format::from_extension("htm"), Some(Format::Html));
        assert_eq!(Format::from_extension("epub"), Some(Format::Epub));
        assert_eq!(Format::from_extension("pdf"), Some(Format::Pdf));
        assert_eq!(Format::from_extension("mobi"), None);
        assert_eq!(Format::Epub.extension(), "epub");
    }
}
