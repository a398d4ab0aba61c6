//! # svgbook
//!
//! Rebuild readable ebooks from positioned SVG page snapshots.
//!
//! A snapshot chapter is a set of absolutely positioned `<text>` and
//! `<image>` elements with no document structure. This crate recovers the
//! structure heuristically: glyphs are grouped into lines by their vertical
//! position, raised and lowered text becomes superscript/subscript, footnote
//! anchors are rewired to their counterparts, and lines matching the table
//! of contents become headings. The result is written as HTML, PDF (through
//! an external renderer) or EPUB.
//!
//! ## Quick Start
//!
//! ```no_run
//! use svgbook::Book;
//! use svgbook::export::{EpubExporter, Exporter};
//! use std::fs::File;
//!
//! let book = Book::from_json(&std::fs::read_to_string("book.json")?)?;
//! let mut file = File::create("book.epub")?;
//! EpubExporter::new().export(&book, &mut file)?;
//! # Ok::<(), svgbook::Error>(())
//! ```
//!
//! ## Pipeline
//!
//! 1. [`RunContext::build`] runs the whole-book passes once: footnote marker
//!    learning and the heading index.
//! 2. [`assemble::assemble_book`] parses each chapter ([`svg`]), extracts
//!    lines ([`layout`]) and assembles markup, chapters in parallel.
//! 3. An [`export`] strategy wraps the chapters for the target format and
//!    [`entities::decode_cosmetic_entities`] tidies the final markup.

pub mod assemble;
pub mod book;
pub mod context;
pub mod entities;
pub mod error;
pub mod export;
pub mod footnote;
pub mod heading;
pub mod layout;
pub mod svg;
pub(crate) mod util;

pub use assemble::{AssembledDocument, ChapterMarkup, CoverImage, Flavor};
pub use book::{Book, ChapterSource, TocEntry};
pub use context::RunContext;
pub use error::{Error, Result};
pub use export::{Exporter, Format};
pub use layout::LayoutConfig;
pub use util::decode_text;
