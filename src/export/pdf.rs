//! PDF exporter.
//!
//! The book is turned into paginated HTML (one full document per chapter,
//! separated by page breaks) plus a standalone cover document, and handed to
//! a [`PdfRenderer`]. The default renderer shells out to `wkhtmltopdf`.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::assemble::{Flavor, ImageRender, RenderedImage, assemble_book, standard_image};
use crate::book::Book;
use crate::context::RunContext;
use crate::entities::decode_cosmetic_entities;
use crate::error::{Error, Result};
use crate::layout::LayoutConfig;

use super::Exporter;
use super::document::{document_end, head_html};

/// Separator between chapter documents in the renderer input.
const PAGE_BREAK: &str = "<P style=\"page-break-before: always\">";

/// Configuration for PDF export.
#[derive(Debug, Clone)]
pub struct PdfConfig {
    pub page_size: String,
    /// Margin on every side, in millimetres.
    pub margin_mm: u32,
    pub dpi: u32,
    /// Generate a table of contents page.
    pub toc: bool,
    /// Link section headings back to the table of contents.
    pub toc_back_links: bool,
    pub toc_title: String,
    pub toc_header_font_size: u32,
    pub toc_level_indentation: u32,
    pub toc_text_size_shrink: f64,
    pub footer_font_size: u32,
    pub lang: String,
    pub layout: LayoutConfig,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            page_size: "A4".to_string(),
            margin_mm: 15,
            dpi: 300,
            toc: true,
            toc_back_links: true,
            toc_title: "目 录".to_string(),
            toc_header_font_size: 18,
            toc_level_indentation: 15,
            toc_text_size_shrink: 0.9,
            footer_font_size: 10,
            lang: "zh-CN".to_string(),
            layout: LayoutConfig::default(),
        }
    }
}

/// Renderer input: the paginated body and the optional cover document.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfDocuments {
    pub body: String,
    pub cover: Option<String>,
}

/// Turns HTML documents into PDF bytes.
pub trait PdfRenderer: Send + Sync {
    fn render(&self, documents: &PdfDocuments, config: &PdfConfig, out: &mut dyn Write) -> Result<()>;
}

/// Same images as HTML, but chapter 0's block images move to the cover.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfFlavor;

impl Flavor for PdfFlavor {
    fn render_image(&self, image: &ImageRender<'_>) -> RenderedImage {
        RenderedImage {
            markup: standard_image(image),
            aside: None,
        }
    }

    fn suppresses_cover(&self) -> bool {
        true
    }
}

/// PDF format exporter.
pub struct PdfExporter {
    config: PdfConfig,
    renderer: Box<dyn PdfRenderer>,
}

impl PdfExporter {
    /// Create a new exporter rendering through `wkhtmltopdf`.
    pub fn new() -> Self {
        Self {
            config: PdfConfig::default(),
            renderer: Box::new(WkhtmltopdfRenderer::new()),
        }
    }

    /// Configure the exporter with custom settings.
    pub fn with_config(mut self, config: PdfConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_renderer(mut self, renderer: impl PdfRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Build the renderer input without rendering it.
    pub fn documents(&self, book: &Book) -> Result<PdfDocuments> {
        let ctx = RunContext::build(book, self.config.layout.clone());
        let document = assemble_book(book, &ctx, &PdfFlavor)?;

        let mut body = String::new();
        for chapter in &document.chapters {
            let mut page = head_html(&self.config.lang, &book.title);
            page.push_str(&chapter.body);
            page.push_str(document_end());
            body.push_str(&decode_cosmetic_entities(&page));
            body.push_str(PAGE_BREAK);
        }

        let cover = document.cover.map(|cover| {
            let mut page = head_html(&self.config.lang, &book.title);
            page.push_str(&cover.markup);
            page.push_str(document_end());
            decode_cosmetic_entities(&page)
        });

        Ok(PdfDocuments { body, cover })
    }
}

impl Default for PdfExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Exporter for PdfExporter {
    fn export<W: Write + Seek>(&self, book: &Book, writer: &mut W) -> Result<()> {
        let documents = self.documents(book)?;
        debug!(
            body = documents.body.len(),
            cover = documents.cover.is_some(),
            "prepared PDF input"
        );
        self.renderer.render(&documents, &self.config, writer)?;
        info!(chapters = book.chapters.len(), "wrote PDF");
        Ok(())
    }
}

/// Renders through the `wkhtmltopdf` command-line tool.
#[derive(Debug, Clone)]
pub struct WkhtmltopdfRenderer {
    binary: PathBuf,
}

impl WkhtmltopdfRenderer {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("wkhtmltopdf"),
        }
    }

    /// Use a specific executable instead of the one on `PATH`.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Command-line arguments: global options, cover, TOC, page, output.
    pub(crate) fn arguments(
        config: &PdfConfig,
        cover: Option<&Path>,
        body: &Path,
        output: &Path,
    ) -> Vec<OsString> {
        let margin = format!("{}mm", config.margin_mm);
        let mut args: Vec<OsString> = Vec::new();
        let mut push = |values: &[&str]| args.extend(values.iter().map(|v| OsString::from(*v)));

        push(&["--dpi", &config.dpi.to_string(), "--page-size", &config.page_size]);
        push(&["--margin-top", &margin, "--margin-bottom", &margin]);
        push(&["--margin-left", &margin, "--margin-right", &margin]);

        if let Some(cover) = cover {
            push(&["cover", &file_url(cover), "--enable-local-file-access"]);
        }

        if config.toc {
            push(&["toc", "--toc-header-text", &config.toc_title]);
            push(&["--header-font-size", &config.toc_header_font_size.to_string()]);
            push(&["--toc-level-indentation", &config.toc_level_indentation.to_string()]);
            push(&["--toc-text-size-shrink", &config.toc_text_size_shrink.to_string()]);
        }

        push(&["page", &file_url(body)]);
        push(&["--footer-font-size", &config.footer_font_size.to_string()]);
        push(&["--footer-right", "[page]", "--disable-smart-shrinking", "--enable-local-file-access"]);
        if config.toc && config.toc_back_links {
            push(&["--enable-toc-back-links"]);
        }

        args.push(output.as_os_str().to_os_string());
        args
    }
}

impl Default for WkhtmltopdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfRenderer for WkhtmltopdfRenderer {
    fn render(&self, documents: &PdfDocuments, config: &PdfConfig, out: &mut dyn Write) -> Result<()> {
        let body = write_temp(&documents.body, ".html")?;
        let cover = documents
            .cover
            .as_deref()
            .map(|cover| write_temp(cover, ".html"))
            .transpose()?;
        let output = tempfile::Builder::new().suffix(".pdf").tempfile()?;

        let args = Self::arguments(
            config,
            cover.as_ref().map(|c| c.path()),
            body.path(),
            output.path(),
        );
        debug!(binary = %self.binary.display(), ?args, "running wkhtmltopdf");

        let result = Command::new(&self.binary).args(&args).output().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::Render(format!("{} not found", self.binary.display()))
            } else {
                Error::Io(e)
            }
        })?;
        if !result.status.success() {
            return Err(Error::Render(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        let pdf = fs::read(output.path())?;
        out.write_all(&pdf)?;
        Ok(())
    }
}

fn write_temp(content: &str, suffix: &str) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file)
}

fn file_url(path: &Path) -> String {
    if cfg!(windows) {
        path.display().to_string()
    } else {
        format!("file://{}", path.display())
    }
}
