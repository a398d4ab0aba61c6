//! EPUB exporter.
//!
//! Every chapter becomes a standalone XHTML document. Narrow footnote images
//! turn into pop-up notes (`epub:type="noteref"` links to `<aside>` bodies),
//! and the first chapter's lead image is packaged as the cover instead of
//! being rendered in the flow.

use std::collections::HashMap;
use std::io::{Seek, Write};
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, info, warn};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::assemble::{CoverImage, Flavor, ImageRender, RenderedImage, assemble_book, wrap_styled};
use crate::book::{Book, TocEntry};
use crate::context::RunContext;
use crate::error::Result;
use crate::layout::LayoutConfig;
use crate::util::{escape_html, escape_xml, format_px};

use super::Exporter;
use super::cover::{CoverFetcher, file_name};
use super::document::{document_end, head_html};

static LOCAL_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r##"href="#([^"]+)""##).expect("valid href regex"));

/// Configuration for EPUB export.
#[derive(Debug, Clone)]
pub struct EpubConfig {
    /// Compression level for deflate (0-9, default 6).
    pub compression_level: Option<u32>,
    /// Book language, written to the package metadata and every chapter.
    pub lang: String,
    pub layout: LayoutConfig,
}

impl Default for EpubConfig {
    fn default() -> Self {
        Self {
            compression_level: None,
            lang: "zh-CN".to_string(),
            layout: LayoutConfig::default(),
        }
    }
}

/// One chapter document with the TOC entries that point into it.
#[derive(Debug, Clone, PartialEq)]
pub struct EpubChapter {
    pub content: String,
    pub chapter_id: String,
    pub toc: Vec<TocEntry>,
}

/// Footnote images become note references; the cover leaves the flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpubFlavor;

impl Flavor for EpubFlavor {
    fn render_image(&self, image: &ImageRender<'_>) -> RenderedImage {
        let glyph = image.glyph;
        let src = escape_html(&glyph.href);
        let alt = escape_html(&glyph.alt);
        let width = format_px(image.width);

        if image.inline && !glyph.class.is_empty() {
            let id = &image.footnote_id;
            let markup = format!(
                "\n\t<sup><a class=\"duokan-footnote\" epub:type=\"noteref\" href=\"#{id}\"><img width=\"{width}\" src=\"{src}\" alt=\"{alt}\" zy-footnote=\"{alt}\" class=\"{} zhangyue-footnote qqreader-footnote\"/></a></sup>",
                escape_html(&glyph.class)
            );
            let aside = format!(
                "<aside epub:type=\"footnote\" id=\"{id}\"><ol class=\"duokan-footnote-content\" style=\"list-style:none;padding:0px;margin:0px;\"><li class=\"duokan-footnote-item\">{alt}</li></ol></aside>"
            );
            return RenderedImage {
                markup,
                aside: Some(aside),
            };
        }

        let img = format!("\n\t<img width=\"{width}\" src=\"{src}\" alt=\"{alt}\"/>");
        RenderedImage {
            markup: wrap_styled(img, &image.style),
            aside: None,
        }
    }

    fn suppresses_cover(&self) -> bool {
        true
    }
}

/// EPUB format exporter.
///
/// # Example
///
/// ```no_run
/// use svgbook::Book;
/// use svgbook::export::{EpubExporter, Exporter, FsCoverFetcher};
/// use std::fs::File;
///
/// let book = Book::from_json(&std::fs::read_to_string("book.json")?)?;
/// let mut file = File::create("book.epub")?;
/// EpubExporter::new()
///     .with_cover_fetcher(FsCoverFetcher::new("covers"))
///     .export(&book, &mut file)?;
/// # Ok::<(), svgbook::Error>(())
/// ```
pub struct EpubExporter {
    config: EpubConfig,
    fetcher: Option<Box<dyn CoverFetcher>>,
}

impl EpubExporter {
    /// Create a new exporter with default configuration and no cover fetcher.
    pub fn new() -> Self {
        Self {
            config: EpubConfig::default(),
            fetcher: None,
        }
    }

    /// Configure the exporter with custom settings.
    pub fn with_config(mut self, config: EpubConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cover_fetcher(mut self, fetcher: impl CoverFetcher + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    /// Assemble the chapter documents and locate the cover, without packaging.
    pub fn chapters(&self, book: &Book) -> Result<(Vec<EpubChapter>, Option<CoverImage>)> {
        let ctx = RunContext::build(book, self.config.layout.clone());
        let document = assemble_book(book, &ctx, &EpubFlavor)?;

        let mut toc_by_chapter: HashMap<&str, Vec<TocEntry>> = HashMap::new();
        for entry in &book.toc {
            toc_by_chapter
                .entry(entry.chapter_href())
                .or_default()
                .push(entry.clone());
        }

        let ids: Vec<&str> = document
            .chapters
            .iter()
            .map(|c| c.chapter_id.as_str())
            .collect();

        let chapters = document
            .chapters
            .iter()
            .map(|chapter| {
                let mut content = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
                content.push_str(&head_html(&self.config.lang, &book.title));
                content.push_str(&retarget_links(&chapter.body, &chapter.chapter_id, &ids));
                content.push_str(document_end());
                EpubChapter {
                    content,
                    chapter_id: chapter.chapter_id.clone(),
                    toc: toc_by_chapter
                        .get(chapter.chapter_id.as_str())
                        .cloned()
                        .unwrap_or_default(),
                }
            })
            .collect();

        Ok((chapters, document.cover))
    }

    fn fetch_cover(&self, cover: Option<&CoverImage>) -> Option<(String, Vec<u8>)> {
        let cover = cover?;
        let Some(fetcher) = &self.fetcher else {
            debug!(href = %cover.href, "no cover fetcher configured");
            return None;
        };
        match fetcher.fetch(&cover.href) {
            Ok(bytes) => {
                let ext = Path::new(file_name(&cover.href))
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_ascii_lowercase)
                    .unwrap_or_else(|| "jpg".to_string());
                Some((format!("Images/cover.{ext}"), bytes))
            }
            Err(e) => {
                warn!(href = %cover.href, error = %e, "cover fetch failed, continuing without cover");
                None
            }
        }
    }
}

impl Default for EpubExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Exporter for EpubExporter {
    fn export<W: Write + Seek>(&self, book: &Book, writer: &mut W) -> Result<()> {
        let (chapters, cover) = self.chapters(book)?;
        let cover = self.fetch_cover(cover.as_ref());

        let mut zip = ZipWriter::new(writer);

        let compression_level = self.config.compression_level.unwrap_or(6);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(compression_level as i64));

        // 1. Write mimetype (must be first, uncompressed)
        zip.start_file("mimetype", stored)?;
        zip.write_all(b"application/epub+zip")?;

        // 2. Write container.xml
        zip.start_file("META-INF/container.xml", deflated)?;
        zip.write_all(CONTAINER_XML)?;

        // 3. Collect manifest and spine
        let files: Vec<String> = chapters
            .iter()
            .map(|c| format!("Text/{}", chapter_file(&c.chapter_id)))
            .collect();
        let mut manifest_items: Vec<ManifestItem> = files
            .iter()
            .enumerate()
            .map(|(i, href)| ManifestItem {
                id: format!("chapter_{i}"),
                href: href.clone(),
                media_type: "application/xhtml+xml".to_string(),
                properties: None,
            })
            .collect();
        let spine_refs: Vec<String> = manifest_items.iter().map(|m| m.id.clone()).collect();
        manifest_items.push(ManifestItem {
            id: "nav".to_string(),
            href: "nav.xhtml".to_string(),
            media_type: "application/xhtml+xml".to_string(),
            properties: Some("nav"),
        });
        if let Some((href, _)) = &cover {
            manifest_items.push(ManifestItem {
                id: "cover-image".to_string(),
                href: href.clone(),
                media_type: guess_media_type(href),
                properties: Some("cover-image"),
            });
        }

        // 4. Write content.opf
        let opf = generate_opf(&book.title, &self.config.lang, &manifest_items, &spine_refs, cover.is_some());
        zip.start_file("OEBPS/content.opf", deflated)?;
        zip.write_all(opf.as_bytes())?;

        // 5. Write toc.ncx
        let ncx = generate_ncx(&book.title, &chapters);
        zip.start_file("OEBPS/toc.ncx", deflated)?;
        zip.write_all(ncx.as_bytes())?;

        // 6. Write the EPUB 3 navigation document
        let nav = generate_nav(&book.title, &self.config.lang, &chapters);
        zip.start_file("OEBPS/nav.xhtml", deflated)?;
        zip.write_all(nav.as_bytes())?;

        // 7. Write chapters
        for (chapter, href) in chapters.iter().zip(&files) {
            zip.start_file(format!("OEBPS/{href}"), deflated)?;
            zip.write_all(chapter.content.as_bytes())?;
        }

        // 8. Write cover
        if let Some((href, bytes)) = &cover {
            zip.start_file(format!("OEBPS/{href}"), stored)?;
            zip.write_all(bytes)?;
        }

        zip.finish()?;
        info!(chapters = chapters.len(), cover = cover.is_some(), "wrote EPUB");
        Ok(())
    }
}

/// File name of a chapter inside `OEBPS/Text/`.
fn chapter_file(chapter_id: &str) -> String {
    let name = sanitize_path(chapter_id).replace('/', "_");
    if name.ends_with(".xhtml") || name.ends_with(".html") {
        name
    } else {
        format!("{name}.xhtml")
    }
}

/// Point footnote links at the chapter document that holds the target.
///
/// Assembled links are document-local (`#{chapter}_{fragment}`); once
/// chapters are split into files, targets in other chapters need the file
/// name in front.
fn retarget_links(body: &str, current: &str, chapter_ids: &[&str]) -> String {
    LOCAL_HREF_RE
        .replace_all(body, |caps: &Captures| {
            let target = &caps[1];
            let owner = chapter_ids
                .iter()
                .filter(|id| {
                    target
                        .strip_prefix(**id)
                        .is_some_and(|rest| rest.starts_with('_'))
                })
                .max_by_key(|id| id.len());
            match owner {
                Some(id) if *id != current => {
                    format!("href=\"{}#{target}\"", chapter_file(id))
                }
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Container.xml template.
const CONTAINER_XML: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

struct ManifestItem {
    id: String,
    /// Relative to `OEBPS/`.
    href: String,
    media_type: String,
    properties: Option<&'static str>,
}

fn generate_opf(
    title: &str,
    lang: &str,
    manifest: &[ManifestItem],
    spine_refs: &[String],
    has_cover: bool,
) -> String {
    let mut opf = String::new();

    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
"#,
    );
    opf.push_str(&format!("    <dc:title>{}</dc:title>\n", escape_xml(title)));
    let lang = if lang.is_empty() { "en" } else { lang };
    opf.push_str(&format!("    <dc:language>{}</dc:language>\n", escape_xml(lang)));
    opf.push_str("    <dc:identifier id=\"BookId\">urn:uuid:00000000-0000-0000-0000-000000000000</dc:identifier>\n");
    opf.push_str("    <meta property=\"dcterms:modified\">2024-01-01T00:00:00Z</meta>\n");
    if has_cover {
        opf.push_str("    <meta name=\"cover\" content=\"cover-image\"/>\n");
    }
    opf.push_str("  </metadata>\n");

    // Manifest
    opf.push_str("  <manifest>\n");
    opf.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );
    for item in manifest {
        let properties = item
            .properties
            .map(|p| format!(" properties=\"{p}\""))
            .unwrap_or_default();
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{properties}/>\n",
            escape_xml(&item.id),
            escape_xml(&item.href),
            escape_xml(&item.media_type)
        ));
    }
    opf.push_str("  </manifest>\n");

    // Spine
    opf.push_str("  <spine toc=\"ncx\">\n");
    for id in spine_refs {
        opf.push_str(&format!("    <itemref idref=\"{}\"/>\n", escape_xml(id)));
    }
    opf.push_str("  </spine>\n");

    opf.push_str("</package>\n");
    opf
}

/// Generate toc.ncx, nesting navPoints by TOC level.
fn generate_ncx(title: &str, chapters: &[EpubChapter]) -> String {
    let mut ncx = String::new();

    ncx.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="urn:uuid:00000000-0000-0000-0000-000000000000"/>
"#,
    );

    let entries: Vec<(&EpubChapter, &TocEntry)> = chapters
        .iter()
        .flat_map(|c| c.toc.iter().map(move |e| (c, e)))
        .collect();
    let depth = entries.iter().map(|(_, e)| e.level + 1).max().unwrap_or(1);

    ncx.push_str(&format!("    <meta name=\"dtb:depth\" content=\"{depth}\"/>\n"));
    ncx.push_str(
        r#"    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>"#,
    );
    ncx.push_str(&escape_xml(title));
    ncx.push_str(
        r#"</text>
  </docTitle>
  <navMap>
"#,
    );

    let mut open: Vec<usize> = Vec::new();
    for (play_order, (chapter, entry)) in entries.iter().enumerate() {
        while let Some(&level) = open.last()
            && level >= entry.level
        {
            open.pop();
            ncx.push_str(&format!("{}</navPoint>\n", "  ".repeat(open.len() + 2)));
        }

        let indent = "  ".repeat(open.len() + 2);
        let src = toc_src(chapter, entry);
        let order = play_order + 1;
        ncx.push_str(&format!(
            "{indent}<navPoint id=\"navPoint-{order}\" playOrder=\"{order}\">\n"
        ));
        ncx.push_str(&format!(
            "{indent}  <navLabel><text>{}</text></navLabel>\n",
            escape_xml(&entry.text)
        ));
        ncx.push_str(&format!("{indent}  <content src=\"{}\"/>\n", escape_xml(&src)));
        open.push(entry.level);
    }
    while open.pop().is_some() {
        ncx.push_str(&format!("{}</navPoint>\n", "  ".repeat(open.len() + 2)));
    }

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

/// Generate nav.xhtml from the same entries as the NCX, nesting `<ol>`s by
/// TOC level. A book without TOC entries gets a single link to its first
/// chapter so the list is never empty.
fn generate_nav(title: &str, lang: &str, chapters: &[EpubChapter]) -> String {
    let title = escape_xml(title);
    let lang = escape_xml(if lang.is_empty() { "en" } else { lang });
    let mut nav = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="{lang}" xml:lang="{lang}">
<head>
  <title>{title}</title>
</head>
<body>
  <nav epub:type="toc" id="toc">
    <h1>{title}</h1>
    <ol>
"#
    );

    let entries: Vec<(&EpubChapter, &TocEntry)> = chapters
        .iter()
        .flat_map(|c| c.toc.iter().map(move |e| (c, e)))
        .collect();

    if entries.is_empty()
        && let Some(first) = chapters.first()
    {
        nav.push_str(&format!(
            "<li><a href=\"Text/{}\">{title}</a></li>\n",
            escape_xml(&chapter_file(&first.chapter_id))
        ));
    }

    // Open <li> levels, and whether each already holds a nested <ol>.
    let mut open: Vec<(usize, bool)> = Vec::new();
    let close = |nav: &mut String, open: &mut Vec<(usize, bool)>| {
        if let Some((_, nested)) = open.pop() {
            if nested {
                nav.push_str("</ol>\n");
            }
            nav.push_str("</li>\n");
        }
    };
    for (chapter, entry) in &entries {
        while let Some(&(level, _)) = open.last()
            && level >= entry.level
        {
            close(&mut nav, &mut open);
        }
        if let Some(parent) = open.last_mut()
            && !parent.1
        {
            nav.push_str("<ol>\n");
            parent.1 = true;
        }
        nav.push_str(&format!(
            "<li><a href=\"{}\">{}</a>",
            escape_xml(&toc_src(chapter, entry)),
            escape_xml(&entry.text)
        ));
        open.push((entry.level, false));
    }
    while !open.is_empty() {
        close(&mut nav, &mut open);
    }

    nav.push_str("    </ol>\n  </nav>\n</body>\n</html>\n");
    nav
}

/// Package-relative target of a TOC entry.
fn toc_src(chapter: &EpubChapter, entry: &TocEntry) -> String {
    let mut src = format!("Text/{}", chapter_file(&chapter.chapter_id));
    if let Some(fragment) = entry.fragment() {
        src.push('#');
        src.push_str(fragment);
    }
    src
}

/// Sanitize a path for use in ZIP (remove leading slashes, normalize).
fn sanitize_path(path: &str) -> String {
    path.trim_start_matches('/')
        .replace('\\', "/")
        .replace("//", "/")
}

/// Guess media type from file extension.
fn guess_media_type(path: &str) -> String {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        "png" => "image/png".to_string(),
        "gif" => "image/gif".to_string(),
        "webp" => "image/webp".to_string(),
        "svg" => "image/svg+xml".to_string(),
        _ => "application/octet-stream".to_string(),
    }
}
