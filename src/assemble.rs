//! Line and paragraph assembly.
//!
//! Turns the grouped lines of a chapter into markup: styled spans, emphasis
//! tags, footnote links, headings recognised from the TOC, and images. The
//! few places where output formats differ (how an image is written, whether
//! the cover is kept in the flow) are delegated to a [`Flavor`].

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::book::{Book, ChapterSource};
use crate::context::RunContext;
use crate::error::Result;
use crate::heading::heading_tag;
use crate::layout::{Glyph, GlyphKind, Line, extract_lines};
use crate::svg::parse_fragment;
use crate::util::{escape_html, format_px};

/// An image glyph ready to be written, with its final dimensions.
#[derive(Debug, Clone)]
pub struct ImageRender<'a> {
    pub glyph: &'a Glyph,
    /// Width after clamping to the maximum image width.
    pub width: f64,
    pub height: f64,
    /// Glyph style with the line alignment appended.
    pub style: String,
    /// Narrower than the footnote-image width: folded into the text run.
    pub inline: bool,
    /// Inline, or shorter than the footnote-image height.
    pub small: bool,
    /// `footnote-{chapter}-{n}`, where `n` counts the chapter's images from 1
    /// across all lines and fragments.
    pub footnote_id: String,
}

/// Markup produced for one image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedImage {
    pub markup: String,
    /// Block emitted ahead of the line (EPUB footnote bodies).
    pub aside: Option<String>,
}

/// Per-format image rendering policy.
pub trait Flavor: Sync {
    fn render_image(&self, image: &ImageRender<'_>) -> RenderedImage;

    /// Whether chapter 0's block images are lifted out of the flow into a
    /// separate cover.
    fn suppresses_cover(&self) -> bool {
        false
    }
}

/// The lead block image of the first chapter.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverImage {
    pub href: String,
    pub alt: String,
    pub width: f64,
    pub markup: String,
}

/// Assembled markup of one chapter.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterMarkup {
    pub index: usize,
    pub chapter_id: String,
    pub body: String,
    pub cover: Option<CoverImage>,
}

/// All chapters of a book, in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledDocument {
    pub chapters: Vec<ChapterMarkup>,
    pub cover: Option<CoverImage>,
}

/// `<img>` markup shared by the HTML and PDF outputs.
///
/// Small images carrying a class are footnote markers and are raised with
/// `<sup>` instead of being wrapped in an aligned block.
pub fn standard_image(image: &ImageRender<'_>) -> String {
    let glyph = image.glyph;
    let src = escape_html(&glyph.href);
    let alt = escape_html(&glyph.alt);
    let width = format_px(image.width);

    if image.small && !glyph.class.is_empty() {
        return format!(
            "\n\t<sup><img width=\"{width}\" src=\"{src}\" alt=\"{alt}\" title=\"{alt}\" class=\"{}\"/></sup>",
            escape_html(&glyph.class)
        );
    }

    let img = format!("\n\t<img width=\"{width}\" src=\"{src}\" alt=\"{alt}\" title=\"{alt}\"/>");
    wrap_styled(img, &image.style)
}

/// Wrap markup in a styled `<div>` when there is a style to apply.
pub(crate) fn wrap_styled(markup: String, style: &str) -> String {
    if style.is_empty() {
        markup
    } else {
        format!("<div style=\"{}\">{markup}</div>", escape_html(style))
    }
}

/// Assemble every chapter of a book.
///
/// Chapters are independent once the run context exists, so they are built
/// on rayon's pool and collected back in reading order. The first failing
/// chapter aborts the whole document.
pub fn assemble_book(book: &Book, ctx: &RunContext, flavor: &dyn Flavor) -> Result<AssembledDocument> {
    let chapters = book.sorted_chapters();
    let chapters: Vec<ChapterMarkup> = chapters
        .par_iter()
        .enumerate()
        .map(|(index, source)| assemble_chapter(index, source, ctx, flavor))
        .collect::<Result<_>>()?;

    let cover = chapters.first().and_then(|c| c.cover.clone());
    Ok(AssembledDocument { chapters, cover })
}

/// Assemble one chapter. `index` is the chapter's position in reading order.
#[instrument(level = "debug", skip(source, ctx, flavor), fields(chapter_id = %source.chapter_id))]
pub fn assemble_chapter(
    index: usize,
    source: &ChapterSource,
    ctx: &RunContext,
    flavor: &dyn Flavor,
) -> Result<ChapterMarkup> {
    let mut assembler = ChapterAssembler {
        index,
        ctx,
        flavor,
        body: String::new(),
        cover: None,
        images: 0,
    };

    for fragment in &source.contents {
        let root = parse_fragment(&source.chapter_id, fragment)?;
        let lines = extract_lines(&source.chapter_id, &root, ctx);

        assembler.body.push_str("\n<div id=\"");
        assembler.body.push_str(&escape_html(&source.chapter_id));
        assembler.body.push_str("\">");
        for line in &lines {
            assembler.line(line);
        }
        assembler.body.push_str("</div>");
    }

    debug!(bytes = assembler.body.len(), "assembled chapter");
    Ok(ChapterMarkup {
        index,
        chapter_id: source.chapter_id.clone(),
        body: assembler.body,
        cover: assembler.cover,
    })
}

struct ChapterAssembler<'a> {
    index: usize,
    ctx: &'a RunContext,
    flavor: &'a dyn Flavor,
    body: String,
    cover: Option<CoverImage>,
    images: usize,
}

impl ChapterAssembler<'_> {
    fn line(&mut self, line: &Line) {
        let Some(first) = line.glyphs.first() else {
            return;
        };
        let config = &self.ctx.layout;
        let alignment = config.alignment_for(first.x);
        let line_style = line_style(&line.glyphs);

        // Inline run, its plain (escaped) text, and blocks emitted before it.
        let mut run = String::new();
        let mut plain = String::new();
        let mut blocks = String::new();
        let mut open_span: Option<&str> = None;

        for (i, glyph) in line.glyphs.iter().enumerate() {
            match glyph.kind {
                GlyphKind::Image => {
                    let (width, height) = config.scale_image(glyph.width, glyph.height);
                    let inline = width < config.footnote_image_width;
                    self.images += 1;
                    let image = ImageRender {
                        glyph,
                        width,
                        height,
                        style: format!("{}{}", glyph.style, alignment.css()),
                        inline,
                        small: inline || height < config.footnote_image_height,
                        footnote_id: format!("footnote-{}-{}", self.index, self.images),
                    };
                    let rendered = self.flavor.render_image(&image);
                    if let Some(aside) = rendered.aside {
                        blocks.push_str(&aside);
                    }
                    if inline {
                        run.push_str(&rendered.markup);
                        continue;
                    }
                    if self.index == 0 && self.cover.is_none() {
                        self.cover = Some(CoverImage {
                            href: glyph.href.clone(),
                            alt: glyph.alt.clone(),
                            width,
                            markup: rendered.markup.clone(),
                        });
                    }
                    if !(self.index == 0 && self.flavor.suppresses_cover()) {
                        blocks.push_str(&rendered.markup);
                    }
                }
                GlyphKind::Text => {
                    if let Some(style) = open_span
                        && style != glyph.style
                    {
                        run.push_str("</span>");
                        open_span = None;
                    }
                    if glyph.forces_newline && i > 0 {
                        run.push_str("<br/>");
                    }
                    if glyph.style != line_style && open_span.is_none() {
                        run.push_str("<span style=\"");
                        run.push_str(&escape_html(&glyph.style));
                        run.push_str("\">");
                        open_span = Some(&glyph.style);
                    }
                    let content = escape_html(&glyph.content);
                    push_text(&mut run, glyph, &content);
                    plain.push_str(&content);
                }
            }
        }
        if open_span.is_some() {
            run.push_str("</span>");
        }

        self.body.push_str(&blocks);

        let heading = if plain.is_empty() {
            None
        } else {
            self.ctx.headings.match_line(&plain)
        };
        let wrapper_style = format!("{line_style}{}", alignment.css());
        // A leading footnote anchor already carries the id on its <a>.
        let line_id = if first.footnote.is_some() { "" } else { first.id.as_str() };

        match (heading, plain.is_empty()) {
            (Some(level), _) => {
                let tag = heading_tag(level);
                self.body
                    .push_str(&format!("\n<div class=\"header{level}\"><{tag}>"));
                push_wrapped(&mut self.body, line_id, &wrapper_style, &run);
                self.body.push_str(&format!("</{tag}></div>"));
            }
            (None, false) => {
                self.body.push_str("\n<p>");
                push_wrapped(&mut self.body, line_id, &wrapper_style, &run);
                self.body.push_str("</p>");
            }
            (None, true) => push_wrapped(&mut self.body, line_id, &wrapper_style, &run),
        }
    }
}

/// Style of the last text glyph: the last glyph, or the one before a trailing
/// image, falling back to the first glyph.
fn line_style(glyphs: &[Glyph]) -> &str {
    match glyphs {
        [] => "",
        [.., last] if !last.is_image() => &last.style,
        [.., before, _] => &before.style,
        [only] => &only.style,
    }
}

/// Emphasis tags, outermost first.
fn push_text(run: &mut String, glyph: &Glyph, content: &str) {
    let tags = [
        (glyph.bold, "b"),
        (glyph.italic, "i"),
        (glyph.is_footnote_ref, "sup"),
        (glyph.is_sub, "sub"),
    ];
    for (_, tag) in tags.iter().filter(|(on, _)| *on) {
        run.push('<');
        run.push_str(tag);
        run.push('>');
    }

    match &glyph.footnote {
        Some(link) => {
            run.push_str("<a");
            if !glyph.id.is_empty() {
                run.push_str(&format!(" id=\"{}\"", escape_html(&glyph.id)));
            }
            run.push_str(&format!(" href=\"{}\"", escape_html(&link.href)));
            if !link.style.is_empty() {
                run.push_str(&format!(" style=\"{}\"", escape_html(&link.style)));
            }
            run.push('>');
            run.push_str(content);
            run.push_str("</a>");
        }
        None => run.push_str(content),
    }

    for (_, tag) in tags.iter().rev().filter(|(on, _)| *on) {
        run.push_str("</");
        run.push_str(tag);
        run.push('>');
    }
}

/// Write a run inside `<span id style>`, omitting the span when it would
/// carry nothing.
fn push_wrapped(out: &mut String, id: &str, style: &str, run: &str) {
    if run.is_empty() {
        return;
    }
    if id.is_empty() && style.is_empty() {
        out.push_str(run);
        return;
    }
    out.push_str("<span");
    if !id.is_empty() {
        out.push_str(&format!(" id=\"{}\"", escape_html(id)));
    }
    if !style.is_empty() {
        out.push_str(&format!(" style=\"{}\"", escape_html(style)));
    }
    out.push('>');
    out.push_str(run);
    out.push_str("</span>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::TocEntry;
    use crate::footnote::FootnoteDelimiters;
    use crate::heading::HeadingIndex;
    use crate::layout::{LayoutConfig, PAGE_WIDTH};

    struct Plain;

    impl Flavor for Plain {
        fn render_image(&self, image: &ImageRender<'_>) -> RenderedImage {
            RenderedImage {
                markup: standard_image(image),
                aside: None,
            }
        }
    }

    struct CoverLifting;

    impl Flavor for CoverLifting {
        fn render_image(&self, image: &ImageRender<'_>) -> RenderedImage {
            RenderedImage {
                markup: standard_image(image),
                aside: Some(format!("<aside id=\"{}\"></aside>", image.footnote_id)),
            }
        }

        fn suppresses_cover(&self) -> bool {
            true
        }
    }

    fn chapter(index: usize, svg: &str, ctx: &RunContext, flavor: &dyn Flavor) -> ChapterMarkup {
        let source = ChapterSource::new("c1", index).with_content(svg);
        assemble_chapter(index, &source, ctx, flavor).unwrap()
    }

    #[test]
    fn test_paragraph_and_container() {
        let out = chapter(1, r#"<svg><text x="10" y="10">Hello</text></svg>"#, &RunContext::default(), &Plain);
        assert_eq!(out.body, "\n<div id=\"c1\">\n<p>Hello</p></div>");
    }

    #[test]
    fn test_heading_from_toc() {
        let ctx = RunContext {
            headings: HeadingIndex::from_toc(&[TocEntry::new("Chapter One", "c1#h").with_level(1)]),
            ..Default::default()
        };
        let out = chapter(
            1,
            r#"<svg><text x="10" y="10" id="h">Chapter</text><text x="90" y="10"> One</text></svg>"#,
            &ctx,
            &Plain,
        );
        assert!(
            out.body
                .contains("<div class=\"header1\"><h2><span id=\"h\">Chapter One</span></h2></div>"),
            "{}",
            out.body
        );
    }

    #[test]
    fn test_style_changes_open_spans() {
        let out = chapter(
            1,
            r#"<svg>
                <text x="0" y="10" style="fill:red;">A</text>
                <text x="5" y="10" style="fill:red;">B</text>
                <text x="9" y="10" style="fill:blue;">C</text>
            </svg>"#,
            &RunContext::default(),
            &Plain,
        );
        assert!(
            out.body.contains(
                "<p><span style=\"color:blue;\"><span style=\"color:red;\">AB</span>C</span></p>"
            ),
            "{}",
            out.body
        );
    }

    #[test]
    fn test_emphasis_nesting_and_escaping() {
        let out = chapter(
            1,
            r#"<svg><text x="0" y="10" style="font-weight: bold;font-style: italic;">a &lt; b</text></svg>"#,
            &RunContext::default(),
            &Plain,
        );
        assert!(out.body.contains("<b><i>a &lt; b</i></b>"), "{}", out.body);
    }

    #[test]
    fn test_image_alignment_bands() {
        let svg = format!(
            r#"<svg>
                <image x="{}" y="10" width="100" height="50" href="c.png"/>
                <image x="{}" y="20" width="100" height="50" href="r.png"/>
                <image x="{}" y="30" width="100" height="50" href="n.png"/>
            </svg>"#,
            0.5 * PAGE_WIDTH,
            0.95 * PAGE_WIDTH,
            0.1 * PAGE_WIDTH
        );
        let out = chapter(1, &svg, &RunContext::default(), &Plain);
        assert!(out.body.contains(
            "<div style=\"display: block;text-align:center;\">\n\t<img width=\"100\" src=\"c.png\""
        ));
        assert!(out.body.contains(
            "<div style=\"display: block;text-align:right;\">\n\t<img width=\"100\" src=\"r.png\""
        ));
        assert!(out.body.contains("</div>\n\t<img width=\"100\" src=\"n.png\" alt=\"\" title=\"\"/>"));
    }

    #[test]
    fn test_large_image_scaled() {
        let out = chapter(
            1,
            r#"<svg><image x="0" y="10" width="1200" height="600" href="big.png" alt="Map"/></svg>"#,
            &RunContext::default(),
            &Plain,
        );
        assert!(out.body.contains("<img width=\"900\" src=\"big.png\" alt=\"Map\" title=\"Map\"/>"));
    }

    #[test]
    fn test_small_image_folded_into_run() {
        let out = chapter(
            1,
            r#"<svg>
                <text x="0" y="100" height="20">See</text>
                <image x="80" y="95" width="15" height="15" href="n.png" class="epub-footnote"/>
            </svg>"#,
            &RunContext::default(),
            &Plain,
        );
        assert!(
            out.body.contains(
                "<p>See\n\t<sup><img width=\"15\" src=\"n.png\" alt=\"\" title=\"\" class=\"epub-footnote\"/></sup></p>"
            ),
            "{}",
            out.body
        );
    }

    #[test]
    fn test_cover_lifted_from_first_chapter() {
        let svg = r#"<svg><image x="0" y="10" width="600" height="800" href="cover.jpg"/><text x="0" y="900">Title</text></svg>"#;
        let first = chapter(0, svg, &RunContext::default(), &CoverLifting);
        assert!(!first.body.contains("cover.jpg"));
        assert!(first.body.contains("<aside id=\"footnote-0-1\"></aside>"));
        let cover = first.cover.unwrap();
        assert_eq!(cover.href, "cover.jpg");
        assert_eq!(cover.width, 600.0);

        let kept = chapter(0, svg, &RunContext::default(), &Plain);
        assert!(kept.body.contains("cover.jpg"));
        assert!(kept.cover.is_some());

        let later = chapter(3, svg, &RunContext::default(), &CoverLifting);
        assert!(later.body.contains("cover.jpg"));
        assert!(later.cover.is_none());
    }

    #[test]
    fn test_forced_newline_inside_line() {
        let out = chapter(
            1,
            r#"<svg><text x="0" y="10">One</text><text x="50" y="10" newline="true">Two</text></svg>"#,
            &RunContext::default(),
            &Plain,
        );
        assert!(out.body.contains("<p>One<br/>Two</p>"), "{}", out.body);
    }

    #[test]
    fn test_footnote_ids_count_across_lines_and_fragments() {
        let line = |y: u32, alt: &str| {
            format!(
                r#"<text x="0" y="{y}" height="20">Claim</text><image x="90" y="{y}" width="12" height="12" href="fn.png" alt="{alt}" class="epub-footnote"/>"#
            )
        };
        let source = ChapterSource::new("c1", 2)
            .with_content(format!("<svg>{}{}</svg>", line(100, "one"), line(200, "two")))
            .with_content(format!("<svg>{}</svg>", line(100, "three")));
        let out = assemble_chapter(2, &source, &RunContext::default(), &CoverLifting).unwrap();

        for id in ["footnote-2-1", "footnote-2-2", "footnote-2-3"] {
            assert_eq!(out.body.matches(&format!("id=\"{id}\"")).count(), 1, "{}", out.body);
        }
    }

    #[test]
    fn test_leading_footnote_anchor_keeps_single_id() {
        let ctx = RunContext {
            delimiters: FootnoteDelimiters::new("note-fwd-", "note-back-"),
            ..Default::default()
        };
        let out = chapter(
            1,
            r#"<svg><text x="0" y="10" height="20"><a href="/OEBPS/Text/c9.xhtml#note-fwd-1">[1]</a></text><text x="40" y="10" height="20"> Note body</text></svg>"#,
            &ctx,
            &Plain,
        );
        assert_eq!(out.body.matches("id=\"c1_note-fwd-1\"").count(), 1, "{}", out.body);
        assert!(out.body.contains(
            "<p><a id=\"c1_note-fwd-1\" href=\"#c9.xhtml_note-back-1\">[1]</a> Note body</p>"
        ));
    }

    #[test]
    fn test_image_width_limit_is_configurable() {
        let ctx = RunContext {
            layout: LayoutConfig::default().with_max_image_width(600.0),
            ..Default::default()
        };
        let out = chapter(
            1,
            r#"<svg><image x="0" y="10" width="1200" height="600" href="big.png"/></svg>"#,
            &ctx,
            &Plain,
        );
        assert!(out.body.contains("<img width=\"600\" src=\"big.png\""), "{}", out.body);
    }

    #[test]
    fn test_malformed_fragment_fails() {
        let source = ChapterSource::new("bad", 0).with_content("<svg><text y=\"1\">x</svg>");
        let err = assemble_chapter(0, &source, &RunContext::default(), &Plain).unwrap_err();
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_assemble_book_keeps_reading_order() {
        let book = Book::new("T")
            .with_chapter(ChapterSource::new("b", 2).with_content(r#"<svg><text y="1">B</text></svg>"#))
            .with_chapter(ChapterSource::new("a", 1).with_content(r#"<svg><text y="1">A</text></svg>"#));
        let doc = assemble_book(&book, &RunContext::default(), &Plain).unwrap();
        let ids: Vec<&str> = doc.chapters.iter().map(|c| c.chapter_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(doc.chapters[1].index, 1);
    }
}
