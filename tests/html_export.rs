//! End-to-end HTML reconstruction.

use std::io::Cursor;

use svgbook::export::{Exporter, HtmlExporter};
use svgbook::{Book, ChapterSource, TocEntry};

fn sample_book() -> Book {
    let preface = r#"<svg>
        <text x="0" y="20" height="20">A short preface.</text>
        <text x="0" y="60" height="20">See note</text>
        <text x="120" y="60" height="20"><a href="/OEBPS/Text/c2.xhtml#note-fwd-1">[1]</a></text>
    </svg>"#;

    let chapter = r#"<svg>
        <text x="0" y="40" height="30" id="c2-title" style="font-weight: bold;">Chapter One</text>
        <text x="0" y="100" height="20">Some text</text>
        <image x="180" y="95" width="15" height="15" href="fn.png" alt="Note 1" class="epub-footnote"/>
        <image x="30000" y="200" width="1200" height="600" href="map.png" alt="Map"/>
        <text x="0" y="900" height="20">Markup like &lt;b&gt;bold&lt;/b&gt; stays&nbsp;escaped</text>
        <text x="0" y="950" height="20"><a href="/OEBPS/Text/c1.xhtml#note-back-1">[1]</a></text>
    </svg>"#;

    Book::new("Sample")
        .with_chapter(ChapterSource::new("c2.xhtml", 2).with_content(chapter))
        .with_chapter(ChapterSource::new("c1.xhtml", 1).with_content(preface))
        .with_toc_entry(TocEntry::new("Chapter One", "c2.xhtml#c2-title").with_level(0))
}

#[test]
fn test_end_to_end_html() {
    let mut out = Cursor::new(Vec::new());
    HtmlExporter::new().export(&sample_book(), &mut out).unwrap();
    let html = String::from_utf8(out.into_inner()).unwrap();

    // Chapters in reading order, TOC block between them
    let first = html.find("<div id=\"c1.xhtml\">").unwrap();
    let toc = html.find("<div id=\"toc\">").unwrap();
    let second = html.find("<div id=\"c2.xhtml\">").unwrap();
    assert!(first < toc && toc < second);

    // Matched heading at the TOC level
    assert!(
        html.contains(
            "<div class=\"header0\"><h1><span id=\"c2-title\" style=\"font-weight: bold;\"><b>Chapter One</b></span></h1></div>"
        ),
        "{html}"
    );

    // Small image folded into the text run as a raised marker
    assert!(html.contains(
        "<p>Some text\n\t<sup><img width=\"15\" src=\"fn.png\" alt=\"Note 1\" title=\"Note 1\" class=\"epub-footnote\"/></sup></p>"
    ));

    // Large image scaled and centered
    assert!(html.contains(
        "<div style=\"display: block;text-align:center;\">\n\t<img width=\"900\" src=\"map.png\" alt=\"Map\" title=\"Map\"/></div>"
    ));

    // Escaped markup survives, cosmetic entities do not
    assert!(html.contains("Markup like &lt;b&gt;bold&lt;/b&gt; stays\u{a0}escaped"));
    assert!(!html.contains("<b>bold</b>"));
}

#[test]
fn test_footnote_links_are_paired() {
    let html = HtmlExporter::new().render(&sample_book()).unwrap();

    assert!(
        html.contains("<a id=\"c1.xhtml_note-fwd-1\" href=\"#c2.xhtml_note-back-1\">[1]</a>"),
        "{html}"
    );
    assert!(html.contains("<a id=\"c2.xhtml_note-back-1\" href=\"#c1.xhtml_note-fwd-1\">[1]</a>"));
}

#[test]
fn test_malformed_chapter_fails_whole_run() {
    let book = sample_book().with_chapter(ChapterSource::new("broken.xhtml", 3).with_content("<svg><text y=\"1\">"));
    let err = HtmlExporter::new().render(&book).unwrap_err();
    assert!(err.to_string().contains("broken.xhtml"));
}

#[test]
fn test_manifest_round_trip() {
    let json = r#"{
        "title": "From JSON",
        "chapters": [
            {"chapter_id": "a", "order_index": 0, "contents": ["<svg><text x=\"0\" y=\"5\">Hello</text></svg>"]}
        ],
        "toc": []
    }"#;
    let book = Book::from_json(json).unwrap();
    let html = HtmlExporter::new().render(&book).unwrap();
    assert!(html.contains("<title>From JSON</title>"));
    assert!(html.contains("<div id=\"a\">\n<p>Hello</p></div>"));
    assert!(!html.contains("id=\"toc\""));
}
