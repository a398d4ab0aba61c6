//! Benchmarks for the reconstruction pipeline.
//!
//! Run with: cargo bench

use std::io::Cursor;

use criterion::{Criterion, criterion_group, criterion_main};

use svgbook::assemble::assemble_book;
use svgbook::export::{EpubExporter, Exporter, HtmlExporter, HtmlFlavor};
use svgbook::layout::extract_lines;
use svgbook::svg::parse_fragment;
use svgbook::{Book, ChapterSource, LayoutConfig, RunContext, TocEntry};

/// A chapter of `lines` lines, each a few styled runs plus the odd
/// footnote marker and figure.
fn synthetic_chapter(index: usize, lines: usize) -> String {
    let mut svg = String::from("<svg>");
    for line in 0..lines {
        let y = 40 + line * 32;
        svg.push_str(&format!(
            r#"<text x="0" y="{y}" top="{}" height="24" len="18" style="fill:#333;">Line {line} of chapter {index}, </text>"#,
            y - 20
        ));
        svg.push_str(&format!(
            r#"<text x="400" y="{y}" top="{}" height="24" len="12" style="fill:#333;font-weight: bold;">with emphasis</text>"#,
            y - 20
        ));
        if line % 7 == 0 {
            svg.push_str(&format!(
                r#"<text x="560" y="{}" top="{}" height="14">{}</text>"#,
                y - 4,
                y - 26,
                line / 7 + 1
            ));
        }
        if line % 25 == 0 {
            svg.push_str(&format!(
                r#"<image x="30000" y="{}" width="1200" height="800" href="fig{line}.png" alt="Figure"/>"#,
                y + 8
            ));
        }
    }
    svg.push_str("</svg>");
    svg
}

fn synthetic_book(chapters: usize, lines: usize) -> Book {
    let mut book = Book::new("Benchmark");
    for i in 0..chapters {
        book = book
            .with_chapter(ChapterSource::new(format!("c{i}.xhtml"), i).with_content(synthetic_chapter(i, lines)))
            .with_toc_entry(TocEntry::new(format!("Line 0 of chapter {i}, "), format!("c{i}.xhtml")));
    }
    book
}

fn bench_extract_lines(c: &mut Criterion) {
    let svg = synthetic_chapter(0, 400);
    let root = parse_fragment("c0", &svg).unwrap();
    let ctx = RunContext::default();

    c.bench_function("parse_fragment", |b| {
        b.iter(|| parse_fragment("c0", &svg).unwrap());
    });
    c.bench_function("extract_lines", |b| {
        b.iter(|| extract_lines("c0", &root, &ctx));
    });
}

fn bench_assemble_book(c: &mut Criterion) {
    let book = synthetic_book(40, 200);
    let ctx = RunContext::build(&book, LayoutConfig::default());

    c.bench_function("assemble_book", |b| {
        b.iter(|| assemble_book(&book, &ctx, &HtmlFlavor).unwrap());
    });
}

fn bench_export(c: &mut Criterion) {
    let book = synthetic_book(40, 200);

    c.bench_function("write_html", |b| {
        b.iter(|| {
            let mut output = Cursor::new(Vec::new());
            HtmlExporter::new().export(&book, &mut output).unwrap();
        });
    });
    c.bench_function("write_epub", |b| {
        b.iter(|| {
            let mut output = Cursor::new(Vec::new());
            EpubExporter::new().export(&book, &mut output).unwrap();
        });
    });
}

criterion_group!(benches, bench_extract_lines, bench_assemble_book, bench_export);
criterion_main!(benches);
