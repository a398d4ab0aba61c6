//! Document chrome shared by the exporters: head, TOC block and tail.

use crate::book::TocEntry;
use crate::util::escape_html;

const STYLES: &str = r#"		table, tr, td, th, tbody, thead, tfoot {page-break-inside: avoid !important;}
		img { page-break-inside: avoid; max-width: 100% !important;}
		img.epub-footnote { margin-right:5px;display: inline;font-size: 12px;}"#;

/// Opening markup up to and including `<body>`.
///
/// Written as well-formed XHTML so the same head serves HTML, the PDF
/// renderer and EPUB chapters.
pub fn head_html(lang: &str, title: &str) -> String {
    let lang = escape_html(lang);
    format!(
        r#"<!DOCTYPE html>
<html lang="{lang}" xml:lang="{lang}" xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head>
	<meta charset="UTF-8"/>
	<meta name="viewport" content="width=device-width, initial-scale=1.0"/>
	<meta http-equiv="Content-Type" content="text/html; charset=utf-8"/>
	<title>{}</title>
	<style>
{STYLES}
	</style>
</head>
<body>"#,
        escape_html(title)
    )
}

/// Closing markup matching [`head_html`].
pub fn document_end() -> &'static str {
    "\n</body>\n</html>"
}

/// Anchor block listing the TOC, linking each entry to its fragment.
///
/// Nested levels are indented with four non-breaking spaces per level.
/// Returns an empty string for an empty TOC.
pub fn toc_html(toc: &[TocEntry], title: &str) -> String {
    if toc.is_empty() {
        return String::new();
    }

    let mut out = String::from("\n<div id=\"toc\">");
    out.push_str(&format!(
        "\n\t<p><span style=\"font-size:24px;font-weight: bold;color:rgb(0, 0, 0);\">{}</span></p>",
        escape_html(title)
    ));

    for entry in toc {
        let style = if entry.level == 0 {
            "font-size:20px;font-weight: bold;color:rgb(0, 0, 0);text-decoration: none;"
        } else {
            "font-size:18px;color:rgb(0, 0, 0);text-decoration: none;"
        };
        let text = format!("{}{}", "&nbsp;".repeat(entry.level * 4), escape_html(&entry.text));
        match entry.fragment() {
            Some(fragment) => out.push_str(&format!(
                "\n\t<p><a href=\"#{}\" style=\"{style}\">{text}</a></p>",
                escape_html(fragment)
            )),
            None => out.push_str(&format!("\n\t<p><a style=\"{style}\">{text}</a></p>")),
        }
    }

    out.push_str("\n</div>\n<div style=\"page-break-after: always;\"></div>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_is_parameterised() {
        let head = head_html("en", "A & B");
        assert!(head.starts_with("<!DOCTYPE html>"));
        assert!(head.contains("<html lang=\"en\""));
        assert!(head.contains("<title>A &amp; B</title>"));
        assert!(head.contains("img.epub-footnote"));
        assert!(head.ends_with("<body>"));
    }

    #[test]
    fn test_toc_html() {
        let toc = vec![
            TocEntry::new("Part One", "c1.xhtml#p1").with_level(0),
            TocEntry::new("Origins", "c2.xhtml#o").with_level(1),
            TocEntry::new("Notes", "c9.xhtml").with_level(1),
        ];
        let html = toc_html(&toc, "Contents");
        assert!(html.contains(">Contents</span>"));
        assert!(html.contains("<a href=\"#p1\" style=\"font-size:20px;font-weight: bold;"));
        assert!(html.contains("<a href=\"#o\" style=\"font-size:18px;"));
        assert!(html.contains(">&nbsp;&nbsp;&nbsp;&nbsp;Origins</a>"));
        assert!(html.contains("<p><a style=\"font-size:18px;"));
    }

    #[test]
    fn test_empty_toc() {
        assert!(toc_html(&[], "Contents").is_empty());
    }
}
