//! Flatten a chapter's element tree into glyphs grouped by line.

use std::collections::HashMap;

use crate::context::RunContext;
use crate::svg::Element;

use super::classify::{self, Baseline, Script};
use super::{Glyph, GlyphKind, Line};

/// Stand-in content for text elements that carry nothing, so empty lines
/// keep their vertical space.
pub(crate) const BLANK: &str = "\u{a0}";

/// Extract the glyphs of one SVG fragment, grouped into lines ordered by
/// their vertical position.
///
/// Lines are keyed by exact `y` equality. Raised/lowered text is keyed on
/// the baseline it belongs to and narrow images on their preceding sibling,
/// so footnote markers stay on the line they annotate.
pub fn extract_lines(chapter_id: &str, root: &Element, ctx: &RunContext) -> Vec<Line> {
    let config = &ctx.layout;
    let mut baseline = Baseline::default();
    let mut lines: Vec<Line> = Vec::new();
    let mut slots: HashMap<u64, usize> = HashMap::new();

    for (k, element) in root.children.iter().enumerate() {
        if !element.has_attr("y") {
            continue;
        }
        let kind = match element.name.as_str() {
            "text" => Some(GlyphKind::Text),
            "image" => Some(GlyphKind::Image),
            _ => None,
        };

        let mut glyph = Glyph::new(kind.unwrap_or(GlyphKind::Text));
        glyph.forces_newline = classify::forces_newline(element, config);

        if kind == Some(GlyphKind::Text) {
            glyph.content = text_content(chapter_id, element, ctx, &mut glyph);
            match baseline.classify(element, config) {
                Script::Super => glyph.is_footnote_ref = true,
                Script::Sub => glyph.is_sub = true,
                Script::Normal => {}
            }
            if glyph.is_footnote_ref || glyph.is_sub {
                glyph.forces_newline = false;
            }
        }

        if let Some(style) = element.attr("style") {
            glyph.style = style.replace("fill", "color");
            (glyph.bold, glyph.italic) = classify::emphasis(&glyph.style);
        }
        glyph.class = element.attr("class").unwrap_or_default().to_string();
        glyph.alt = element.attr("alt").unwrap_or_default().to_string();
        glyph.href = element.attr("href").unwrap_or_default().to_string();
        if glyph.id.is_empty() {
            glyph.id = element.attr("id").unwrap_or_default().to_string();
        }
        glyph.x = element.attr_f64("x").unwrap_or(0.0);
        glyph.width = element.attr_f64("width").unwrap_or(0.0);
        glyph.height = element.attr_f64("height").unwrap_or(0.0);
        glyph.top = element.attr_f64("top");
        glyph.len = element.attr_f64("len");

        let own_y = element.attr_f64("y").unwrap_or(0.0);
        glyph.y = if glyph.is_footnote_ref || glyph.is_sub {
            baseline.y
        } else {
            if kind == Some(GlyphKind::Text) {
                baseline.y = own_y;
            }
            own_y
        };

        if kind == Some(GlyphKind::Image) && glyph.width < config.footnote_image_width && k > 0 {
            glyph.y = root.children[k - 1].attr_f64("y").unwrap_or(0.0);
        }

        baseline.last_kind.clone_from(&element.name);

        if kind.is_some() {
            let slot = *slots.entry(line_key(glyph.y)).or_insert_with(|| {
                lines.push(Line {
                    key: glyph.y,
                    glyphs: Vec::new(),
                });
                lines.len() - 1
            });
            lines[slot].glyphs.push(glyph);
        }
    }

    lines.sort_by(|a, b| a.key.total_cmp(&b.key));
    lines
}

/// Direct content, or the text of nested footnote anchors (which also sets
/// the glyph's footnote link and anchor id).
fn text_content(chapter_id: &str, element: &Element, ctx: &RunContext, glyph: &mut Glyph) -> String {
    if !element.content.is_empty() {
        return element.content.clone();
    }
    if element.children.is_empty() {
        return BLANK.to_string();
    }

    let mut content = String::new();
    for anchor in element.children.iter().filter(|c| c.name == "a") {
        content.push_str(&anchor.content);
        if let Some(href) = anchor.attr("href") {
            let style = anchor.attr("style").unwrap_or("");
            let (link, id) = ctx.delimiters.link_for(chapter_id, href, style);
            glyph.footnote = Some(link);
            glyph.id = id;
        }
    }
    content
}

/// Hashable key with exact `f64` equality (`-0.0` folded into `0.0`).
fn line_key(y: f64) -> u64 {
    if y == 0.0 { 0.0f64.to_bits() } else { y.to_bits() }
}
