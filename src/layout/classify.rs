//! Superscript/subscript, emphasis and newline heuristics.
//!
//! Nothing in a snapshot says "this is a footnote number". Raised and lowered
//! text is recognised from its height relative to the running baseline, from
//! a small declared font size, or from an upward shift of its `y` position;
//! a candidate is only accepted when its content is short and numeric-looking.

use crate::svg::Element;

use super::LayoutConfig;

/// Vertical role of a text glyph relative to the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Normal,
    Super,
    Sub,
}

/// Metrics of the last ordinary text glyph, carried across one chapter.
#[derive(Debug, Clone, Default)]
pub struct Baseline {
    pub y: f64,
    pub top: f64,
    pub height: f64,
    /// Element name of the previous positioned element.
    pub last_kind: String,
}

impl Baseline {
    /// Classify a `text` element against the baseline and advance the
    /// baseline metrics when the element turns out to be ordinary text.
    ///
    /// Elements without a `top` attribute are always [`Script::Normal`] and
    /// leave `top`/`height` untouched.
    pub fn classify(&mut self, element: &Element, config: &LayoutConfig) -> Script {
        let Some(top) = element.attr("top") else {
            return Script::Normal;
        };
        let top = top.trim().parse::<f64>().unwrap_or(0.0);
        let height = element.attr_f64("height").unwrap_or(0.0);
        let declared_len = element.attr_f64("len").unwrap_or(0.0);
        let y = element.attr_f64("y").unwrap_or(0.0);
        let style = element.attr("style").unwrap_or("");
        let content = element.content.as_str();

        let short_numeric = is_short_numeric(content, config.script_max_chars);
        let small_font = config.has_small_font(style);

        let mut candidate = height < self.height * config.script_height_ratio
            && (element.name == self.last_kind || short_numeric);
        if small_font {
            candidate = true;
        }
        if y != 0.0 && self.y != 0.0 && y < self.y && self.y - y > config.script_y_shift {
            candidate = true;
        }

        if candidate {
            let likely_script =
                short_numeric || (declared_len <= config.script_max_declared_len && small_font);
            if likely_script {
                return if top < self.top {
                    Script::Super
                } else {
                    Script::Sub
                };
            }
        }

        self.top = top;
        self.height = height;
        Script::Normal
    }
}

/// Whether a `newline="true"` declaration should be honoured.
///
/// Short, small or tiny-font fragments are usually raised numbers that the
/// renderer flagged as line starts; those never break the line.
pub fn forces_newline(element: &Element, config: &LayoutConfig) -> bool {
    if element.attr("newline") != Some("true") {
        return false;
    }
    if element.has_attr("top") {
        if element.has_attr("height")
            && element.attr_f64("height").unwrap_or(0.0) <= config.newline_min_height
        {
            return false;
        }
        if element
            .attr("style")
            .is_some_and(|style| config.has_small_font(style))
        {
            return false;
        }
        if element.has_attr("len")
            && element.attr_f64("len").unwrap_or(0.0) <= config.script_max_declared_len
        {
            return false;
        }
    }
    true
}

/// Emphasis flags from an inline style: `(bold, italic)`.
pub fn emphasis(style: &str) -> (bool, bool) {
    let bold = style.contains("font-weight: bold;");
    let italic = style.contains("font-style: oblique") || style.contains("font-style: italic");
    (bold, italic)
}

/// True if every character is a digit or one of `+-*/^()[]{}.,`.
pub fn is_numeric_or_math(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_numeric() || "+-*/^()[]{}.,".contains(c))
}

fn is_short_numeric(content: &str, max_chars: usize) -> bool {
    !content.is_empty() && content.chars().count() <= max_chars && is_numeric_or_math(content)
}
