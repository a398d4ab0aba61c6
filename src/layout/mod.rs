//! Glyph model, layout thresholds and line grouping.
//!
//! A chapter snapshot is nothing but positioned glyphs. This module turns the
//! SVG children into [`Glyph`] records, annotates them with the structural
//! heuristics in [`classify`], and groups them into visual [`Line`]s keyed by
//! their vertical position.

pub mod classify;
mod extract;

pub use classify::{Baseline, Script};
pub use extract::extract_lines;

/// Width of the reference page the snapshot coordinates are expressed in.
pub const PAGE_WIDTH: f64 = 60000.0;
/// Images narrower (and inline images shorter) than this are footnote markers.
pub const FOOTNOTE_IMAGE_WIDTH: f64 = 20.0;
pub const FOOTNOTE_IMAGE_HEIGHT: f64 = 20.0;
/// Wider images are scaled down to this width.
pub const MAX_IMAGE_WIDTH: f64 = 900.0;
/// A glyph shorter than this fraction of the baseline height may be raised or lowered text.
pub const SCRIPT_HEIGHT_RATIO: f64 = 0.8;
/// Minimum upward shift of `y` that marks raised text.
pub const SCRIPT_Y_SHIFT: f64 = 2.0;
/// Maximum content length of a confirmed superscript/subscript.
pub const SCRIPT_MAX_CHARS: usize = 3;
/// Maximum declared `len` of a small-font superscript/subscript.
pub const SCRIPT_MAX_DECLARED_LEN: f64 = 5.0;
/// Glyphs at most this tall never start a new line on their own.
pub const NEWLINE_MIN_HEIGHT: f64 = 16.0;
/// Declared font sizes (px) used for raised/lowered text.
pub const SMALL_FONT_SIZES: [u32; 3] = [11, 12, 13];

/// Thresholds for glyph classification and image placement.
///
/// The defaults match the snapshot renderer; they are exposed so the
/// heuristics can be tuned or tested in isolation.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub page_width: f64,
    pub footnote_image_width: f64,
    pub footnote_image_height: f64,
    pub max_image_width: f64,
    pub script_height_ratio: f64,
    pub script_y_shift: f64,
    pub script_max_chars: usize,
    pub script_max_declared_len: f64,
    pub newline_min_height: f64,
    pub small_font_sizes: Vec<u32>,
    /// Lower/upper bound of the centered band, as fractions of half the page width.
    pub center_band: (f64, f64),
    /// Start of the right-aligned band, as a fraction of the page width.
    pub right_band: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: PAGE_WIDTH,
            footnote_image_width: FOOTNOTE_IMAGE_WIDTH,
            footnote_image_height: FOOTNOTE_IMAGE_HEIGHT,
            max_image_width: MAX_IMAGE_WIDTH,
            script_height_ratio: SCRIPT_HEIGHT_RATIO,
            script_y_shift: SCRIPT_Y_SHIFT,
            script_max_chars: SCRIPT_MAX_CHARS,
            script_max_declared_len: SCRIPT_MAX_DECLARED_LEN,
            newline_min_height: NEWLINE_MIN_HEIGHT,
            small_font_sizes: SMALL_FONT_SIZES.to_vec(),
            center_band: (0.9, 1.1),
            right_band: 0.9,
        }
    }
}

impl LayoutConfig {
    pub fn with_page_width(mut self, width: f64) -> Self {
        self.page_width = width;
        self
    }

    pub fn with_max_image_width(mut self, width: f64) -> Self {
        self.max_image_width = width;
        self
    }

    /// Horizontal alignment implied by a line's starting `x`.
    pub fn alignment_for(&self, x: f64) -> Alignment {
        let half = self.page_width / 2.0;
        if x >= half * self.center_band.0 && x <= half * self.center_band.1 {
            Alignment::Center
        } else if x >= self.page_width * self.right_band {
            Alignment::Right
        } else {
            Alignment::Natural
        }
    }

    /// Clamp an image to the maximum width, keeping its aspect ratio.
    pub fn scale_image(&self, width: f64, height: f64) -> (f64, f64) {
        if width > self.max_image_width {
            (self.max_image_width, self.max_image_width * height / width)
        } else {
            (width, height)
        }
    }

    /// Whether an inline style declares one of the small font sizes.
    pub fn has_small_font(&self, style: &str) -> bool {
        let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
        self.small_font_sizes
            .iter()
            .any(|size| compact.contains(&format!("font-size:{size}px")))
    }
}

/// Horizontal placement of a line or block image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Natural,
    Center,
    Right,
}

impl Alignment {
    /// CSS appended to the element style, empty for natural flow.
    pub fn css(self) -> &'static str {
        match self {
            Alignment::Natural => "",
            Alignment::Center => "display: block;text-align:center;",
            Alignment::Right => "display: block;text-align:right;",
        }
    }
}

/// Semantic type of a rendered unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphKind {
    Text,
    Image,
}

/// Where a footnote anchor points, after marker translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FootnoteLink {
    pub href: String,
    pub style: String,
}

/// One positioned text run or image from a chapter snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub kind: GlyphKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub top: Option<f64>,
    /// Declared character length (`len` attribute).
    pub len: Option<f64>,
    pub style: String,
    pub content: String,
    pub class: String,
    pub alt: String,
    pub id: String,
    pub href: String,
    pub bold: bool,
    pub italic: bool,
    /// Raised text, rendered as `<sup>`.
    pub is_footnote_ref: bool,
    pub is_sub: bool,
    pub forces_newline: bool,
    pub footnote: Option<FootnoteLink>,
}

impl Glyph {
    pub fn new(kind: GlyphKind) -> Self {
        Self {
            kind,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            top: None,
            len: None,
            style: String::new(),
            content: String::new(),
            class: String::new(),
            alt: String::new(),
            id: String::new(),
            href: String::new(),
            bold: false,
            italic: false,
            is_footnote_ref: false,
            is_sub: false,
            forces_newline: false,
            footnote: None,
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind == GlyphKind::Image
    }
}

/// Glyphs sharing one vertical position, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub key: f64,
    pub glyphs: Vec<Glyph>,
}
