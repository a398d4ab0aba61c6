//! Text decoding and escaping helpers.

use std::borrow::Cow;

/// Decode raw fragment bytes to a string.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding (from `<?xml encoding="..."?>`)
/// 3. Falls back to lossy UTF-8 so broken sequences become U+FFFD instead of
///    aborting the chapter
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    result
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape XML special characters.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Undo HTML escaping for plain-text comparisons.
///
/// Handles the XML entities, `&nbsp;` and numeric character references;
/// anything else is left as written.
pub fn unescape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail[1..]
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&tail[1..=end]).map(|c| (c, end + 2)));
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}

/// Format a pixel dimension the way the markup expects it (no decimals).
pub fn format_px(value: f64) -> String {
    format!("{:.0}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_valid_utf8() {
        assert_eq!(decode_text("héllo".as_bytes(), None), "héllo");
    }

    #[test]
    fn test_decode_text_repairs_invalid_utf8() {
        let bytes = b"<svg>\xff</svg>";
        let decoded = decode_text(bytes, None);
        assert!(decoded.starts_with("<svg>"));
        assert!(decoded.contains('\u{fffd}'));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & \"c\""), "a &lt; b &amp; &#34;c&#34;");
        assert_eq!(escape_html("it's"), "it&#39;s");
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("Hello & World"), "Hello &amp; World");
        assert_eq!(escape_xml("<tag>"), "&lt;tag&gt;");
    }

    #[test]
    fn test_unescape_html() {
        assert_eq!(unescape_html("a &lt; b &amp;&amp; c"), "a < b && c");
        assert_eq!(unescape_html("&#65;&#x42;&nbsp;"), "AB\u{a0}");
        assert_eq!(unescape_html("&#39;q&#34;"), "'q\"");
        assert_eq!(unescape_html("R&D; fish & chips"), "R&D; fish & chips");
        assert_eq!(unescape_html("trailing &"), "trailing &");
    }

    #[test]
    fn test_format_px() {
        assert_eq!(format_px(900.0), "900");
        assert_eq!(format_px(15.4), "15");
    }
}
