//! Cosmetic entity decoding that leaves escaped markup alone.
//!
//! Assembled chapters are full of `&nbsp;`, `&quot;` and friends that read
//! better as literal characters. Some text, however, was escaped on purpose
//! so that it shows up as markup (`&lt;script&gt;` in a programming book);
//! those sequences must survive byte for byte. Escaped tags are therefore
//! swapped for placeholders first, the entity table is applied, and the
//! placeholders are restored.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Entities decoded by [`decode_cosmetic_entities`].
pub const COSMETIC_ENTITIES: [(&str, &str); 14] = [
    ("&nbsp;", " "),
    ("&ensp;", " "),
    ("&emsp;", " "),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&amp;", "&"),
    ("&mdash;", "—"),
    ("&ndash;", "–"),
    ("&hellip;", "…"),
    ("&copy;", "©"),
    ("&reg;", "®"),
    ("&trade;", "™"),
    ("&deg;", "°"),
    ("&plusmn;", "±"),
];

// Escaped open, close and self-closing tags.
static ESCAPED_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&lt;[a-zA-Z][^&]*/&gt;|&lt;/[a-zA-Z][^&]*&gt;|&lt;[a-zA-Z][^&]*&gt;")
        .expect("valid escaped tag regex")
});

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    let names: Vec<&str> = COSMETIC_ENTITIES
        .iter()
        .map(|(entity, _)| entity.trim_start_matches('&').trim_end_matches(';'))
        .collect();
    Regex::new(&format!("&(?:{});", names.join("|"))).expect("valid entity regex")
});

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\u{E000}([0-9]+)\u{E001}").expect("valid placeholder regex"));

/// Decode the cosmetic entity table while preserving escaped tags.
///
/// Decoding is a single pass, so `&amp;nbsp;` becomes the literal text
/// `&nbsp;` rather than a space.
pub fn decode_cosmetic_entities(markup: &str) -> String {
    let mut preserved: Vec<String> = Vec::new();

    let protected = ESCAPED_TAG_RE.replace_all(markup, |caps: &Captures| {
        preserved.push(caps[0].to_string());
        format!("\u{E000}{}\u{E001}", preserved.len() - 1)
    });

    let decoded = ENTITY_RE.replace_all(&protected, |caps: &Captures| {
        let entity = &caps[0];
        COSMETIC_ENTITIES
            .iter()
            .find(|(name, _)| *name == entity)
            .map_or(entity, |(_, literal)| *literal)
            .to_string()
    });

    PLACEHOLDER_RE
        .replace_all(&decoded, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| preserved.get(i))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
