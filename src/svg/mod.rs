//! Minimal SVG element tree.
//!
//! Chapter snapshots arrive as SVG fragments: a root `<svg>` whose direct
//! children are absolutely positioned `<text>` and `<image>` elements. The
//! layout stage only needs names, attributes, direct text content and one
//! level of nesting (footnote anchors), so the tree is deliberately plain.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::entities::COSMETIC_ENTITIES;
use crate::error::{Error, Result};

/// A parsed element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Direct text content; cleared when it is only whitespace.
    pub content: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Look up an attribute by local name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Numeric attribute value; missing or unparsable values read as `None`.
    pub fn attr_f64(&self, name: &str) -> Option<f64> {
        self.attr(name).and_then(|v| v.trim().parse::<f64>().ok())
    }
}

/// Parse one SVG fragment into an element tree.
///
/// `chapter_id` is only used to label errors.
pub fn parse_fragment(chapter_id: &str, markup: &str) -> Result<Element> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                stack.push(start_element(chapter_id, &e)?);
            }
            Ok(Event::Empty(e)) => {
                let element = start_element(chapter_id, &e)?;
                attach(chapter_id, element, &mut stack, &mut root)?;
            }
            Ok(Event::End(_)) => {
                let Some(element) = stack.pop() else {
                    return Err(Error::markup(chapter_id, "unexpected closing tag"));
                };
                attach(chapter_id, element, &mut stack, &mut root)?;
            }
            Ok(Event::Text(e)) => {
                if let Some(current) = stack.last_mut() {
                    current.content.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(current) = stack.last_mut() {
                    current.content.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if let Some(current) = stack.last_mut() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    match resolve_entity(&entity) {
                        Some(resolved) => current.content.push_str(&resolved),
                        // Keep other HTML-only entities literally
                        None => {
                            current.content.push('&');
                            current.content.push_str(&entity);
                            current.content.push(';');
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::markup(chapter_id, e.to_string())),
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::markup(
            chapter_id,
            format!("unclosed element <{}>", open.name),
        ));
    }
    root.ok_or_else(|| Error::markup(chapter_id, "no root element"))
}

fn start_element(chapter_id: &str, e: &BytesStart) -> Result<Element> {
    let name = e.name();
    let mut element = Element::new(String::from_utf8_lossy(local_name(name.as_ref())));

    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::markup(chapter_id, err.to_string()))?;
        let key = String::from_utf8_lossy(local_name(attr.key.as_ref())).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = match quick_xml::escape::unescape(&raw) {
            Ok(v) => v.into_owned(),
            Err(_) => raw.into_owned(),
        };
        element.attributes.push((key, value));
    }

    Ok(element)
}

fn attach(
    chapter_id: &str,
    mut element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
) -> Result<()> {
    if element.content.trim().is_empty() {
        element.content.clear();
    }
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(Error::markup(chapter_id, "multiple root elements"));
    }
    *root = Some(element);
    Ok(())
}

/// Strip a namespace prefix (`xlink:href` -> `href`).
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Resolve XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        "nbsp" => return Some("\u{a0}".to_string()),
        _ => {}
    }

    if let Some((_, literal)) = COSMETIC_ENTITIES
        .iter()
        .find(|(name, _)| name.strip_prefix('&').and_then(|n| n.strip_suffix(';')) == Some(entity))
    {
        return Some((*literal).to_string());
    }

    if let Some(hex) = entity.strip_prefix("#x") {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#')
        && let Ok(code) = dec.parse::<u32>()
        && let Some(c) = char::from_u32(code)
    {
        return Some(c.to_string());
    }

    None
}
