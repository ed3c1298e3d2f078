use quick_xml::escape::{escape, unescape};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("regex is valid"));

/// Escape the five XML special characters (`& < > " '`) as named entities.
///
/// Used for both text nodes and attribute values, so quotes are always escaped.
pub fn escape_xml(text: &str) -> Cow<'_, str> {
    escape(text)
}

/// Resolve predefined entities and character references. Input that does not
/// unescape cleanly is returned unchanged.
pub fn unescape_xml(text: &str) -> Cow<'_, str> {
    match unescape(text) {
        Ok(value) => value,
        Err(_) => Cow::Borrowed(text),
    }
}

/// Collapse every whitespace run to a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Derive the plain-text rendition of an escaped XML fragment.
///
/// Each tag is replaced by a space, whitespace is collapsed, and entities are
/// decoded last so escaped markup in the text never looks like a tag.
pub fn xml_to_text(xml: &str) -> String {
    if xml.is_empty() {
        return String::new();
    }
    let stripped = TAG_PATTERN.replace_all(xml, " ");
    let collapsed = collapse_whitespace(&stripped);
    unescape_xml(&collapsed).into_owned()
}
