use quick_xml::events::BytesStart;

use crate::escape::escape_xml;

const XML_PREFIX: &[u8] = b"xml";

/// Re-serializes the subtree under a `<content>` element.
///
/// The capture starts right after `<content>` and finishes at the end tag that
/// brings the depth back to zero. Nested elements are re-opened by local name
/// with their attributes re-escaped; namespace declarations are dropped and
/// attributes keep only their local name unless they are `xml:` attributes.
#[derive(Debug, Default)]
pub(crate) struct ContentCapture {
    depth: usize,
    xml: String,
}

impl ContentCapture {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn open(&mut self, name: &str, start: &BytesStart<'_>) -> Result<(), quick_xml::Error> {
        self.depth += 1;
        self.xml.push('<');
        self.xml.push_str(name);
        for attr in start.attributes() {
            let attr = attr?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }
            let value = attr.unescape_value()?;
            // `xml:lang` and `xml:space` keep their reserved prefix.
            let key = match attr.key.prefix() {
                Some(prefix) if prefix.as_ref() == XML_PREFIX => attr.key.as_ref(),
                _ => attr.key.local_name().into_inner(),
            };
            self.xml.push(' ');
            self.xml.push_str(&String::from_utf8_lossy(key));
            self.xml.push_str("=\"");
            self.xml.push_str(&escape_xml(&value));
            self.xml.push('"');
        }
        self.xml.push('>');
        Ok(())
    }

    pub(crate) fn text(&mut self, text: &str) {
        self.xml.push_str(&escape_xml(text));
    }

    /// Returns `true` when this end tag closes the `<content>` element itself.
    pub(crate) fn close(&mut self, name: &str) -> bool {
        if self.depth == 0 {
            return true;
        }
        self.depth -= 1;
        self.xml.push_str("</");
        self.xml.push_str(name);
        self.xml.push('>');
        false
    }

    pub(crate) fn into_xml(self) -> String {
        self.xml
    }
}

/// Flattened text of a `num`, `heading` or `sourceCredit` element, nested
/// inline markup included.
#[derive(Debug)]
pub(crate) struct TextCapture {
    pub(crate) target: TextTarget,
    depth: usize,
    buffer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextTarget {
    TitleNum,
    TitleHeading,
    ChapterNum,
    ChapterHeading,
    SectionNum,
    SectionHeading,
    /// `num`/`heading` of structure nested in a section, e.g. a subsection.
    NestedNum,
    NestedHeading,
    SourceCredit,
}

impl TextCapture {
    pub(crate) fn new(target: TextTarget) -> Self {
        Self {
            target,
            depth: 0,
            buffer: String::new(),
        }
    }

    pub(crate) fn open(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn text(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Returns `true` when the captured element itself closes.
    pub(crate) fn close(&mut self) -> bool {
        if self.depth == 0 {
            return true;
        }
        self.depth -= 1;
        false
    }

    pub(crate) fn into_text(self) -> String {
        self.buffer.trim().to_string()
    }
}
