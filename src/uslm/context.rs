use quick_xml::events::BytesStart;

use crate::escape::{escape_xml, xml_to_text};
use crate::normalize::{clean_section_number, extract_chapter_number, extract_title_number};
use crate::types::{ParseStats, ParsedSection};
use crate::uslm::content::{ContentCapture, TextCapture, TextTarget};

const ELEMENT_TITLE: &str = "title";
const ELEMENT_CHAPTER: &str = "chapter";
const ELEMENT_SECTION: &str = "section";
const ELEMENT_NUM: &str = "num";
const ELEMENT_HEADING: &str = "heading";
const ELEMENT_CONTENT: &str = "content";
const ELEMENT_SOURCE_CREDIT: &str = "sourceCredit";
const ATTR_IDENTIFIER: &[u8] = b"identifier";

#[derive(Debug, Default)]
struct LevelFields {
    identifier: Option<String>,
    num: Option<String>,
    name: Option<String>,
    /// Open untracked elements directly below this level, e.g. `part`.
    nested: usize,
}

#[derive(Debug, Default)]
struct SectionFields {
    identifier: Option<String>,
    num: Option<String>,
    heading: Option<String>,
    source_credit: Option<String>,
    /// Open untracked elements below the section, e.g. `subsection`.
    /// Their `num` and `heading` children are not the section's own.
    nested: usize,
    /// Concatenated `<content>` bodies, only used to derive the plain text.
    content_body: String,
    xml: String,
}

impl SectionFields {
    fn new(identifier: Option<String>) -> Self {
        let mut xml = String::from("<section");
        if let Some(id) = identifier.as_deref() {
            xml.push_str(" identifier=\"");
            xml.push_str(&escape_xml(id));
            xml.push('"');
        }
        xml.push('>');
        Self {
            identifier,
            xml,
            ..Self::default()
        }
    }

    fn push_element(&mut self, tag: &str, escaped_body: &str) {
        self.xml.push('<');
        self.xml.push_str(tag);
        self.xml.push('>');
        self.xml.push_str(escaped_body);
        self.xml.push_str("</");
        self.xml.push_str(tag);
        self.xml.push('>');
    }

    fn push_content(&mut self, body: String) {
        self.push_element(ELEMENT_CONTENT, &body);
        if !self.content_body.is_empty() {
            self.content_body.push(' ');
        }
        self.content_body.push_str(&body);
    }

    fn finish(
        mut self,
        title: Option<&LevelFields>,
        chapter: Option<&LevelFields>,
    ) -> Option<ParsedSection> {
        let identifier = self.identifier?;
        self.xml.push_str("</section>");

        Some(ParsedSection {
            title_number: extract_title_number(&identifier),
            title_name: title.and_then(|t| t.name.clone()),
            chapter_number: chapter
                .and_then(|c| c.num.as_deref())
                .map(extract_chapter_number),
            chapter_name: chapter.and_then(|c| c.name.clone()),
            section_number: self.num.as_deref().map(clean_section_number),
            heading: self.heading,
            content_text: xml_to_text(&self.content_body),
            content_xml: self.xml,
            source_credit: self.source_credit,
            has_parse_errors: false,
            parse_error_message: None,
            identifier,
        })
    }
}

/// One open structural element. Only elements that change parser state get a
/// frame; everything else passes through untracked.
#[derive(Debug)]
enum Frame {
    Title(LevelFields),
    Chapter(LevelFields),
    Section(SectionFields),
    Content(ContentCapture),
    Text(TextCapture),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Title,
    Chapter,
    Section,
}

/// Nesting state for one document pass.
///
/// Title and chapter frames outlive the sections they contain; a section frame
/// is dropped as soon as its record is assembled.
#[derive(Debug, Default)]
pub(crate) struct ParserContext {
    frames: Vec<Frame>,
    stats: ParseStats,
}

impl ParserContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn stats(&self) -> ParseStats {
        self.stats
    }

    pub(crate) fn in_section(&self) -> bool {
        self.frames.iter().any(|f| matches!(f, Frame::Section(_)))
    }

    fn innermost_level(&self) -> Option<Level> {
        self.frames.iter().rev().find_map(|frame| match frame {
            Frame::Title(_) => Some(Level::Title),
            Frame::Chapter(_) => Some(Level::Chapter),
            Frame::Section(_) => Some(Level::Section),
            Frame::Content(_) | Frame::Text(_) => None,
        })
    }

    fn nearest_title(&self) -> Option<&LevelFields> {
        self.frames.iter().rev().find_map(|frame| match frame {
            Frame::Title(fields) => Some(fields),
            _ => None,
        })
    }

    fn nearest_chapter(&self) -> Option<&LevelFields> {
        self.frames.iter().rev().find_map(|frame| match frame {
            Frame::Chapter(fields) => Some(fields),
            _ => None,
        })
    }

    /// The level whose direct child is about to open, if any.
    fn direct_level(&self) -> Option<Level> {
        match self.frames.last()? {
            Frame::Title(fields) if fields.nested == 0 => Some(Level::Title),
            Frame::Chapter(fields) if fields.nested == 0 => Some(Level::Chapter),
            Frame::Section(fields) if fields.nested == 0 => Some(Level::Section),
            _ => None,
        }
    }

    /// A section is on top but the element opens inside its nested structure.
    fn nested_in_section(&self) -> bool {
        matches!(self.frames.last(), Some(Frame::Section(fields)) if fields.nested > 0)
    }

    fn top_name_captured(&self) -> bool {
        matches!(
            self.frames.last(),
            Some(Frame::Title(fields) | Frame::Chapter(fields)) if fields.name.is_some()
        )
    }

    fn top_nested_mut(&mut self) -> Option<&mut usize> {
        match self.frames.last_mut()? {
            Frame::Title(fields) | Frame::Chapter(fields) => Some(&mut fields.nested),
            Frame::Section(fields) => Some(&mut fields.nested),
            Frame::Content(_) | Frame::Text(_) => None,
        }
    }

    pub(crate) fn on_start(
        &mut self,
        name: &str,
        start: &BytesStart<'_>,
    ) -> Result<(), quick_xml::Error> {
        match self.frames.last_mut() {
            Some(Frame::Content(capture)) => return capture.open(name, start),
            Some(Frame::Text(capture)) => {
                capture.open();
                return Ok(());
            }
            _ => {}
        }

        match name {
            ELEMENT_TITLE => self.frames.push(Frame::Title(LevelFields {
                identifier: identifier_attr(start)?,
                ..LevelFields::default()
            })),
            ELEMENT_CHAPTER => self.frames.push(Frame::Chapter(LevelFields {
                identifier: identifier_attr(start)?,
                ..LevelFields::default()
            })),
            ELEMENT_SECTION => self
                .frames
                .push(Frame::Section(SectionFields::new(identifier_attr(start)?))),
            ELEMENT_NUM => {
                let target = match self.direct_level() {
                    Some(Level::Section) => Some(TextTarget::SectionNum),
                    Some(Level::Chapter) => Some(TextTarget::ChapterNum),
                    Some(Level::Title) => Some(TextTarget::TitleNum),
                    None if self.nested_in_section() => Some(TextTarget::NestedNum),
                    None => None,
                };
                self.open_text(target);
            }
            ELEMENT_HEADING => {
                // First heading wins at title and chapter level.
                let target = match self.direct_level() {
                    Some(Level::Section) => Some(TextTarget::SectionHeading),
                    Some(Level::Chapter) if !self.top_name_captured() => {
                        Some(TextTarget::ChapterHeading)
                    }
                    Some(Level::Title) if !self.top_name_captured() => {
                        Some(TextTarget::TitleHeading)
                    }
                    None if self.nested_in_section() => Some(TextTarget::NestedHeading),
                    _ => None,
                };
                self.open_text(target);
            }
            ELEMENT_CONTENT if self.innermost_level() == Some(Level::Section) => {
                self.frames.push(Frame::Content(ContentCapture::new()));
            }
            ELEMENT_SOURCE_CREDIT if self.innermost_level() == Some(Level::Section) => {
                self.frames
                    .push(Frame::Text(TextCapture::new(TextTarget::SourceCredit)));
            }
            _ => self.descend(),
        }
        Ok(())
    }

    fn open_text(&mut self, target: Option<TextTarget>) {
        match target {
            Some(target) => self.frames.push(Frame::Text(TextCapture::new(target))),
            None => self.descend(),
        }
    }

    fn descend(&mut self) {
        if let Some(nested) = self.top_nested_mut() {
            *nested += 1;
        }
    }

    pub(crate) fn on_text(&mut self, text: &str) {
        match self.frames.last_mut() {
            Some(Frame::Content(capture)) => capture.text(text),
            Some(Frame::Text(capture)) => capture.text(text),
            _ => {}
        }
    }

    /// Handle an end tag; returns the finished record when a section closes.
    pub(crate) fn on_end(&mut self, name: &str) -> Option<ParsedSection> {
        match self.frames.last_mut() {
            Some(Frame::Content(capture)) => {
                if capture.close(name) {
                    if let Some(Frame::Content(capture)) = self.frames.pop() {
                        if let Some(Frame::Section(section)) = self.frames.last_mut() {
                            section.push_content(capture.into_xml());
                        }
                    }
                }
                return None;
            }
            Some(Frame::Text(capture)) => {
                if capture.close() {
                    if let Some(Frame::Text(capture)) = self.frames.pop() {
                        self.apply_text(capture);
                    }
                }
                return None;
            }
            _ => {}
        }

        match name {
            _ if self.ascend() => None,
            ELEMENT_SECTION if matches!(self.frames.last(), Some(Frame::Section(_))) => {
                let Some(Frame::Section(section)) = self.frames.pop() else {
                    return None;
                };
                match section.finish(self.nearest_title(), self.nearest_chapter()) {
                    Some(record) => {
                        self.stats.sections_emitted += 1;
                        Some(record)
                    }
                    None => {
                        tracing::warn!("Skipping section without identifier attribute");
                        self.stats.sections_skipped += 1;
                        None
                    }
                }
            }
            ELEMENT_CHAPTER if matches!(self.frames.last(), Some(Frame::Chapter(_))) => {
                self.frames.pop();
                None
            }
            ELEMENT_TITLE if matches!(self.frames.last(), Some(Frame::Title(_))) => {
                if let Some(Frame::Title(title)) = self.frames.pop() {
                    tracing::debug!(
                        identifier = ?title.identifier,
                        num = ?title.num,
                        "Closed title"
                    );
                }
                None
            }
            _ => None,
        }
    }

    /// Close an untracked element below the innermost level.
    fn ascend(&mut self) -> bool {
        match self.top_nested_mut() {
            Some(nested) if *nested > 0 => {
                *nested -= 1;
                true
            }
            _ => false,
        }
    }

    fn apply_text(&mut self, capture: TextCapture) {
        let target = capture.target;
        let text = capture.into_text();
        match (self.frames.last_mut(), target) {
            (Some(Frame::Title(title)), TextTarget::TitleNum) => title.num = Some(text),
            (Some(Frame::Title(title)), TextTarget::TitleHeading) => title.name = Some(text),
            (Some(Frame::Chapter(chapter)), TextTarget::ChapterNum) => chapter.num = Some(text),
            (Some(Frame::Chapter(chapter)), TextTarget::ChapterHeading) => {
                chapter.name = Some(text)
            }
            (Some(Frame::Section(section)), TextTarget::SectionNum) => {
                section.push_element(ELEMENT_NUM, &escape_xml(&text));
                section.num = Some(text);
            }
            (Some(Frame::Section(section)), TextTarget::SectionHeading) => {
                section.push_element(ELEMENT_HEADING, &escape_xml(&text));
                section.heading = Some(text);
            }
            // Subsection markers stay in the fragment without touching the fields.
            (Some(Frame::Section(section)), TextTarget::NestedNum) => {
                section.push_element(ELEMENT_NUM, &escape_xml(&text));
            }
            (Some(Frame::Section(section)), TextTarget::NestedHeading) => {
                section.push_element(ELEMENT_HEADING, &escape_xml(&text));
            }
            (Some(Frame::Section(section)), TextTarget::SourceCredit) => {
                section.push_element(ELEMENT_SOURCE_CREDIT, &escape_xml(&text));
                section.source_credit = Some(text);
            }
            _ => {}
        }
    }
}

fn identifier_attr(start: &BytesStart<'_>) -> Result<Option<String>, quick_xml::Error> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == ATTR_IDENTIFIER {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
