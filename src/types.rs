use serde::{Deserialize, Serialize};

/// One US Code section as emitted by the streaming parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSection {
    /// `section/@identifier`, e.g. `/us/usc/t5/s101`.
    pub identifier: String,
    pub title_number: Option<u32>,
    pub title_name: Option<String>,
    pub chapter_number: Option<String>,
    pub chapter_name: Option<String>,
    /// Section number with the `§` marker stripped, e.g. `101a`.
    pub section_number: Option<String>,
    pub heading: Option<String>,
    pub content_text: String,
    /// Reconstructed `<section>` fragment: num, heading, content and sourceCredit.
    pub content_xml: String,
    pub source_credit: Option<String>,
    pub has_parse_errors: bool,
    pub parse_error_message: Option<String>,
}

impl ParsedSection {
    /// Placeholder record for a fragment that failed to parse.
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            has_parse_errors: true,
            parse_error_message: Some(message.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseStats {
    pub sections_emitted: usize,
    /// Sections closed without an `identifier` attribute.
    pub sections_skipped: usize,
}
