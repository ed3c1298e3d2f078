//! Pattern-based normalizers for USLM identifiers and `num` tokens.
//!
//! None of these fail: input that does not match yields `None` or the trimmed
//! input, and parsing carries on.

use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static TITLE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|/)t(\d+)").expect("regex is valid"));

#[allow(clippy::expect_used)]
static SECTION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"§+\s*([\w\-]+)").expect("regex is valid"));

#[allow(clippy::expect_used)]
static CHAPTER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*chapter\s*").expect("regex is valid"));

#[allow(clippy::expect_used)]
static SECTION_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/us/usc/t(\d+)/s(.+)$").expect("regex is valid"));

const SOURCE_URL_BASE: &str = "https://uscode.house.gov/view.xhtml?req=granuleid:";

/// Title number from a `t<digits>` path segment.
///
/// ```
/// use uslm_ingest::normalize::extract_title_number;
///
/// assert_eq!(extract_title_number("/us/usc/t26/s501"), Some(26));
/// assert_eq!(extract_title_number("garbage"), None);
/// ```
pub fn extract_title_number(identifier: &str) -> Option<u32> {
    let caps = TITLE_SEGMENT.captures(identifier)?;
    match caps[1].parse::<u32>() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!("Failed to parse title number from identifier: {identifier}");
            None
        }
    }
}

/// Strip the leading `§` marker: `"§ 101"` becomes `"101"`.
pub fn clean_section_number(raw: &str) -> String {
    match SECTION_MARKER.captures(raw) {
        Some(caps) => caps[1].to_string(),
        None => raw.trim().to_string(),
    }
}

/// Strip a case-insensitive `chapter` prefix: `"CHAPTER 1"` becomes `"1"`.
///
/// The trailing dash printed after chapter numbers (`"CHAPTER 1\u{2014}"`) goes too.
pub fn extract_chapter_number(raw: &str) -> String {
    CHAPTER_PREFIX
        .replace(raw, "")
        .trim()
        .trim_end_matches(['\u{2014}', '\u{2013}', '.'])
        .trim_end()
        .to_string()
}

/// Official uscode.house.gov URL for a section identifier such as `/us/usc/t5/s101`.
pub fn source_url(identifier: &str) -> Option<String> {
    let caps = SECTION_IDENTIFIER.captures(identifier)?;
    Some(format!(
        "{SOURCE_URL_BASE}USC-prelim-title{}-section{}",
        &caps[1], &caps[2]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_number_from_identifier() {
        assert_eq!(extract_title_number("/us/usc/t5/s101"), Some(5));
        assert_eq!(extract_title_number("/us/usc/t26/s501"), Some(26));
        assert_eq!(extract_title_number("/us/usc/t42"), Some(42));
        assert_eq!(extract_title_number("/us/usc/t5a/s1"), Some(5));
    }

    #[test]
    fn title_number_absent_for_garbage() {
        assert_eq!(extract_title_number("garbage"), None);
        assert_eq!(extract_title_number(""), None);
        assert_eq!(extract_title_number("/us/usc/title5"), None);
        assert_eq!(extract_title_number("/us/usc/t99999999999999/s1"), None);
    }

    #[test]
    fn section_number_strips_marker() {
        assert_eq!(clean_section_number("§ 101"), "101");
        assert_eq!(clean_section_number("§101a"), "101a");
        assert_eq!(clean_section_number("§ 101a-1"), "101a-1");
        assert_eq!(clean_section_number("§ 1."), "1");
        assert_eq!(clean_section_number("§§ 7"), "7");
    }

    #[test]
    fn section_number_without_marker_is_trimmed() {
        assert_eq!(clean_section_number("101"), "101");
        assert_eq!(clean_section_number("  101  "), "101");
        assert_eq!(clean_section_number(""), "");
    }

    #[test]
    fn chapter_number_strips_prefix() {
        assert_eq!(extract_chapter_number("CHAPTER 1"), "1");
        assert_eq!(extract_chapter_number("Chapter 53"), "53");
        assert_eq!(extract_chapter_number("chapter5A"), "5A");
        assert_eq!(extract_chapter_number(" 7 "), "7");
        assert_eq!(extract_chapter_number("CHAPTER 1\u{2014}"), "1");
        assert_eq!(extract_chapter_number("CHAPTER 5A\u{2013} "), "5A");
    }

    #[test]
    fn source_url_for_section_identifier() {
        assert_eq!(
            source_url("/us/usc/t5/s101").as_deref(),
            Some("https://uscode.house.gov/view.xhtml?req=granuleid:USC-prelim-title5-section101")
        );
        assert_eq!(source_url("/us/usc/t5"), None);
    }
}
