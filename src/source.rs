//! USC release archives: locating the title XML inside a release-point ZIP.
//!
//! Fetching is left to the caller; everything here works on local bytes.

use std::io::{BufReader, Read, Seek, SeekFrom};
use std::ops::RangeInclusive;

use zip::ZipArchive;

use crate::error::{ParseError, Result};
use crate::types::{ParseStats, ParsedSection};
use crate::uslm::UslmParser;

pub const DEFAULT_RELEASE_POINT: &str = "119-46";

/// Title numbers published as individual release archives.
pub const AVAILABLE_TITLES: RangeInclusive<u32> = 1..=54;

const BASE_URL: &str = "https://uscode.house.gov/download/releasepoints/us/pl";
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
const XML_BUFFER_SIZE: usize = 64 * 1024;

/// Download URL for one title at a release point such as `119-46`.
///
/// Returns `None` when the release point is not `<congress>-<law>`.
pub fn download_url(title_number: u32, release_point: &str) -> Option<String> {
    let (congress, law) = release_point.split_once('-')?;
    if congress.is_empty() || law.is_empty() {
        return None;
    }
    Some(format!(
        "{BASE_URL}/{congress}/{law}/xml_usc{title_number:02}@{release_point}.zip"
    ))
}

/// Stream the first `.xml` entry of a release ZIP through `parser`.
pub fn parse_title_archive<R, F>(parser: &UslmParser, mut input: R, sink: F) -> Result<ParseStats>
where
    R: Read + Seek,
    F: FnMut(ParsedSection),
{
    check_zip_header(&mut input)?;

    let mut archive = ZipArchive::new(input)?;
    let index = xml_entry_index(&mut archive)?;
    let entry = archive.by_index(index)?;
    tracing::info!("Extracting XML file: {} ({} bytes)", entry.name(), entry.size());

    parser.parse_stream(BufReader::with_capacity(XML_BUFFER_SIZE, entry), sink)
}

fn check_zip_header<R: Read + Seek>(input: &mut R) -> Result<()> {
    let mut preview = Vec::with_capacity(256);
    input.by_ref().take(256).read_to_end(&mut preview)?;
    input.seek(SeekFrom::Start(0))?;

    if preview.starts_with(&ZIP_MAGIC) {
        return Ok(());
    }
    let text = String::from_utf8_lossy(&preview).to_lowercase();
    if text.contains("<!doctype html") || text.contains("<html") {
        tracing::warn!("Got an HTML page instead of a ZIP archive; the release point may be outdated");
    }
    Err(ParseError::NotAnArchive)
}

fn xml_entry_index<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<usize> {
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        if !entry.is_dir() && entry.name().ends_with(".xml") {
            return Ok(index);
        }
    }
    Err(ParseError::MissingXmlEntry)
}
