use std::io::{self, BufRead};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{ParseError, Result};
use crate::runtime::cancel::CancellationToken;
use crate::types::{ParseStats, ParsedSection};
use crate::uslm::context::ParserContext;

/// Streaming USLM parser.
///
/// Each call to [`UslmParser::parse_stream`] is one forward pass over its own
/// reader; the parser itself only carries configuration and can be reused.
#[derive(Debug, Clone, Default)]
pub struct UslmParser {
    cancel: Option<CancellationToken>,
}

impl UslmParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the pass after the next emitted section once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Parse a whole document, calling `sink` once per completed section in
    /// document order.
    ///
    /// Sections already handed to `sink` stay valid when the pass later fails.
    pub fn parse_stream<R, F>(&self, input: R, mut sink: F) -> Result<ParseStats>
    where
        R: BufRead,
        F: FnMut(ParsedSection),
    {
        let mut reader = Reader::from_reader(input);
        let config = reader.config_mut();
        config.trim_text(false);
        config.expand_empty_elements = true;
        config.check_end_names = true;

        let mut ctx = ParserContext::new();
        let mut buf = Vec::new();
        let mut open_elements = 0usize;

        loop {
            let event = match reader.read_event_into(&mut buf) {
                Ok(event) => event,
                Err(err) => return Err(reader_error(err, reader.error_position())),
            };

            match event {
                Event::Start(ref e) => {
                    open_elements += 1;
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    ctx.on_start(&name, e)
                        .map_err(|err| reader_error(err, reader.buffer_position()))?;
                }
                Event::End(ref e) => {
                    open_elements = open_elements.saturating_sub(1);
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if let Some(section) = ctx.on_end(&name) {
                        tracing::debug!(identifier = %section.identifier, "Parsed section");
                        sink(section);
                        if self.is_cancelled() {
                            let sections_emitted = ctx.stats().sections_emitted;
                            tracing::warn!("Parse cancelled after {} sections", sections_emitted);
                            return Err(ParseError::Cancelled { sections_emitted });
                        }
                    }
                }
                Event::Text(ref e) => {
                    let text = e
                        .unescape()
                        .map_err(|err| reader_error(err, reader.buffer_position()))?;
                    ctx.on_text(&text);
                }
                Event::CData(ref e) => {
                    ctx.on_text(&String::from_utf8_lossy(e.as_ref()));
                }
                Event::DocType(_) => {
                    tracing::error!("Rejected DOCTYPE declaration in USLM input");
                    return Err(ParseError::SecurityViolation(
                        "DOCTYPE declarations are not allowed".to_string(),
                    ));
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if open_elements > 0 {
            return Err(ParseError::UnexpectedEndOfStream {
                open_elements,
                in_section: ctx.in_section(),
            });
        }

        let stats = ctx.stats();
        tracing::info!(
            "Parsed {} sections from USLM XML ({} skipped)",
            stats.sections_emitted,
            stats.sections_skipped
        );
        Ok(stats)
    }

    /// Collect every section into memory. Meant for tests and small inputs.
    pub fn parse<R: BufRead>(&self, input: R) -> Result<Vec<ParsedSection>> {
        let mut sections = Vec::new();
        self.parse_stream(input, |section| sections.push(section))?;
        Ok(sections)
    }

    /// Parse a single `<section>` fragment.
    ///
    /// Errors are reported on the returned record instead of propagated;
    /// `None` means the fragment held no section.
    pub fn parse_section(&self, xml: &str) -> Option<ParsedSection> {
        match self.parse(xml.as_bytes()) {
            Ok(sections) => sections.into_iter().next(),
            Err(err) => {
                tracing::error!("Failed to parse section XML: {}", err);
                Some(ParsedSection::from_error(err.to_string()))
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

fn reader_error(err: quick_xml::Error, position: u64) -> ParseError {
    match err {
        quick_xml::Error::Io(io_err) => {
            ParseError::Io(io::Error::new(io_err.kind(), io_err.to_string()))
        }
        other => ParseError::malformed(position, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_no_sections() {
        let parser = UslmParser::new();
        let stats = parser.parse_stream("<uslm/>".as_bytes(), |_| {}).unwrap();
        assert_eq!(stats, ParseStats::default());
    }

    #[test]
    fn mismatched_end_tag_is_malformed() {
        let parser = UslmParser::new();
        let err = parser
            .parse("<uslm><section identifier=\"/us/usc/t1/s1\"></uslm>".as_bytes())
            .unwrap_err();
        assert!(matches!(err, ParseError::MalformedXml { .. }), "{err:?}");
    }

    #[test]
    fn doctype_is_rejected() {
        let parser = UslmParser::new();
        let xml = r#"<?xml version="1.0"?><!DOCTYPE uslm [<!ENTITY xxe SYSTEM "file:///etc/passwd">]><uslm>&xxe;</uslm>"#;
        let err = parser.parse(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::SecurityViolation(_)), "{err:?}");
    }

    #[test]
    fn unknown_entity_is_malformed() {
        let parser = UslmParser::new();
        let xml = r#"<section identifier="/us/usc/t1/s1"><heading>&xxe;</heading></section>"#;
        let err = parser.parse(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::MalformedXml { .. }), "{err:?}");
    }
}
