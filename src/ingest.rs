//! Feeding parsed sections into a persistent store.
//!
//! The parser emits one section at a time; the importer groups them into
//! batches, upserts each record and keeps running statistics in an
//! [`ImportResult`]. Store failures are counted per record and never abort
//! the pass. A parse failure does, after the sections already read have been
//! flushed.

use std::io::{BufRead, Read, Seek};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::configs::ImportConfig;
use crate::error::Result;
use crate::normalize::source_url;
use crate::source::parse_title_archive;
use crate::types::ParsedSection;
use crate::uslm::UslmParser;

pub const IMPORT_SOURCE: &str = "USCODE";
const DEFAULT_MAX_ERRORS: usize = 100;

/// Persistence-facing form of a parsed section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatuteRecord {
    #[serde(flatten)]
    pub section: ParsedSection,
    pub source_url: Option<String>,
    pub release_point: String,
    pub import_source: String,
}

impl StatuteRecord {
    pub fn from_section(section: ParsedSection, release_point: &str) -> Self {
        Self {
            source_url: source_url(&section.identifier),
            section,
            release_point: release_point.to_string(),
            import_source: IMPORT_SOURCE.to_string(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.section.identifier
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Keyed by section identifier: an existing record is replaced in place.
pub trait SectionStore {
    fn upsert(&mut self, record: StatuteRecord) -> std::result::Result<UpsertOutcome, String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub title_number: Option<u32>,
    pub release_point: String,
    pub sections_inserted: usize,
    pub sections_updated: usize,
    pub sections_failed: usize,
    pub total_processed: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub success: bool,
    pub error_message: Option<String>,
    pub errors: Vec<String>,
    #[serde(skip, default = "default_max_errors")]
    max_errors: usize,
}

fn default_max_errors() -> usize {
    DEFAULT_MAX_ERRORS
}

impl ImportResult {
    fn new(title_number: Option<u32>, release_point: &str) -> Self {
        Self {
            title_number,
            release_point: release_point.to_string(),
            sections_inserted: 0,
            sections_updated: 0,
            sections_failed: 0,
            total_processed: 0,
            started_at: Utc::now(),
            completed_at: None,
            success: false,
            error_message: None,
            errors: Vec::new(),
            max_errors: DEFAULT_MAX_ERRORS,
        }
    }

    pub fn for_title(title_number: u32, release_point: &str) -> Self {
        Self::new(Some(title_number), release_point)
    }

    pub fn for_full_import(release_point: &str) -> Self {
        Self::new(None, release_point)
    }

    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = max_errors;
        self
    }

    /// Record a failed section. Messages past the cap are dropped but still
    /// counted.
    pub fn add_error(&mut self, error: impl Into<String>) {
        if self.errors.len() < self.max_errors {
            self.errors.push(error.into());
        }
        self.sections_failed += 1;
    }

    pub fn mark_success(&mut self) {
        self.completed_at = Some(Utc::now());
        self.success = true;
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.completed_at = Some(Utc::now());
        self.success = false;
        self.error_message = Some(message.into());
    }

    /// Zero until the result is marked complete.
    pub fn duration(&self) -> Duration {
        match self.completed_at {
            Some(completed_at) => completed_at - self.started_at,
            None => Duration::zero(),
        }
    }

    pub fn duration_formatted(&self) -> String {
        let duration = self.duration();
        let minutes = duration.num_minutes();
        let seconds = duration.num_seconds() - minutes * 60;
        format!("{minutes} min {seconds} sec")
    }

    /// Fold a per-title result into an aggregate. A failed title adds one
    /// `Title N: ...` error on top of its own counts.
    pub fn absorb(&mut self, other: &ImportResult) {
        self.sections_inserted += other.sections_inserted;
        self.sections_updated += other.sections_updated;
        self.sections_failed += other.sections_failed;
        self.total_processed += other.total_processed;

        if !other.success {
            let title = other
                .title_number
                .map(|n| n.to_string())
                .unwrap_or_else(|| "?".to_string());
            let message = other.error_message.as_deref().unwrap_or("unknown error");
            self.add_error(format!("Title {title}: {message}"));
        }
    }
}

pub struct Importer {
    parser: UslmParser,
    config: ImportConfig,
}

impl Importer {
    pub fn new(parser: UslmParser, config: ImportConfig) -> Self {
        Self { parser, config }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    fn new_title_result(&self, title_number: u32) -> ImportResult {
        ImportResult::for_title(title_number, self.config.release_point())
            .with_max_errors(self.config.max_errors)
    }

    /// Parse `input` and upsert every section into `store`, updating `result`.
    ///
    /// Store failures are recorded on `result`; only parse failures are
    /// returned.
    pub fn import_stream<R, S>(&self, input: R, store: &mut S, result: &mut ImportResult) -> Result<()>
    where
        R: BufRead,
        S: SectionStore,
    {
        self.run_batched(store, result, |parser, sink| {
            parser.parse_stream(input, sink).map(|_| ())
        })
    }

    /// Import one title from its release-point ZIP. Never fails: errors end up
    /// in the returned result.
    pub fn import_title_archive<R, S>(&self, title_number: u32, input: R, store: &mut S) -> ImportResult
    where
        R: Read + Seek,
        S: SectionStore,
    {
        let mut result = self.new_title_result(title_number);
        tracing::info!(
            "Starting import of US Code Title {} (release point: {})",
            title_number,
            result.release_point
        );

        let outcome = self.run_batched(store, &mut result, |parser, sink| {
            parse_title_archive(parser, input, sink).map(|_| ())
        });
        self.finish(title_number, outcome, &mut result);
        result
    }

    /// Same as [`Importer::import_title_archive`] for an already extracted XML stream.
    pub fn import_title_xml<R, S>(&self, title_number: u32, input: R, store: &mut S) -> ImportResult
    where
        R: BufRead,
        S: SectionStore,
    {
        let mut result = self.new_title_result(title_number);
        let outcome = self.import_stream(input, store, &mut result);
        self.finish(title_number, outcome, &mut result);
        result
    }

    /// Import several titles into one aggregate result.
    ///
    /// `open` supplies each title's release ZIP; a failure there is recorded
    /// as `Download failed: ...` for that title and the run moves on. The
    /// aggregate succeeds only when every title does.
    pub fn import_titles<I, R, S, O>(&self, titles: I, mut open: O, store: &mut S) -> ImportResult
    where
        I: IntoIterator<Item = u32>,
        R: Read + Seek,
        S: SectionStore,
        O: FnMut(u32) -> Result<R>,
    {
        let mut total = ImportResult::for_full_import(self.config.release_point())
            .with_max_errors(self.config.max_errors);
        tracing::info!(
            "Starting full US Code import (release point: {})",
            total.release_point
        );

        let mut succeeded = 0usize;
        let mut failed = 0usize;
        for title_number in titles {
            tracing::info!("Importing Title {}...", title_number);
            let title_result = match open(title_number) {
                Ok(input) => self.import_title_archive(title_number, input, store),
                Err(err) => {
                    tracing::error!("Failed to open Title {}: {}", title_number, err);
                    let mut result = self.new_title_result(title_number);
                    result.mark_failed(format!("Download failed: {err}"));
                    result
                }
            };

            if title_result.success {
                succeeded += 1;
            } else {
                failed += 1;
            }
            total.absorb(&title_result);
        }

        if failed == 0 {
            total.mark_success();
            tracing::info!(
                "Full import completed successfully: {} titles, {} sections",
                succeeded,
                total.total_processed
            );
        } else {
            total.mark_failed(format!("{failed} of {} titles failed", succeeded + failed));
            tracing::warn!(
                "Full import completed with errors: {} successful, {} failed",
                succeeded,
                failed
            );
        }
        total
    }

    fn finish(&self, title_number: u32, outcome: Result<()>, result: &mut ImportResult) {
        match outcome {
            Ok(()) => {
                result.mark_success();
                tracing::info!(
                    "Completed import of Title {}: {} inserted, {} updated, {} failed in {}",
                    title_number,
                    result.sections_inserted,
                    result.sections_updated,
                    result.sections_failed,
                    result.duration_formatted()
                );
            }
            Err(err) => {
                tracing::error!("Failed to parse Title {}: {}", title_number, err);
                result.mark_failed(format!("Parse failed: {err}"));
            }
        }
    }

    fn run_batched<S, P>(&self, store: &mut S, result: &mut ImportResult, parse: P) -> Result<()>
    where
        S: SectionStore,
        P: FnOnce(&UslmParser, &mut dyn FnMut(ParsedSection)) -> Result<()>,
    {
        let batch_size = self.config.batch_size.max(1);
        let progress_interval = self.config.progress_interval.max(1);
        let release_point = result.release_point.clone();
        let mut batch: Vec<StatuteRecord> = Vec::with_capacity(batch_size);

        let outcome = {
            let mut sink = |section: ParsedSection| {
                batch.push(StatuteRecord::from_section(section, &release_point));
                result.total_processed += 1;

                if batch.len() >= batch_size {
                    save_batch(store, &mut batch, result);
                }
                if result.total_processed % progress_interval == 0 {
                    tracing::info!("Progress: {} sections processed", result.total_processed);
                }
            };
            parse(&self.parser, &mut sink)
        };

        if !batch.is_empty() {
            save_batch(store, &mut batch, result);
        }
        outcome
    }
}

fn save_batch<S: SectionStore>(store: &mut S, batch: &mut Vec<StatuteRecord>, result: &mut ImportResult) {
    for record in batch.drain(..) {
        let identifier = record.identifier().to_string();
        match store.upsert(record) {
            Ok(UpsertOutcome::Inserted) => result.sections_inserted += 1,
            Ok(UpsertOutcome::Updated) => result.sections_updated += 1,
            Err(err) => {
                tracing::warn!("Failed to save statute {}: {}", identifier, err);
                result.add_error(format!("{identifier}: {err}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_list_is_capped_but_failures_are_counted() {
        let mut result = ImportResult::for_title(5, "119-46").with_max_errors(2);
        for i in 0..5 {
            result.add_error(format!("error {i}"));
        }
        assert_eq!(result.errors, vec!["error 0", "error 1"]);
        assert_eq!(result.sections_failed, 5);
    }

    #[test]
    fn duration_is_formatted_in_minutes_and_seconds() {
        let mut result = ImportResult::for_title(5, "119-46");
        result.completed_at = Some(result.started_at + Duration::seconds(125));
        assert_eq!(result.duration_formatted(), "2 min 5 sec");
    }

    #[test]
    fn duration_is_zero_before_completion() {
        let result = ImportResult::for_full_import("119-46");
        assert_eq!(result.duration(), Duration::zero());
        assert_eq!(result.duration_formatted(), "0 min 0 sec");
    }

    #[test]
    fn absorb_sums_counts_and_records_failed_titles() {
        let mut total = ImportResult::for_full_import("119-46");

        let mut ok = ImportResult::for_title(1, "119-46");
        ok.sections_inserted = 3;
        ok.total_processed = 3;
        ok.mark_success();

        let mut failed = ImportResult::for_title(2, "119-46");
        failed.sections_updated = 1;
        failed.total_processed = 1;
        failed.mark_failed("Parse failed: boom");

        total.absorb(&ok);
        total.absorb(&failed);

        assert_eq!(total.sections_inserted, 3);
        assert_eq!(total.sections_updated, 1);
        assert_eq!(total.total_processed, 4);
        assert_eq!(total.errors, vec!["Title 2: Parse failed: boom"]);
        assert_eq!(total.sections_failed, 1);
    }

    #[test]
    fn record_carries_source_url_and_import_source() {
        let section = ParsedSection {
            identifier: "/us/usc/t5/s101".to_string(),
            ..ParsedSection::default()
        };
        let record = StatuteRecord::from_section(section, "119-46");
        assert_eq!(
            record.source_url.as_deref(),
            Some("https://uscode.house.gov/view.xhtml?req=granuleid:USC-prelim-title5-section101")
        );
        assert_eq!(record.import_source, "USCODE");
        assert_eq!(record.release_point, "119-46");
    }
}
