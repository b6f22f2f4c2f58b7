//! End-to-end batch: folder → listing → read → transform → tag → records.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use drivedocs_drive::{ContentReader, FileLister};
use drivedocs_keywords::KeywordExtractor;
use drivedocs_shared::{DriveDocsError, FileDescriptor, Record, Result, RunId};

use crate::record::{extract_url, title_info};

/// Inputs for one batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Remote folder to process.
    pub folder_id: String,
    /// Date stamped on every record (`YYYY-MM-DD`).
    pub last_updated: String,
}

/// A file that was skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    /// Raw title of the skipped file.
    pub title: String,
    /// Remote identifier of the skipped file.
    pub id: String,
    /// Rendered error.
    pub error: String,
}

/// Outcome of a batch: the records built plus every per-file failure.
#[derive(Debug)]
pub struct BuildReport {
    /// Identifier for this run (appears in logs).
    pub run_id: RunId,
    /// Records in descriptor order.
    pub records: Vec<Record>,
    /// Skipped files in descriptor order.
    pub failures: Vec<FileFailure>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

impl BuildReport {
    /// Number of files that produced a record.
    pub fn processed(&self) -> usize {
        self.records.len()
    }

    /// Number of files that were skipped.
    pub fn skipped(&self) -> usize {
        self.failures.len()
    }
}

/// Progress callback for reporting batch status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a file is processed.
    fn file_started(&self, title: &str, current: usize, total: usize);
    /// Called when a file is skipped.
    fn file_skipped(&self, title: &str, error: &str);
    /// Called when the batch completes.
    fn done(&self, report: &BuildReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn file_started(&self, _title: &str, _current: usize, _total: usize) {}
    fn file_skipped(&self, _title: &str, _error: &str) {}
    fn done(&self, _report: &BuildReport) {}
}

// ---------------------------------------------------------------------------
// RecordBuilder
// ---------------------------------------------------------------------------

/// Turns file descriptors into records using a reader and a keyword extractor.
pub struct RecordBuilder<'a> {
    reader: &'a dyn ContentReader,
    extractor: &'a dyn KeywordExtractor,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(reader: &'a dyn ContentReader, extractor: &'a dyn KeywordExtractor) -> Self {
        Self { reader, extractor }
    }

    /// Build one record. Any failure discards the whole record.
    pub async fn build_record(
        &self,
        descriptor: &FileDescriptor,
        last_updated: &str,
    ) -> Result<Record> {
        let title = title_info(&descriptor.title);

        let text = self.reader.read_content(descriptor).await?;
        let extracted = extract_url(&text);

        let tags = self.extractor.extract_tags(&extracted.body).await?;

        debug!(
            title = %title.title,
            for_leaders = title.for_leaders,
            has_url = !extracted.url.is_empty(),
            tags = tags.len(),
            "record built"
        );

        Ok(Record {
            title: title.title,
            body: extracted.body,
            last_updated: last_updated.to_string(),
            url: extracted.url,
            tags,
            for_leaders: title.for_leaders,
        })
    }

    /// Build records for every descriptor, skipping the ones that fail.
    pub async fn build_records(
        &self,
        descriptors: &[FileDescriptor],
        last_updated: &str,
    ) -> Vec<Record> {
        self.build_report(descriptors, last_updated, &SilentProgress)
            .await
            .records
    }

    /// Build records and collect the per-file failures.
    ///
    /// Files are processed one at a time, in order.
    #[instrument(skip_all, fields(files = descriptors.len(), last_updated = %last_updated))]
    pub async fn build_report(
        &self,
        descriptors: &[FileDescriptor],
        last_updated: &str,
        progress: &dyn ProgressReporter,
    ) -> BuildReport {
        let start = Instant::now();
        let run_id = RunId::new();
        let total = descriptors.len();

        let mut records = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for (i, descriptor) in descriptors.iter().enumerate() {
            progress.file_started(&descriptor.title, i + 1, total);

            match self.build_record(descriptor, last_updated).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(
                        %run_id,
                        title = %descriptor.title,
                        file_id = %descriptor.id,
                        error = %e,
                        "failed to process file, skipping"
                    );
                    let error = e.to_string();
                    progress.file_skipped(&descriptor.title, &error);
                    failures.push(FileFailure {
                        title: descriptor.title.clone(),
                        id: descriptor.id.clone(),
                        error,
                    });
                }
            }
        }

        let report = BuildReport {
            run_id,
            records,
            failures,
            elapsed: start.elapsed(),
        };

        info!(
            run_id = %report.run_id,
            processed = report.processed(),
            skipped = report.skipped(),
            elapsed_ms = report.elapsed.as_millis(),
            "batch complete"
        );

        report
    }
}

// ---------------------------------------------------------------------------
// Full run
// ---------------------------------------------------------------------------

/// Check that a batch date is a real `YYYY-MM-DD` date.
pub fn validate_batch_date(date: &str) -> Result<()> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|e| {
            DriveDocsError::validation(format!("batch date '{date}' is not YYYY-MM-DD: {e}"))
        })
}

/// Run the full batch for one folder.
///
/// 1. List the folder
/// 2. Read, transform, and tag each file
///
/// Only an invalid batch date is fatal; everything else degrades.
#[instrument(skip_all, fields(folder_id = %config.folder_id))]
pub async fn run_batch(
    config: &BatchConfig,
    lister: &dyn FileLister,
    builder: &RecordBuilder<'_>,
    progress: &dyn ProgressReporter,
) -> Result<BuildReport> {
    validate_batch_date(&config.last_updated)?;

    progress.phase("Listing folder");
    let descriptors = lister.list_files(&config.folder_id).await;
    info!(files = descriptors.len(), "folder listed");

    progress.phase("Building records");
    let report = builder
        .build_report(&descriptors, &config.last_updated, progress)
        .await;

    progress.done(&report);
    Ok(report)
}
