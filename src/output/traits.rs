//! Output sink traits and types
//!
//! This module defines the trait interface for output sinks and the
//! summary reported at the end of a run.

use crate::listing::ListingRecord;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Summary of one harvest run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Journal run ID, if a journal was used
    pub run_id: Option<i64>,
    /// Whether an interrupted run was picked up again
    pub resumed: bool,
    /// Distinct links enumerated from the catalog
    pub links_found: usize,
    /// Links already journaled by the resumed run
    pub links_reused: usize,
    /// Records in the written dataset
    pub records_written: usize,
    pub links_skipped: usize,
    pub duplicates_dropped: usize,
    /// Records with at least one empty content field
    pub incomplete_records: usize,
    /// Why the harvest ended early, if it did
    pub abort_reason: Option<String>,
    pub output_path: Option<PathBuf>,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Returns the share of attempted links that produced a record
    pub fn success_rate(&self) -> f64 {
        let attempted = self.records_written + self.links_skipped;
        if attempted == 0 {
            return 0.0;
        }
        (self.records_written as f64 / attempted as f64) * 100.0
    }
}

/// Persists the final record set
pub trait OutputSink {
    /// Writes every record and returns where they went
    ///
    /// # Arguments
    ///
    /// * `records` - The deduplicated dataset
    ///
    /// # Returns
    ///
    /// * `Ok(PathBuf)` - Location of the written artifact
    /// * `Err(OutputError)` - The artifact could not be written
    fn write_records(&self, records: &[ListingRecord]) -> OutputResult<PathBuf>;
}
