//! Storage traits and error types
//!
//! This module defines the trait interface for the run journal backend, the
//! narrow record sink the harvest loop writes through, and associated error
//! types.

use crate::listing::{ListingLink, ListingRecord};
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Invalid timestamp in journal: {0}")]
    InvalidTimestamp(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for run journal backends
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new harvest run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    /// * `catalog_url` - The catalog entry point of the run
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str, catalog_url: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as finished with the given status and a finish timestamp
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Listings =====

    /// Stores a record for a run
    ///
    /// # Returns
    ///
    /// `true` if the record was written, `false` if the run already had a
    /// record for the same link (the first one is kept)
    fn insert_listing(&mut self, run_id: i64, record: &ListingRecord) -> StorageResult<bool>;

    /// Gets every record of a run in insertion order
    fn listings_for_run(&self, run_id: i64) -> StorageResult<Vec<ListingRecord>>;

    /// Gets the links already journaled for a run
    fn journaled_links(&self, run_id: i64) -> StorageResult<Vec<ListingLink>>;

    // ===== Statistics =====

    /// Gets the total run count
    fn count_runs(&self) -> StorageResult<u64>;

    /// Gets the total record count across all runs
    fn count_listings(&self) -> StorageResult<u64>;

    /// Gets the number of runs in each status
    fn count_runs_by_status(&self, status: RunStatus) -> StorageResult<u64>;
}

/// Where the harvest loop writes each record as soon as it is produced
///
/// A failing write is a persistence failure and ends the harvest.
pub trait RecordJournal: Send {
    fn record(&mut self, record: &ListingRecord) -> StorageResult<()>;
}

/// A journal that keeps nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullJournal;

impl RecordJournal for NullJournal {
    fn record(&mut self, _record: &ListingRecord) -> StorageResult<()> {
        Ok(())
    }
}
