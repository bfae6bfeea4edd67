//! Storage module for the run journal
//!
//! This module handles all database operations of the harvester:
//! - SQLite database initialization and schema management
//! - Run tracking and resumption support
//! - Journaling of each extracted record as it is produced

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{RunJournal, SqliteStorage};
pub use traits::{NullJournal, RecordJournal, Storage, StorageError, StorageResult};

use crate::HarvestError;

use std::path::Path;

/// Initializes or opens a journal database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(HarvestError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub catalog_url: String,
    pub status: RunStatus,
}

impl RunRecord {
    /// Returns true if a later invocation should pick this run up again
    pub fn is_resumable(&self) -> bool {
        matches!(self.status, RunStatus::Running | RunStatus::Interrupted)
    }
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    /// Ended early by a fatal failure; partial results were kept
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
