//! Output module for the harvested dataset and run reports
//!
//! This module handles:
//! - Writing the deduplicated dataset as a spreadsheet artifact
//! - Summarizing a run
//! - Extracting statistics from the run journal

mod spreadsheet;
pub mod stats;
mod traits;

pub use spreadsheet::SpreadsheetSink;
pub use stats::{load_statistics, print_statistics, print_summary, JournalStatistics};
pub use traits::{OutputError, OutputResult, OutputSink, RunSummary};
