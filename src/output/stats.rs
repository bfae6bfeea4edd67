//! Run summaries and journal statistics
//!
//! This module prints the end-of-run summary and extracts statistics from
//! the run journal for `--stats`.

use crate::output::traits::RunSummary;
use crate::storage::{RunRecord, RunStatus, Storage};
use crate::HarvestError;

/// Journal statistics summary
#[derive(Debug, Clone)]
pub struct JournalStatistics {
    pub total_runs: u64,
    /// Run count per status, in lifecycle order
    pub runs_by_status: Vec<(RunStatus, u64)>,
    /// Records journaled across all runs
    pub total_listings: u64,
    pub latest_run: Option<RunRecord>,
    /// Records journaled by the latest run
    pub latest_run_listings: u64,
}

/// Loads statistics from the journal
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(JournalStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<JournalStatistics, HarvestError> {
    let total_runs = storage.count_runs()?;
    let total_listings = storage.count_listings()?;

    let mut runs_by_status = Vec::new();
    for status in [
        RunStatus::Running,
        RunStatus::Completed,
        RunStatus::Interrupted,
        RunStatus::Failed,
    ] {
        runs_by_status.push((status, storage.count_runs_by_status(status)?));
    }

    let latest_run = storage.get_latest_run()?;
    let latest_run_listings = match &latest_run {
        Some(run) => storage.journaled_links(run.id)?.len() as u64,
        None => 0,
    };

    Ok(JournalStatistics {
        total_runs,
        runs_by_status,
        total_listings,
        latest_run,
        latest_run_listings,
    })
}

/// Prints journal statistics to stdout
pub fn print_statistics(stats: &JournalStatistics) {
    println!("=== Journal Statistics ===\n");

    println!("Overview:");
    println!("  Total runs: {}", stats.total_runs);
    println!("  Total journaled listings: {}", stats.total_listings);
    println!();

    println!("Runs by Status:");
    for (status, count) in &stats.runs_by_status {
        println!("  {}: {}", status.to_db_string(), count);
    }
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  ID: {}", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Catalog: {}", run.catalog_url);
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Listings: {}", stats.latest_run_listings);
            if run.is_resumable() {
                println!("  (will be resumed by the next run unless --fresh is given)");
            }
        }
        None => println!("No runs recorded yet."),
    }
}

/// Prints the end-of-run summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("\n=== Harvest Summary ===\n");

    if let Some(run_id) = summary.run_id {
        let resumed = if summary.resumed { " (resumed)" } else { "" };
        println!("Run: {}{}", run_id, resumed);
    }
    println!("Links found: {}", summary.links_found);
    if summary.links_reused > 0 {
        println!("Links reused from journal: {}", summary.links_reused);
    }
    println!("Records written: {}", summary.records_written);
    println!("Links skipped: {}", summary.links_skipped);
    println!("Duplicates dropped: {}", summary.duplicates_dropped);
    println!("Records with missing fields: {}", summary.incomplete_records);
    println!("Success rate: {:.1}%", summary.success_rate());
    if let Some(reason) = &summary.abort_reason {
        println!("Stopped early: {}", reason);
    }
    if let Some(path) = &summary.output_path {
        println!("Output: {}", path.display());
    }
    println!("Elapsed: {:.1}s", summary.elapsed.as_secs_f64());
}
