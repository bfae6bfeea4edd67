//! Harvest coordinator
//!
//! Runs one complete harvest:
//! 1. Open the run journal and decide whether to resume the previous run
//! 2. Launch the browser session
//! 3. Reveal and enumerate the catalog, repeating the whole cycle while it
//!    yields no links
//! 4. Harvest the links not journaled yet
//! 5. Close the browser, merge resumed records, write the spreadsheet and
//!    record the final run status

use crate::config::{Config, DetailSource};
use crate::fetch::{BrowserSession, DocumentSource, FetchMode, NetworkSource, Pacing, RetryPolicy};
use crate::harvest::aggregator::{HarvestOutcome, Harvester};
use crate::harvest::catalog::{enumerate_links, resolve_links};
use crate::harvest::revealer::{CatalogRevealer, RevealSurface};
use crate::listing::{dedup_by_link, ListingLink, ListingRecord};
use crate::output::{OutputSink, RunSummary, SpreadsheetSink};
use crate::storage::{open_storage, NullJournal, RecordJournal, RunStatus, SqliteStorage, Storage};
use crate::{HarvestError, Result};
use chrono::Local;
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;
use url::Url;

/// Outcome of catalog enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enumeration {
    /// Absolute listing links in catalog order
    Listings(Vec<ListingLink>),
    /// The listings container rendered but stayed empty on every attempt
    Empty { attempts: u32 },
}

/// Reveals and enumerates the catalog, repeating the full cycle on zero links
///
/// # Arguments
///
/// * `surface` - The browser capability driving the catalog page
/// * `revealer` - Reveal loop settings
/// * `catalog_url` - The catalog entry point
/// * `max_attempts` - Full reveal-and-enumerate cycles allowed
///
/// # Returns
///
/// * `Ok(Enumeration::Listings)` - At least one link was found
/// * `Ok(Enumeration::Empty)` - The container was seen but never held a link
/// * `Err(HarvestError::CatalogUnavailable)` - The container never appeared
/// * `Err(HarvestError::Fetch)` - Navigation or a driver call failed
pub async fn enumerate_catalog<R>(
    surface: &R,
    revealer: &CatalogRevealer,
    catalog_url: &Url,
    max_attempts: u32,
) -> Result<Enumeration>
where
    R: RevealSurface + ?Sized,
{
    let mut container_seen = false;

    for attempt in 1..=max_attempts {
        tracing::info!(
            "Collecting listing URLs from {} (attempt {}/{})",
            catalog_url,
            attempt,
            max_attempts
        );

        let revealed = revealer.reveal_all(surface, catalog_url.as_str()).await?;
        let found = enumerate_links(&revealed.markup);
        container_seen |= found.container_found;

        let links = resolve_links(&found.links, catalog_url);
        if !links.is_empty() {
            tracing::info!("Found {} listing URLs", links.len());
            return Ok(Enumeration::Listings(links));
        }

        tracing::warn!(
            "No listing URLs found (container present: {}), repeating the reveal...",
            found.container_found
        );
    }

    if container_seen {
        tracing::warn!("Catalog is empty after {} attempts", max_attempts);
        Ok(Enumeration::Empty {
            attempts: max_attempts,
        })
    } else {
        Err(HarvestError::CatalogUnavailable {
            attempts: max_attempts,
        })
    }
}

/// Settings of the enumerate-then-harvest pipeline
#[derive(Debug, Clone)]
pub struct HarvestPlan {
    pub catalog_url: Url,
    pub revealer: CatalogRevealer,
    pub max_enumeration_attempts: u32,
    pub mode: FetchMode,
    pub retry: RetryPolicy,
    pub pacing: Pacing,
}

impl HarvestPlan {
    pub fn from_config(config: &Config) -> Result<Self> {
        let pacing = Pacing::from_config(&config.pacing);
        Ok(Self {
            catalog_url: Url::parse(&config.catalog.url)?,
            revealer: CatalogRevealer::new(pacing.reveal, config.catalog.max_reveal_clicks),
            max_enumeration_attempts: config.catalog.max_enumeration_attempts,
            mode: FetchMode::from_robust(config.fetch.robust),
            retry: RetryPolicy::from_config(&config.fetch, &config.pacing),
            pacing,
        })
    }
}

/// What the pipeline produced before merging with resumed records
#[derive(Debug, Clone, Default)]
pub struct Collected {
    /// Distinct links enumerated from the catalog
    pub links_found: usize,
    /// Enumerated links skipped because the journal already has them
    pub links_reused: usize,
    pub outcome: HarvestOutcome,
}

/// Enumerates the catalog and harvests every link not in `already_done`
///
/// # Arguments
///
/// * `surface` - Browser capability for the catalog
/// * `source` - Document source for the detail pages
/// * `plan` - Pipeline settings
/// * `already_done` - Links journaled by a resumed run
/// * `journal` - Receives each new record
pub async fn collect_listings<R, S>(
    surface: &R,
    source: &S,
    plan: &HarvestPlan,
    already_done: &HashSet<ListingLink>,
    journal: &mut dyn RecordJournal,
) -> Result<Collected>
where
    R: RevealSurface + ?Sized,
    S: DocumentSource + ?Sized,
{
    let links = match enumerate_catalog(
        surface,
        &plan.revealer,
        &plan.catalog_url,
        plan.max_enumeration_attempts,
    )
    .await?
    {
        Enumeration::Listings(links) => links,
        Enumeration::Empty { .. } => return Ok(Collected::default()),
    };

    let links_found = links.len();
    let pending: Vec<ListingLink> = links
        .into_iter()
        .filter(|link| !already_done.contains(link))
        .collect();
    let links_reused = links_found - pending.len();
    if links_reused > 0 {
        tracing::info!("Skipping {} listings already journaled", links_reused);
    }

    let harvester = Harvester::new(source, plan.mode, plan.retry, plan.pacing);
    let outcome = harvester.harvest(&pending, journal).await;

    Ok(Collected {
        links_found,
        links_reused,
        outcome,
    })
}

/// The journal run a harvest writes into
struct JournalRun {
    run_id: i64,
    resumed: bool,
    /// Records journaled before this invocation
    prior: Vec<ListingRecord>,
}

/// Resumes the latest unfinished run for the same catalog, or starts a new one
fn prepare_run(
    storage: &mut SqliteStorage,
    config_hash: &str,
    catalog_url: &str,
    fresh: bool,
) -> Result<JournalRun> {
    if !fresh {
        if let Some(run) = storage.get_latest_run()? {
            if run.is_resumable() && run.catalog_url == catalog_url {
                if run.config_hash != config_hash {
                    tracing::warn!("Configuration changed since run {} started", run.id);
                }
                let prior = storage.listings_for_run(run.id)?;
                tracing::info!(
                    "Resuming run {} ({} listings already journaled)",
                    run.id,
                    prior.len()
                );
                storage.update_run_status(run.id, RunStatus::Running)?;
                return Ok(JournalRun {
                    run_id: run.id,
                    resumed: true,
                    prior,
                });
            }
        }
    }

    let run_id = storage.create_run(config_hash, catalog_url)?;
    tracing::info!("Starting run {}", run_id);
    Ok(JournalRun {
        run_id,
        resumed: false,
        prior: Vec::new(),
    })
}

/// Runs a complete harvest according to `config`
///
/// # Arguments
///
/// * `config` - Validated configuration
/// * `config_hash` - Hash of the configuration file, stored with the run
/// * `fresh` - Start a new journal run even if the last one is unfinished
///
/// # Returns
///
/// * `Ok(RunSummary)` - The dataset was written (possibly partial)
/// * `Err(HarvestError)` - The run failed before a dataset could be written
pub async fn run_harvest(config: &Config, config_hash: &str, fresh: bool) -> Result<RunSummary> {
    let started = Instant::now();
    let started_at = Local::now();
    let plan = HarvestPlan::from_config(config)?;

    let mut storage = match &config.output.database_path {
        Some(path) => Some(open_storage(Path::new(path))?),
        None => None,
    };
    let journal_run = match storage.as_mut() {
        Some(storage) => Some(prepare_run(
            storage,
            config_hash,
            plan.catalog_url.as_str(),
            fresh,
        )?),
        None => None,
    };
    let already_done: HashSet<ListingLink> = journal_run
        .iter()
        .flat_map(|run| run.prior.iter().map(|record| record.link.clone()))
        .collect();

    let network = match config.fetch.detail_source {
        DetailSource::Network => match NetworkSource::new(&config.fetch) {
            Ok(network) => Some(network),
            Err(e) => {
                mark_run(&mut storage, &journal_run, RunStatus::Failed);
                return Err(e.into());
            }
        },
        DetailSource::Browser => None,
    };

    let session = match BrowserSession::launch(&config.browser).await {
        Ok(session) => session,
        Err(e) => {
            mark_run(&mut storage, &journal_run, RunStatus::Failed);
            return Err(e);
        }
    };

    let collected = {
        let mut run_journal = match (storage.as_mut(), &journal_run) {
            (Some(storage), Some(run)) => Some(storage.journal(run.run_id)),
            _ => None,
        };
        let mut null_journal = NullJournal;
        let journal: &mut dyn RecordJournal = match run_journal.as_mut() {
            Some(journal) => journal,
            None => &mut null_journal,
        };

        let source: &dyn DocumentSource = match &network {
            Some(network) => network,
            None => &session,
        };

        let collected = collect_listings(&session, source, &plan, &already_done, journal).await;
        session.close().await;
        collected
    };

    let collected = match collected {
        Ok(collected) => collected,
        Err(e) => {
            mark_run(&mut storage, &journal_run, RunStatus::Failed);
            return Err(e);
        }
    };

    let (run_id, resumed, prior) = match journal_run {
        Some(run) => (Some(run.run_id), run.resumed, run.prior),
        None => (None, false, Vec::new()),
    };
    let Collected {
        links_found,
        links_reused,
        outcome:
            HarvestOutcome {
                records: harvested,
                skipped,
                duplicates,
                aborted,
            },
    } = collected;
    let merged_input = prior.len() + harvested.len();
    let records = dedup_by_link(prior.into_iter().chain(harvested).collect());
    let duplicates_dropped = duplicates + (merged_input - records.len());

    tracing::info!("Writing output...");
    let sink = SpreadsheetSink::from_config(&config.output, started_at);
    let output_path = match sink.write_records(&records) {
        Ok(path) => path,
        Err(e) => {
            if let (Some(storage), Some(run_id)) = (storage.as_mut(), run_id) {
                finish_quietly(storage, run_id, RunStatus::Failed);
            }
            return Err(e.into());
        }
    };

    let status = if aborted.is_none() {
        RunStatus::Completed
    } else {
        RunStatus::Interrupted
    };
    if let (Some(storage), Some(run_id)) = (storage.as_mut(), run_id) {
        storage.finish_run(run_id, status)?;
    }

    let elapsed = started.elapsed();
    tracing::info!("Elapsed time: {:.1}s", elapsed.as_secs_f64());

    Ok(RunSummary {
        run_id,
        resumed,
        links_found,
        links_reused,
        records_written: records.len(),
        links_skipped: skipped.len(),
        duplicates_dropped,
        incomplete_records: records.iter().filter(|r| r.missing_fields() > 0).count(),
        abort_reason: aborted,
        output_path: Some(output_path),
        elapsed,
    })
}

fn mark_run(storage: &mut Option<SqliteStorage>, run: &Option<JournalRun>, status: RunStatus) {
    if let (Some(storage), Some(run)) = (storage.as_mut(), run) {
        finish_quietly(storage, run.run_id, status);
    }
}

/// Records a final status while another error is already being returned
fn finish_quietly(storage: &mut SqliteStorage, run_id: i64, status: RunStatus) {
    if let Err(e) = storage.finish_run(run_id, status) {
        tracing::warn!("Failed to record status of run {}: {}", run_id, e);
    }
}
