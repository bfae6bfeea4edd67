//! Harvest aggregator
//!
//! Drives the detail extractor over the enumerated links, one at a time and
//! in order, with politeness pacing between requests. A connection-level
//! failure skips only the current link; a fatal failure (TLS, journal write)
//! ends the harvest and keeps what was collected so far.

use crate::fetch::{fetch_with_retry, pause, DocumentSource, FetchMode, Pacing, RetryPolicy};
use crate::harvest::detail::extract_listing;
use crate::listing::{dedup_by_link, ListingLink, ListingRecord};
use crate::storage::RecordJournal;

/// A link that produced no record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLink {
    pub link: ListingLink,
    pub reason: String,
}

/// Result of harvesting a set of links
#[derive(Debug, Clone, Default)]
pub struct HarvestOutcome {
    /// Deduplicated records, first record per link kept
    pub records: Vec<ListingRecord>,
    pub skipped: Vec<SkippedLink>,
    /// Records dropped by deduplication
    pub duplicates: usize,
    /// Why the harvest stopped early, if it did
    pub aborted: Option<String>,
}

impl HarvestOutcome {
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }
}

/// Iterates listing links through the fetch retrier and the extractor
pub struct Harvester<'a, S: DocumentSource + ?Sized> {
    source: &'a S,
    mode: FetchMode,
    retry: RetryPolicy,
    pacing: Pacing,
}

impl<'a, S: DocumentSource + ?Sized> Harvester<'a, S> {
    pub fn new(source: &'a S, mode: FetchMode, retry: RetryPolicy, pacing: Pacing) -> Self {
        Self {
            source,
            mode,
            retry,
            pacing,
        }
    }

    /// Harvests every link in order
    ///
    /// # Arguments
    ///
    /// * `links` - Listing links in enumeration order
    /// * `journal` - Receives each record as soon as it is extracted
    ///
    /// # Returns
    ///
    /// The collected records and skipped links. A fatal failure is reported
    /// through `HarvestOutcome::aborted`, never as an error, so partial
    /// results always reach the caller.
    pub async fn harvest(
        &self,
        links: &[ListingLink],
        journal: &mut dyn RecordJournal,
    ) -> HarvestOutcome {
        let total = links.len();
        let mut records = Vec::with_capacity(total);
        let mut skipped = Vec::new();
        let mut aborted = None;

        for (index, link) in links.iter().enumerate() {
            pause(self.pacing.before_request).await;
            tracing::info!("Parsing URL {}/{}: {}", index + 1, total, link);

            match fetch_with_retry(self.source, link, self.mode, &self.retry).await {
                Ok(markup) => {
                    let record = extract_listing(&markup, link);
                    tokio::time::sleep(self.pacing.after_request).await;

                    let journaled = journal.record(&record);
                    records.push(record);
                    if let Err(e) = journaled {
                        tracing::error!("Journal write failed, stopping harvest: {}", e);
                        aborted = Some(format!("journal write failed: {}", e));
                        break;
                    }
                }
                Err(e) if e.is_fatal() => {
                    tracing::error!("Fatal failure on {}, stopping harvest: {}", link, e);
                    aborted = Some(e.to_string());
                    break;
                }
                Err(e) => {
                    skipped.push(SkippedLink {
                        link: link.clone(),
                        reason: e.to_string(),
                    });
                    let wait = self.pacing.after_skip.sample()
                        + self.pacing.skip_penalty * skipped.len() as u32;
                    tracing::warn!(
                        "Skipping {} ({}), waiting {:.0}s and continuing...",
                        link,
                        e,
                        wait.as_secs_f64()
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }

        let collected = records.len();
        let records = dedup_by_link(records);
        let duplicates = collected - records.len();

        tracing::info!(
            "Harvested {} records ({} skipped, {} duplicates dropped)",
            records.len(),
            skipped.len(),
            duplicates
        );

        HarvestOutcome {
            records,
            skipped,
            duplicates,
            aborted,
        }
    }
}
