//! Listing data model
//!
//! This module defines the records produced by a harvest and the
//! link-keyed deduplication applied when collections are merged.

mod record;

pub use record::{Field, ListingRecord};

use std::collections::HashSet;

/// Absolute URL identifying one job posting
pub type ListingLink = String;

/// Deduplicates records by `link`, keeping the first occurrence
///
/// Relative order of the surviving records is preserved. Applying it to an
/// already deduplicated collection is a no-op.
pub fn dedup_by_link(records: Vec<ListingRecord>) -> Vec<ListingRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.link.clone()))
        .collect()
}

/// Drops repeated links while keeping first-seen order
pub fn dedup_links<I>(links: I) -> Vec<ListingLink>
where
    I: IntoIterator<Item = ListingLink>,
{
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect()
}
