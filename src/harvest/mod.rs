//! Harvest pipeline
//!
//! This module contains the core of the harvester:
//! - Catalog revelation through repeated "load more" clicks
//! - Listing link enumeration
//! - Fault-isolated detail extraction
//! - Paced, fault-classified aggregation over all links
//! - The coordinator running a complete harvest

mod aggregator;
mod catalog;
mod coordinator;
mod detail;
mod layout;
mod revealer;

pub use aggregator::{HarvestOutcome, Harvester, SkippedLink};
pub use catalog::{enumerate_links, resolve_links, CatalogLinks};
pub use coordinator::{
    collect_listings, enumerate_catalog, run_harvest, Collected, Enumeration, HarvestPlan,
};
pub use detail::{extract_listing, extract_listing_at};
pub use revealer::{CatalogRevealer, ClickOutcome, RevealSurface, RevealedCatalog};
