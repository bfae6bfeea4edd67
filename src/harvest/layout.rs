//! Portal markup selectors
//!
//! These selectors are tied to the portal's current templates and break on
//! redesign.

/// Cookie-consent affordance clicked once after opening the catalog
pub const CONSENT: &str = "section#jobify_widget_jobs-1 a > strong";

/// The "load more" affordance on the catalog page
pub const REVEAL_MORE: &str = "section#jobify_widget_jobs-1 a > strong";

/// The single container holding every catalog item
pub const LISTINGS_CONTAINER: &str = "div.job_listings";

/// One catalog item; its `href` is the listing link
pub const LISTING_ANCHOR: &str = "a.job_listing-clickbox";

pub const TITLE: &str = "h1.page-title";
pub const COMPANY: &str = "li.job-company";
pub const CITY: &str = "li.location";
pub const DATE_POSTED: &str = "li.date-posted";
pub const DEADLINE: &str = "li.application-deadline";
pub const DESCRIPTION: &str = "div.job-overview-content.row";
pub const CATEGORIES: &str = "div.job_listing-categories";
