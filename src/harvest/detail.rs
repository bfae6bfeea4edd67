//! Detail extractor
//!
//! Parses one listing page into a `ListingRecord`. Each content field is
//! looked up independently from a small rule table; a field whose element
//! is missing or has an unexpected shape becomes an empty string without
//! affecting the other fields.

use crate::harvest::layout;
use crate::listing::{Field, ListingRecord};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};

/// How the text of a matched element is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextRead {
    /// All text below the element
    Text,
    /// Text of the first anchor below the element
    AnchorText,
}

/// One field extraction: where to look and how to read it
#[derive(Debug, Clone, Copy)]
struct FieldRule {
    field: Field,
    selector: &'static str,
    read: TextRead,
}

const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: Field::CompanyName,
        selector: layout::COMPANY,
        read: TextRead::AnchorText,
    },
    FieldRule {
        field: Field::City,
        selector: layout::CITY,
        read: TextRead::AnchorText,
    },
    FieldRule {
        field: Field::Title,
        selector: layout::TITLE,
        read: TextRead::Text,
    },
    FieldRule {
        field: Field::PostingDate,
        selector: layout::DATE_POSTED,
        read: TextRead::Text,
    },
    FieldRule {
        field: Field::ExpirationDate,
        selector: layout::DEADLINE,
        read: TextRead::Text,
    },
    FieldRule {
        field: Field::Description,
        selector: layout::DESCRIPTION,
        read: TextRead::Text,
    },
    FieldRule {
        field: Field::Category,
        selector: layout::CATEGORIES,
        read: TextRead::Text,
    },
];

/// Extracts a listing record, stamping it with the current time
pub fn extract_listing(markup: &str, link: &str) -> ListingRecord {
    extract_listing_at(markup, link, Utc::now())
}

/// Extracts a listing record with an explicit extraction time
///
/// # Arguments
///
/// * `markup` - The listing detail page
/// * `link` - The listing URL, used as the record's identity
/// * `scraped_at` - Timestamp stored on the record
///
/// # Returns
///
/// A record with every field set; fields that could not be read are empty.
pub fn extract_listing_at(markup: &str, link: &str, scraped_at: DateTime<Utc>) -> ListingRecord {
    let document = Html::parse_document(markup);
    let mut record = ListingRecord::empty(link, scraped_at);

    for rule in FIELD_RULES {
        match extract_field(&document, rule) {
            Some(value) => record.set_field(rule.field, value),
            None => tracing::debug!("No {} found for {}", rule.field, link),
        }
    }

    record
}

/// Reads one field, or `None` if any lookup along the way fails
fn extract_field(document: &Html, rule: &FieldRule) -> Option<String> {
    let selector = Selector::parse(rule.selector).ok()?;
    let element = document.select(&selector).next()?;

    let text = match rule.read {
        TextRead::Text => element_text(element),
        TextRead::AnchorText => {
            let anchor = Selector::parse("a").ok()?;
            element_text(element.select(&anchor).next()?)
        }
    };

    Some(text.trim().to_string())
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}
