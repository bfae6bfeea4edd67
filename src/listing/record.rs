//! Listing record definitions
//!
//! A record is created once per successfully fetched listing and never
//! mutated after it has been appended to a harvest collection.

use chrono::{DateTime, Utc};
use std::fmt;

/// The free-text content fields of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    CompanyName,
    City,
    PostingDate,
    ExpirationDate,
    Description,
    Category,
}

impl Field {
    /// All content fields, in output column order
    pub const ALL: [Field; 7] = [
        Field::Title,
        Field::CompanyName,
        Field::City,
        Field::PostingDate,
        Field::ExpirationDate,
        Field::Description,
        Field::Category,
    ];

    /// Column name used by the spreadsheet and the journal
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::Title => "job_title",
            Self::CompanyName => "company_name",
            Self::City => "job_city",
            Self::PostingDate => "posting_date",
            Self::ExpirationDate => "expiration_date",
            Self::Description => "job_description",
            Self::Category => "job_category",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// One extracted job listing
///
/// Every content field is always present; a field whose markup was missing
/// holds an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    /// The listing URL this record was derived from (its identity)
    pub link: String,
    pub title: String,
    pub company_name: String,
    pub city: String,
    pub posting_date: String,
    pub expiration_date: String,
    pub description: String,
    pub category: String,
    /// Wall-clock time of the extraction
    pub scraped_at: DateTime<Utc>,
}

impl ListingRecord {
    /// Creates a record with every content field empty
    pub fn empty(link: impl Into<String>, scraped_at: DateTime<Utc>) -> Self {
        Self {
            link: link.into(),
            title: String::new(),
            company_name: String::new(),
            city: String::new(),
            posting_date: String::new(),
            expiration_date: String::new(),
            description: String::new(),
            category: String::new(),
            scraped_at,
        }
    }

    /// Returns the value of a content field
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::CompanyName => &self.company_name,
            Field::City => &self.city,
            Field::PostingDate => &self.posting_date,
            Field::ExpirationDate => &self.expiration_date,
            Field::Description => &self.description,
            Field::Category => &self.category,
        }
    }

    /// Sets a content field; only used while the record is being built
    pub(crate) fn set_field(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::CompanyName => &mut self.company_name,
            Field::City => &mut self.city,
            Field::PostingDate => &mut self.posting_date,
            Field::ExpirationDate => &mut self.expiration_date,
            Field::Description => &mut self.description,
            Field::Category => &mut self.category,
        };
        *slot = value;
    }

    /// Number of content fields that ended up empty
    pub fn missing_fields(&self) -> usize {
        Field::ALL
            .iter()
            .filter(|field| self.field(**field).is_empty())
            .count()
    }
}
