//! Spreadsheet output
//!
//! Writes the dataset as a CSV spreadsheet named after the run's start time
//! and the portal, one row per listing keyed by its scraping time.

use crate::config::OutputConfig;
use crate::listing::ListingRecord;
use crate::output::traits::{OutputResult, OutputSink};
use chrono::{DateTime, Local, SecondsFormat};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One spreadsheet row
#[derive(Debug, Serialize)]
struct SpreadsheetRow<'a> {
    scraping_time: String,
    object_link: &'a str,
    job_title: &'a str,
    company_name: &'a str,
    job_city: &'a str,
    posting_date: &'a str,
    expiration_date: &'a str,
    job_description: &'a str,
    job_category: &'a str,
}

impl<'a> From<&'a ListingRecord> for SpreadsheetRow<'a> {
    fn from(record: &'a ListingRecord) -> Self {
        Self {
            scraping_time: record.scraped_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            object_link: &record.link,
            job_title: &record.title,
            company_name: &record.company_name,
            job_city: &record.city,
            posting_date: &record.posting_date,
            expiration_date: &record.expiration_date,
            job_description: &record.description,
            job_category: &record.category,
        }
    }
}

/// Writes records to `<directory>/<YYYYmmdd_HHMMSS>_<suffix>.csv`
#[derive(Debug, Clone)]
pub struct SpreadsheetSink {
    path: PathBuf,
}

impl SpreadsheetSink {
    /// Creates a sink whose file name embeds `started_at`
    pub fn new(directory: &Path, portal_suffix: &str, started_at: DateTime<Local>) -> Self {
        let file_name = format!(
            "{}_{}.csv",
            started_at.format("%Y%m%d_%H%M%S"),
            portal_suffix
        );
        Self {
            path: directory.join(file_name),
        }
    }

    pub fn from_config(config: &OutputConfig, started_at: DateTime<Local>) -> Self {
        Self::new(Path::new(&config.directory), &config.portal_suffix, started_at)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputSink for SpreadsheetSink {
    fn write_records(&self, records: &[ListingRecord]) -> OutputResult<PathBuf> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        tracing::info!("Writing {} records to {}", records.len(), self.path.display());

        let mut writer = csv::Writer::from_path(&self.path)?;
        if records.is_empty() {
            // serialize() only emits headers together with the first row
            writer.write_record([
                "scraping_time",
                "object_link",
                "job_title",
                "company_name",
                "job_city",
                "posting_date",
                "expiration_date",
                "job_description",
                "job_category",
            ])?;
        }
        for record in records {
            writer.serialize(SpreadsheetRow::from(record))?;
        }
        writer.flush()?;

        Ok(self.path.clone())
    }
}
