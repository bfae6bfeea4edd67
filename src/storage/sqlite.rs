//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait
//! and the per-run record journal built on it.

use crate::listing::{ListingLink, ListingRecord};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordJournal, Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use crate::HarvestError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Borrows the storage as the record journal of `run_id`
    pub fn journal(&mut self, run_id: i64) -> RunJournal<'_> {
        RunJournal {
            storage: self,
            run_id,
        }
    }
}

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, catalog_url, status";

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        catalog_url: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Failed),
    })
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| StorageError::InvalidTimestamp(value.to_string()))
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str, catalog_url: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, catalog_url, status) VALUES (?1, ?2, ?3, ?4)",
            params![now, config_hash, catalog_url, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS))?;

        stmt.query_row(params![run_id], run_from_row)
            .map_err(|_| StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM runs ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        ))?;

        Ok(stmt.query_row([], run_from_row).optional()?)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Listings =====

    fn insert_listing(&mut self, run_id: i64, record: &ListingRecord) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO listings
             (run_id, link, title, company_name, city, posting_date, expiration_date,
              description, category, scraped_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                run_id,
                record.link,
                record.title,
                record.company_name,
                record.city,
                record.posting_date,
                record.expiration_date,
                record.description,
                record.category,
                record.scraped_at.to_rfc3339(),
            ],
        )?;
        Ok(inserted > 0)
    }

    fn listings_for_run(&self, run_id: i64) -> StorageResult<Vec<ListingRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT link, title, company_name, city, posting_date, expiration_date,
             description, category, scraped_at
             FROM listings WHERE run_id = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                let scraped_at: String = row.get(8)?;
                let record = ListingRecord {
                    link: row.get(0)?,
                    title: row.get(1)?,
                    company_name: row.get(2)?,
                    city: row.get(3)?,
                    posting_date: row.get(4)?,
                    expiration_date: row.get(5)?,
                    description: row.get(6)?,
                    category: row.get(7)?,
                    scraped_at: DateTime::<Utc>::MIN_UTC,
                };
                Ok((record, scraped_at))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(mut record, scraped_at)| {
                record.scraped_at = parse_timestamp(&scraped_at)?;
                Ok(record)
            })
            .collect()
    }

    fn journaled_links(&self, run_id: i64) -> StorageResult<Vec<ListingLink>> {
        let mut stmt = self
            .conn
            .prepare("SELECT link FROM listings WHERE run_id = ?1 ORDER BY id")?;

        let links = stmt
            .query_map(params![run_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(links)
    }

    // ===== Statistics =====

    fn count_runs(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_listings(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_runs_by_status(&self, status: RunStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM runs WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

/// Journals the records of one run into a `SqliteStorage`
pub struct RunJournal<'a> {
    storage: &'a mut SqliteStorage,
    run_id: i64,
}

impl RunJournal<'_> {
    pub fn run_id(&self) -> i64 {
        self.run_id
    }
}

impl RecordJournal for RunJournal<'_> {
    fn record(&mut self, record: &ListingRecord) -> StorageResult<()> {
        if !self.storage.insert_listing(self.run_id, record)? {
            tracing::debug!("{} already journaled for run {}", record.link, self.run_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CATALOG: &str = "http://www.ofertapune.net/";

    fn record(link: &str, title: &str) -> ListingRecord {
        let scraped_at = Utc.with_ymd_and_hms(2019, 11, 4, 10, 30, 0).unwrap();
        let mut record = ListingRecord::empty(link, scraped_at);
        record.title = title.to_string();
        record.company_name = "Acme".to_string();
        record
    }

    #[test]
    fn test_create_in_memory() {
        let storage = SqliteStorage::new_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_create_and_get_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash", CATALOG).unwrap();
        assert!(run_id > 0);

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.config_hash, "test_hash");
        assert_eq!(run.catalog_url, CATALOG);
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.finished_at.is_none());
    }

    #[test]
    fn test_missing_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.get_run(42),
            Err(StorageError::RunNotFound(42))
        ));
        assert!(matches!(
            storage.update_run_status(42, RunStatus::Failed),
            Err(StorageError::RunNotFound(42))
        ));
    }

    #[test]
    fn test_latest_run_and_finish() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.get_latest_run().unwrap().is_none());

        let first = storage.create_run("a", CATALOG).unwrap();
        let second = storage.create_run("b", CATALOG).unwrap();
        storage.finish_run(second, RunStatus::Interrupted).unwrap();

        let latest = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(latest.id, second);
        assert_eq!(latest.status, RunStatus::Interrupted);
        assert!(latest.finished_at.is_some());
        assert_eq!(storage.get_run(first).unwrap().status, RunStatus::Running);
    }

    #[test]
    fn test_first_listing_per_link_wins() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("hash", CATALOG).unwrap();

        assert!(storage
            .insert_listing(run_id, &record("https://p.example/a", "first"))
            .unwrap());
        assert!(storage
            .insert_listing(run_id, &record("https://p.example/b", "b"))
            .unwrap());
        assert!(!storage
            .insert_listing(run_id, &record("https://p.example/a", "second"))
            .unwrap());

        let listings = storage.listings_for_run(run_id).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].title, "first");
        assert_eq!(listings[0], record("https://p.example/a", "first"));
        assert_eq!(
            storage.journaled_links(run_id).unwrap(),
            vec!["https://p.example/a", "https://p.example/b"]
        );
    }

    #[test]
    fn test_same_link_in_different_runs() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_a = storage.create_run("hash", CATALOG).unwrap();
        let run_b = storage.create_run("hash", CATALOG).unwrap();

        storage
            .insert_listing(run_a, &record("https://p.example/a", "a"))
            .unwrap();
        storage
            .insert_listing(run_b, &record("https://p.example/a", "a"))
            .unwrap();

        assert_eq!(storage.count_listings().unwrap(), 2);
        assert_eq!(storage.listings_for_run(run_b).unwrap().len(), 1);
    }

    #[test]
    fn test_journal_writes_to_its_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("hash", CATALOG).unwrap();

        {
            let mut journal = storage.journal(run_id);
            assert_eq!(journal.run_id(), run_id);
            journal.record(&record("https://p.example/a", "a")).unwrap();
            journal.record(&record("https://p.example/a", "again")).unwrap();
        }

        let listings = storage.listings_for_run(run_id).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].title, "a");
    }

    #[test]
    fn test_statistics() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let a = storage.create_run("hash", CATALOG).unwrap();
        let b = storage.create_run("hash", CATALOG).unwrap();
        storage.finish_run(a, RunStatus::Completed).unwrap();
        storage.update_run_status(b, RunStatus::Failed).unwrap();

        assert_eq!(storage.count_runs().unwrap(), 2);
        assert_eq!(storage.count_runs_by_status(RunStatus::Completed).unwrap(), 1);
        assert_eq!(storage.count_runs_by_status(RunStatus::Failed).unwrap(), 1);
        assert_eq!(storage.count_runs_by_status(RunStatus::Running).unwrap(), 0);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal").join("harvest.db");

        let run_id = {
            let mut storage = SqliteStorage::new(&path).unwrap();
            let run_id = storage.create_run("hash", CATALOG).unwrap();
            storage
                .insert_listing(run_id, &record("https://p.example/a", "a"))
                .unwrap();
            run_id
        };

        let storage = SqliteStorage::new(&path).unwrap();
        assert_eq!(storage.listings_for_run(run_id).unwrap().len(), 1);
    }
}
