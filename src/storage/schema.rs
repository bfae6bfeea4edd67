//! Database schema definitions
//!
//! This module contains the SQL schema of the run journal.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    catalog_url TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One extracted record per run and link; the first write wins
CREATE TABLE IF NOT EXISTS listings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    link TEXT NOT NULL,
    title TEXT NOT NULL,
    company_name TEXT NOT NULL,
    city TEXT NOT NULL,
    posting_date TEXT NOT NULL,
    expiration_date TEXT NOT NULL,
    description TEXT NOT NULL,
    category TEXT NOT NULL,
    scraped_at TEXT NOT NULL,
    UNIQUE(run_id, link)
);

CREATE INDEX IF NOT EXISTS idx_listings_run ON listings(run_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
