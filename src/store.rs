//! Screenshot record persistence backed by SQLite.
//!
//! Every operation checks a connection out of the pool for its own duration;
//! no session is shared between requests or jobs. Writes go through a single
//! transaction per batch so a job's records appear all at once or not at all.

use crate::{CrawlError, ScreenshotRecord};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, warn};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS screenshots (
    id TEXT PRIMARY KEY,
    path TEXT NOT NULL,
    job_id TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_screenshots_job_id ON screenshots(job_id);
"#;

/// Stores and retrieves screenshot records by job.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist `records` atomically. On error nothing is written.
    async fn save_all(&self, records: &[ScreenshotRecord]) -> Result<(), CrawlError>;

    /// All records for `job_id` in store order; empty when none exist.
    async fn find_by_job(&self, job_id: &str) -> Result<Vec<ScreenshotRecord>, CrawlError>;
}

#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Open (creating if missing) the database at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, CrawlError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| CrawlError::Configuration(format!("Invalid database URL: {e}")))?
            .create_if_missing(true)
            // Crawl processes and the server write the same file
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;

        debug!("Record store ready at {}", database_url);
        Ok(Self { pool })
    }

    async fn insert_batch(
        tx: &mut Transaction<'_, Sqlite>,
        records: &[ScreenshotRecord],
    ) -> Result<(), sqlx::Error> {
        for record in records {
            sqlx::query("INSERT INTO screenshots (id, path, job_id) VALUES (?, ?, ?)")
                .bind(&record.id)
                .bind(&record.path)
                .bind(&record.job_id)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn save_all(&self, records: &[ScreenshotRecord]) -> Result<(), CrawlError> {
        let mut tx = self.pool.begin().await?;

        match Self::insert_batch(&mut tx, records).await {
            Ok(()) => {
                tx.commit().await?;
                debug!("Committed {} screenshot records", records.len());
                Ok(())
            }
            Err(e) => {
                error!("Error saving screenshots: {}", e);
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback failed: {}", rollback);
                }
                Err(e.into())
            }
        }
    }

    async fn find_by_job(&self, job_id: &str) -> Result<Vec<ScreenshotRecord>, CrawlError> {
        let rows: Vec<(String, String, String)> =
            sqlx::query_as("SELECT id, path, job_id FROM screenshots WHERE job_id = ?")
                .bind(job_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, path, job_id)| ScreenshotRecord { id, path, job_id })
            .collect())
    }
}
