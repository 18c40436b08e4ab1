// src/store.rs
//! Job record persistence.
//!
//! A sink receives one page's worth of records at a time and must make them
//! visible all together or not at all. Nothing is deduplicated: writing the
//! same page twice stores it twice.

use async_trait::async_trait;
use sqlx::{AnyConnection, Connection};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::StorageError;
use crate::record::JobRecord;

#[async_trait]
pub trait JobSink: Send {
    /// Write one page of records as a single unit. Called once per page, even
    /// when the page produced no records.
    async fn insert_page(&mut self, records: &[JobRecord]) -> Result<(), StorageError>;
}

/// Opens an independent sink per worker in parallel runs.
#[async_trait]
pub trait SinkFactory: Send + Sync {
    type Sink: JobSink + 'static;

    async fn open(&self) -> Result<Self::Sink, StorageError>;
}

const CREATE_JOBS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS jobs (
        title TEXT NOT NULL,
        company TEXT NOT NULL,
        location TEXT NOT NULL,
        salary_type VARCHAR(16) NOT NULL,
        salary_min DOUBLE NOT NULL,
        salary_max DOUBLE NOT NULL,
        hourly_equiv_min DOUBLE NOT NULL,
        hourly_equiv_max DOUBLE NOT NULL,
        monthly_equiv_min DOUBLE NOT NULL,
        monthly_equiv_max DOUBLE NOT NULL,
        calculated BOOLEAN NOT NULL DEFAULT FALSE,
        url TEXT NOT NULL,
        deadline TEXT NOT NULL,
        category TEXT NOT NULL
    )
"#;

const INSERT_JOB: &str = r#"
    INSERT INTO jobs (
        title, company, location, salary_type,
        salary_min, salary_max,
        hourly_equiv_min, hourly_equiv_max,
        monthly_equiv_min, monthly_equiv_max,
        calculated, url, deadline, category
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

/// `jobs` table over a single long-lived connection.
///
/// The URL picks the backend: `mysql://` in production, `sqlite:` for local
/// runs and tests.
pub struct SqlJobStore {
    conn: AnyConnection,
}

impl SqlJobStore {
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        sqlx::any::install_default_drivers();

        let conn = AnyConnection::connect(database_url)
            .await
            .map_err(StorageError::Connect)?;

        info!("Storage connection established ({})", conn.backend_name());
        Ok(Self { conn })
    }

    /// Create the `jobs` table if it does not exist yet.
    pub async fn ensure_schema(&mut self) -> Result<(), StorageError> {
        sqlx::query(CREATE_JOBS_TABLE)
            .execute(&mut self.conn)
            .await
            .map_err(StorageError::Schema)?;

        info!("jobs table ready");
        Ok(())
    }

    /// Number of rows currently in `jobs`.
    pub async fn count(&mut self) -> Result<i64, StorageError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM jobs")
            .fetch_one(&mut self.conn)
            .await
            .map_err(StorageError::Query)
    }

    pub async fn close(self) -> Result<(), StorageError> {
        self.conn.close().await.map_err(StorageError::Query)
    }
}

#[async_trait]
impl JobSink for SqlJobStore {
    async fn insert_page(&mut self, records: &[JobRecord]) -> Result<(), StorageError> {
        // Dropping the transaction on an early return rolls the page back.
        let mut tx = self.conn.begin().await.map_err(StorageError::Commit)?;

        for record in records {
            sqlx::query(INSERT_JOB)
                .bind(&record.title)
                .bind(&record.company)
                .bind(&record.location)
                .bind(record.salary_type.as_str())
                .bind(record.salary_min)
                .bind(record.salary_max)
                .bind(record.hourly_equiv_min)
                .bind(record.hourly_equiv_max)
                .bind(record.monthly_equiv_min)
                .bind(record.monthly_equiv_max)
                .bind(record.calculated)
                .bind(&record.url)
                .bind(&record.deadline)
                .bind(&record.category)
                .execute(&mut *tx)
                .await
                .map_err(|source| StorageError::Insert {
                    url: record.url.clone(),
                    source,
                })?;
        }

        tx.commit().await.map_err(StorageError::Commit)?;
        debug!("Committed {} job rows", records.len());
        Ok(())
    }
}

/// Opens a fresh [`SqlJobStore`] connection per worker.
pub struct SqlStoreFactory {
    database_url: String,
}

impl SqlStoreFactory {
    pub fn new(database_url: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
        }
    }
}

#[async_trait]
impl SinkFactory for SqlStoreFactory {
    type Sink = SqlJobStore;

    async fn open(&self) -> Result<SqlJobStore, StorageError> {
        SqlJobStore::connect(&self.database_url).await
    }
}

/// Dry-run sink writing records to a CSV file instead of the database.
///
/// Each page is flushed before `insert_page` returns.
pub struct CsvJobSink {
    file: File,
    path: PathBuf,
    header_written: bool,
}

impl CsvJobSink {
    pub fn create(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        info!("Exporting job records to {}", path.display());

        Ok(Self {
            file,
            path: path.to_path_buf(),
            header_written: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl JobSink for CsvJobSink {
    async fn insert_page(&mut self, records: &[JobRecord]) -> Result<(), StorageError> {
        if records.is_empty() {
            return Ok(());
        }

        // The whole page is encoded in memory so it reaches the file in one write.
        let mut writer = csv::WriterBuilder::new()
            .has_headers(!self.header_written)
            .from_writer(Vec::new());
        for record in records {
            writer.serialize(record)?;
        }
        let page = writer
            .into_inner()
            .map_err(|e| StorageError::Io(e.into_error()))?;

        self.file.write_all(&page)?;
        self.file.flush()?;
        self.header_written = true;
        debug!(
            "Appended {} records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}
