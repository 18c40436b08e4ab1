// src/error.rs
//! Typed errors for the ingestion pipeline.
//!
//! Everything that aborts a run ends up as a [`ScrapeError`]. Skipped listings
//! and unresolved salaries are not errors and never show up here.

use thiserror::Error;

/// Failure while retrieving a listing page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Failure while querying a fetched document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid selector `{pattern}`: {reason}")]
    Selector { pattern: String, reason: String },
}

/// Failure while writing job records.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to storage: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to prepare jobs table: {0}")]
    Schema(#[source] sqlx::Error),

    #[error("failed to insert job `{url}`: {source}")]
    Insert {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to commit page: {0}")]
    Commit(#[source] sqlx::Error),

    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    #[error("export failed: {0}")]
    Export(#[from] csv::Error),

    #[error("export I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("unknown category: {0}")]
    UnknownCategory(String),
}

/// Anything that stops a scrape run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("fetch failed for category `{category}` page {page}: {source}")]
    Fetch {
        category: String,
        page: u32,
        #[source]
        source: FetchError,
    },

    #[error("parse failed for category `{category}` page {page}: {source}")]
    Parse {
        category: String,
        page: u32,
        #[source]
        source: ParseError,
    },

    #[error("storage failed for category `{category}` page {page}: {source}")]
    Storage {
        category: String,
        page: u32,
        #[source]
        source: StorageError,
    },

    #[error("failed to set up page fetcher: {0}")]
    HttpClient(#[source] FetchError),

    #[error("invalid listing selectors: {0}")]
    Selectors(#[source] ParseError),

    #[error("worker for category `{category}` panicked or was cancelled")]
    Worker { category: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ScrapeError {
    /// Category label the failure happened in, if any.
    pub fn category(&self) -> Option<&str> {
        match self {
            Self::Fetch { category, .. }
            | Self::Parse { category, .. }
            | Self::Storage { category, .. }
            | Self::Worker { category } => Some(category),
            Self::HttpClient(_) | Self::Selectors(_) | Self::Config(_) => None,
        }
    }
}
