//! Job listing ingestion for visidarbi.lv.
//!
//! Results pages are fetched per category, listings are extracted, salary text
//! is normalized into hourly and monthly figures, and each page's records are
//! committed to the `jobs` table in one transaction.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod markup;
pub mod orchestrator;
pub mod parser;
pub mod record;
pub mod salary;
pub mod store;

pub use catalog::{CategoryCatalog, CategoryDescriptor};
pub use config::{ScrapeConfig, StorageConfig};
pub use error::{ConfigError, FetchError, ParseError, ScrapeError, StorageError};
pub use fetcher::{HttpPageFetcher, PageFetcher, SiteConfig};
pub use markup::NodeQuery;
pub use orchestrator::{
    CategoryOutcome, CategoryStats, ParallelReport, RunState, RunSummary, ScrapeOrchestrator,
};
pub use parser::{ListingParser, ListingSelectors};
pub use record::{JobRecord, RawListing, RecordBuilder};
pub use salary::{
    classify_period, compute_equivalents, parse_salary_text, NormalizedSalary, PayPeriod,
    SalaryPolicy, SalaryQuote,
};
pub use store::{CsvJobSink, JobSink, SinkFactory, SqlJobStore, SqlStoreFactory};
