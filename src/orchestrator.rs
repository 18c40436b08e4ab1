// src/orchestrator.rs
//! Drives a scrape run: every category, every page, fetch to commit.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::catalog::{CategoryCatalog, CategoryDescriptor};
use crate::config::ScrapeConfig;
use crate::error::ScrapeError;
use crate::fetcher::{HttpPageFetcher, PageFetcher};
use crate::parser::ListingParser;
use crate::record::{JobRecord, RecordBuilder};
use crate::store::{JobSink, SinkFactory};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running { category: String, page: u32 },
    RunningParallel { workers: usize },
    Done,
    Failed,
}

/// Counts for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub pages: u32,
    pub listings: usize,
    pub records: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub categories: Vec<CategoryStats>,
}

impl RunSummary {
    pub fn pages(&self) -> u32 {
        self.categories.iter().map(|c| c.pages).sum()
    }

    pub fn listings(&self) -> usize {
        self.categories.iter().map(|c| c.listings).sum()
    }

    pub fn records(&self) -> usize {
        self.categories.iter().map(|c| c.records).sum()
    }
}

/// Result of one category in a parallel run.
#[derive(Debug)]
pub struct CategoryOutcome {
    pub category: String,
    pub result: Result<CategoryStats, ScrapeError>,
}

#[derive(Debug)]
pub struct ParallelReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per category, in catalog order.
    pub outcomes: Vec<CategoryOutcome>,
}

impl ParallelReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn records(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|s| s.records)
            .sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScrapeError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }
}

/// Fetch, parse, build and persist for a single page.
struct Pipeline<F> {
    fetcher: F,
    parser: ListingParser,
    builder: RecordBuilder,
    pages: u32,
}

impl<F: PageFetcher> Pipeline<F> {
    /// Returns the number of parsed listings and the records written.
    async fn process_page<S: JobSink + ?Sized>(
        &self,
        category: &CategoryDescriptor,
        page: u32,
        sink: &mut S,
    ) -> Result<(usize, Vec<JobRecord>), ScrapeError> {
        let markup = self
            .fetcher
            .fetch_page(category.external_id, page)
            .await
            .map_err(|source| ScrapeError::Fetch {
                category: category.name.clone(),
                page,
                source,
            })?;

        let listings = self
            .parser
            .parse_listings(&markup)
            .map_err(|source| ScrapeError::Parse {
                category: category.name.clone(),
                page,
                source,
            })?;

        let records = self.builder.build_all(&listings, &category.name);

        sink.insert_page(&records)
            .await
            .map_err(|source| ScrapeError::Storage {
                category: category.name.clone(),
                page,
                source,
            })?;

        info!(
            category = %category.name,
            page,
            listings = listings.len(),
            records = records.len(),
            "Page committed"
        );
        Ok((listings.len(), records))
    }

    /// Walk all pages of one category into its own sink.
    async fn scrape_category<S: JobSink + ?Sized>(
        &self,
        category: &CategoryDescriptor,
        sink: &mut S,
    ) -> Result<CategoryStats, ScrapeError> {
        let mut stats = CategoryStats {
            category: category.name.clone(),
            ..CategoryStats::default()
        };

        for page in 1..=self.pages {
            let (listings, records) = self.process_page(category, page, sink).await?;
            stats.pages += 1;
            stats.listings += listings;
            stats.records += records.len();
        }

        Ok(stats)
    }
}

pub struct ScrapeOrchestrator<F> {
    pipeline: Arc<Pipeline<F>>,
    catalog: CategoryCatalog,
    state: RunState,
}

impl ScrapeOrchestrator<HttpPageFetcher> {
    /// Wire up the HTTP fetcher, parser and builder described by `config`.
    pub fn from_config(config: &ScrapeConfig) -> Result<Self, ScrapeError> {
        config.validate()?;

        let catalog = CategoryCatalog::default().restrict(&config.categories)?;
        let fetcher = HttpPageFetcher::new(config.site.clone())
            .map_err(ScrapeError::HttpClient)?;
        let parser = ListingParser::new(config.selectors.clone(), &config.site.base_url)
            .map_err(ScrapeError::Selectors)?;
        let builder = RecordBuilder::new(config.salary.clone());

        Ok(Self::new(fetcher, catalog, parser, builder, config.pages))
    }
}

impl<F: PageFetcher> ScrapeOrchestrator<F> {
    pub fn new(
        fetcher: F,
        catalog: CategoryCatalog,
        parser: ListingParser,
        builder: RecordBuilder,
        pages: u32,
    ) -> Self {
        Self {
            pipeline: Arc::new(Pipeline {
                fetcher,
                parser,
                builder,
                pages,
            }),
            catalog,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    /// Scrape every category in catalog order into `sink`.
    ///
    /// Stops at the first failure; pages committed before it stay committed.
    pub async fn run<S: JobSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<RunSummary, ScrapeError> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("scrape_run", run_id = %run_id);
        self.run_sequential(run_id, sink).instrument(span).await
    }

    async fn run_sequential<S: JobSink + ?Sized>(
        &mut self,
        run_id: String,
        sink: &mut S,
    ) -> Result<RunSummary, ScrapeError> {
        let started_at = Utc::now();
        let pages = self.pipeline.pages;
        let mut categories = Vec::with_capacity(self.catalog.len());

        for category in self.catalog.iter() {
            info!("Scraping {} ({} pages)...", category.name, pages);
            let mut stats = CategoryStats {
                category: category.name.clone(),
                ..CategoryStats::default()
            };

            for page in 1..=pages {
                self.state = RunState::Running {
                    category: category.name.clone(),
                    page,
                };

                match self.pipeline.process_page(category, page, sink).await {
                    Ok((listings, records)) => {
                        stats.pages += 1;
                        stats.listings += listings;
                        stats.records += records.len();
                    }
                    Err(e) => {
                        self.state = RunState::Failed;
                        error!("Scrape run aborted: {}", e);
                        return Err(e);
                    }
                }
            }

            categories.push(stats);
        }

        self.state = RunState::Done;
        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            categories,
        };
        info!(
            "Done! {} records from {} pages across {} categories",
            summary.records(),
            summary.pages(),
            summary.categories.len()
        );
        Ok(summary)
    }
}

impl<F: PageFetcher + 'static> ScrapeOrchestrator<F> {
    /// Scrape categories concurrently, at most `workers` at a time.
    ///
    /// Each category gets its own sink from `factory`. A failing category
    /// stops only itself; the report holds every category's outcome.
    pub async fn run_parallel<P>(&mut self, factory: Arc<P>, workers: usize) -> ParallelReport
    where
        P: SinkFactory + 'static,
    {
        let workers = workers.max(1);
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("scrape_run", run_id = %run_id, workers);
        let started_at = Utc::now();
        self.state = RunState::RunningParallel { workers };

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut handles = Vec::with_capacity(self.catalog.len());

        for category in self.catalog.iter().cloned() {
            let pipeline = Arc::clone(&self.pipeline);
            let factory = Arc::clone(&factory);
            let semaphore = Arc::clone(&semaphore);
            let name = category.name.clone();

            let task = async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return Err(ScrapeError::Worker {
                        category: category.name.clone(),
                    });
                };

                info!("Scraping {} ({} pages)...", category.name, pipeline.pages);
                let mut sink = factory
                    .open()
                    .await
                    .map_err(|source| ScrapeError::Storage {
                        category: category.name.clone(),
                        page: 0,
                        source,
                    })?;
                pipeline.scrape_category(&category, &mut sink).await
            };

            handles.push((name, tokio::spawn(task.instrument(span.clone()))));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (category, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(_) => Err(ScrapeError::Worker {
                    category: category.clone(),
                }),
            };
            if let Err(e) = &result {
                error!(parent: &span, "Category {} failed: {}", category, e);
            }
            outcomes.push(CategoryOutcome { category, result });
        }

        let report = ParallelReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        self.state = if report.is_success() {
            RunState::Done
        } else {
            RunState::Failed
        };
        info!(
            parent: &span,
            "Parallel run finished: {} records, {} failed categories",
            report.records(),
            report.failures().count()
        );
        report
    }
}
