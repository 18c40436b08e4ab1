// src/cli.rs
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::CategoryCatalog;
use crate::config::{ScrapeConfig, DEFAULT_CONFIG_FILE};
use crate::orchestrator::ScrapeOrchestrator;
use crate::store::{CsvJobSink, SqlJobStore, SqlStoreFactory};

#[derive(Parser)]
#[command(name = "darbi-scraper")]
#[command(about = "Scrape visidarbi.lv job listings into the jobs table")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// YAML configuration file, keyed by environment
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Also write JSON logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scrape every configured category and store the listings
    Run(RunArgs),
    /// List job categories and their site ids
    Categories,
    /// Create the jobs table if it does not exist
    InitDb {
        #[arg(long)]
        database_url: Option<String>,
    },
    /// Normalize one salary string and print the result
    Salary {
        text: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Pages to scrape per category
    #[arg(long)]
    pub pages: Option<u32>,

    /// Only scrape this category (repeatable)
    #[arg(long = "category")]
    pub categories: Vec<String>,

    /// Scrape this many categories at once, each on its own connection
    #[arg(long)]
    pub workers: Option<usize>,

    /// Write records to a CSV file instead of the database
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Connection URL overriding the configured storage settings
    #[arg(long)]
    pub database_url: Option<String>,
}

impl RunArgs {
    pub fn apply(&self, config: &mut ScrapeConfig) {
        if let Some(pages) = self.pages {
            config.pages = pages;
        }
        if !self.categories.is_empty() {
            config.categories = self.categories.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(url) = &self.database_url {
            config.storage.url = Some(url.clone());
        }
    }
}

pub async fn handle_command(cli: Cli) -> Result<()> {
    let mut config = ScrapeConfig::load(&cli.config)
        .context("Failed to load configuration")?;

    match cli.command {
        Command::Run(args) => {
            args.apply(&mut config);
            config.validate().context("Invalid run configuration")?;
            run_scrape(&config, args.csv).await
        }

        Command::Categories => {
            let catalog = CategoryCatalog::default();
            println!("{:<5} {}", "ID", "Category");
            println!("{}", "-".repeat(60));
            for category in &catalog {
                println!("{:<5} {}", category.external_id, category.name);
            }
            Ok(())
        }

        Command::InitDb { database_url } => {
            if let Some(url) = database_url {
                config.storage.url = Some(url);
            }
            let url = config.storage.database_url()?;
            let mut store = SqlJobStore::connect(&url).await?;
            store.ensure_schema().await?;
            let rows = store.count().await?;
            store.close().await?;
            println!("✅ jobs table ready ({} rows)", rows);
            Ok(())
        }

        Command::Salary { text, json } => {
            match config.salary.normalize(&text) {
                Some(salary) if json => {
                    println!("{}", serde_json::to_string_pretty(&salary)?);
                }
                Some(salary) => {
                    let currency = &config.salary.currency;
                    println!("period:  {}", salary.period);
                    println!("quoted:  {} - {} {}", salary.min, salary.max, currency);
                    println!(
                        "hourly:  {} - {} {}",
                        salary.hourly_equiv_min, salary.hourly_equiv_max, currency
                    );
                    println!(
                        "monthly: {} - {} {}",
                        salary.monthly_equiv_min, salary.monthly_equiv_max, currency
                    );
                }
                None if json => println!("null"),
                None => println!("unresolved: no number in `{}`", text),
            }
            Ok(())
        }
    }
}

async fn run_scrape(config: &ScrapeConfig, csv: Option<PathBuf>) -> Result<()> {
    let mut orchestrator =
        ScrapeOrchestrator::from_config(config).context("Failed to set up scraper")?;

    if let Some(path) = csv {
        if config.workers > 1 {
            anyhow::bail!("--csv export runs sequentially; drop --workers");
        }
        let mut sink = CsvJobSink::create(&path)?;
        let summary = orchestrator.run(&mut sink).await?;
        println!(
            "✅ Done! Exported {} records to {}",
            summary.records(),
            sink.path().display()
        );
        return Ok(());
    }

    let url = config.storage.database_url()?;
    let mut store = SqlJobStore::connect(&url)
        .await
        .context("Failed to connect to job storage")?;
    store.ensure_schema().await?;

    if config.workers > 1 {
        store.close().await?;
        let report = orchestrator
            .run_parallel(Arc::new(SqlStoreFactory::new(&url)), config.workers)
            .await;

        for outcome in &report.outcomes {
            match &outcome.result {
                Ok(stats) => info!(
                    "{}: {} records from {} pages",
                    outcome.category, stats.records, stats.pages
                ),
                Err(e) => warn!("{}: {}", outcome.category, e),
            }
        }

        let failed = report.failures().count();
        if failed > 0 {
            anyhow::bail!(
                "{} of {} categories failed ({} records stored)",
                failed,
                report.outcomes.len(),
                report.records()
            );
        }
        println!(
            "✅ Done! Scraped {} page(s) from all categories, {} records saved",
            config.pages,
            report.records()
        );
        return Ok(());
    }

    let summary = orchestrator.run(&mut store).await?;
    let total = store.count().await?;
    store.close().await?;

    println!(
        "✅ Done! Scraped {} page(s) from all categories, {} records saved ({} rows in jobs)",
        config.pages,
        summary.records(),
        total
    );
    Ok(())
}
