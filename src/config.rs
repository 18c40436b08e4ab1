// src/config.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;
use url::Url;

use crate::error::ConfigError;
use crate::fetcher::SiteConfig;
use crate::parser::ListingSelectors;
use crate::salary::SalaryPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Host, optionally with `:port`.
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Full connection URL; takes precedence over the fields above.
    pub url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            user: "root".to_string(),
            password: String::new(),
            database: "Vakances".to_string(),
            url: None,
        }
    }
}

impl StorageConfig {
    /// Connection URL for the store, escaping credentials as needed.
    pub fn database_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Ok(url.to_string());
        }

        let invalid = |reason: &str| ConfigError::Invalid {
            field: "storage",
            reason: reason.to_string(),
        };

        let mut url = Url::parse(&format!("mysql://{}", self.host))
            .map_err(|e| invalid(&format!("bad host `{}`: {}", self.host, e)))?;
        url.set_username(&self.user)
            .map_err(|_| invalid("cannot set user"))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| invalid("cannot set password"))?;
        }
        url.set_path(&self.database);

        Ok(url.to_string())
    }
}

/// Everything a scrape run needs, passed once to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub storage: StorageConfig,
    /// Pages fetched per category, starting at 1.
    pub pages: u32,
    /// Categories processed concurrently. 1 keeps the strict sequential run.
    pub workers: usize,
    /// Category labels to scrape; empty means the whole catalog.
    pub categories: Vec<String>,
    pub site: SiteConfig,
    pub salary: SalaryPolicy,
    pub selectors: ListingSelectors,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            pages: 2,
            workers: 1,
            categories: Vec::new(),
            site: SiteConfig::default(),
            salary: SalaryPolicy::default(),
            selectors: ListingSelectors::default(),
        }
    }
}

impl ScrapeConfig {
    /// Load from `path` for the current environment, then apply env overrides.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let environment = Self::get_environment();
        info!("Loading configuration for environment: {}", environment);

        let mut config = if path.exists() {
            Self::load_from_file(path, &environment)?
        } else {
            info!("{} not found, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn get_environment() -> String {
        std::env::var("SCRAPER_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "local".to_string())
    }

    /// Read the section for `environment` from a YAML file keyed by environment name.
    pub fn load_from_file(path: &Path, environment: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content, environment).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_yaml(content: &str, environment: &str) -> Result<Self, ConfigError> {
        let mut sections: BTreeMap<String, ScrapeConfig> =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: "<inline>".to_string(),
                source,
            })?;

        sections
            .remove(environment)
            .ok_or_else(|| ConfigError::Invalid {
                field: "environment",
                reason: format!("no `{}` section in configuration", environment),
            })
    }

    /// Apply `DB_*`, `DATABASE_URL` and `SCRAPE_*` overrides from `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("DB_HOST") {
            self.storage.host = host;
        }
        if let Some(user) = lookup("DB_USER") {
            self.storage.user = user;
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            self.storage.password = password;
        }
        if let Some(database) = lookup("DB_NAME") {
            self.storage.database = database;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.storage.url = Some(url);
        }
        if let Some(pages) = lookup("SCRAPE_PAGES") {
            self.pages = pages.trim().parse().map_err(|_| ConfigError::Invalid {
                field: "SCRAPE_PAGES",
                reason: format!("`{}` is not a page count", pages),
            })?;
        }
        if let Some(workers) = lookup("SCRAPE_WORKERS") {
            self.workers = workers.trim().parse().map_err(|_| ConfigError::Invalid {
                field: "SCRAPE_WORKERS",
                reason: format!("`{}` is not a worker count", workers),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pages == 0 {
            return Err(ConfigError::Invalid {
                field: "pages",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid {
                field: "workers",
                reason: "must be at least 1".to_string(),
            });
        }
        let hours = self.salary.hours_per_month;
        if !hours.is_finite() || hours <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "salary.hours_per_month",
                reason: format!("{} is not a positive number", hours),
            });
        }
        if self.site.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "site.user_agent",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
