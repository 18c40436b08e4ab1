// src/fetcher.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::FetchError;

pub const DEFAULT_BASE_URL: &str = "https://www.visidarbi.lv";
pub const DEFAULT_SALARY_FILTER: &str = "id%3A2%2Cid%3A3%2Cid%3A4%2Cid%3A5";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// Where and how results pages are requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    /// Already URL-encoded value for the `salaryFilters` query parameter.
    pub salary_filter: String,
    pub user_agent: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            salary_filter: DEFAULT_SALARY_FILTER.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SiteConfig {
    /// Results page URL for a category, newest listings first.
    pub fn page_url(&self, category_id: u32, page: u32) -> String {
        format!(
            "{}/darba-sludinajumi?sort=date_from&categories={}&salaryFilters={}&page={}#results",
            self.base_url.trim_end_matches('/'),
            category_id,
            self.salary_filter,
            page
        )
    }
}

/// Source of results-page markup.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, category_id: u32, page: u32) -> Result<String, FetchError>;
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for Arc<T> {
    async fn fetch_page(&self, category_id: u32, page: u32) -> Result<String, FetchError> {
        (**self).fetch_page(category_id, page).await
    }
}

/// Fetches results pages over HTTP.
///
/// There is no request timeout and no retry; a failed request is final.
pub struct HttpPageFetcher {
    client: Client,
    site: SiteConfig,
}

impl HttpPageFetcher {
    pub fn new(site: SiteConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(site.user_agent.clone())
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client, site })
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, category_id: u32, page: u32) -> Result<String, FetchError> {
        let url = self.site.page_url(category_id, page);
        debug!("Fetching results page: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|source| FetchError::Transport { url, source })
    }
}
