// src/parser.rs
use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::markup::{compile_selector, NodeQuery};
use crate::record::RawListing;

/// CSS patterns locating a listing and its fields on a results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSelectors {
    pub container: String,
    pub title: String,
    pub location: String,
    pub company: String,
    pub salary: String,
    pub deadline: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            container: "div.item.premium.big-item".to_string(),
            title: "a.long-title".to_string(),
            location: "li.location span".to_string(),
            company: "li.company span".to_string(),
            salary: "li.salary span".to_string(),
            deadline: "li.duedate span".to_string(),
        }
    }
}

impl ListingSelectors {
    fn all(&self) -> [&str; 6] {
        [
            self.container.as_str(),
            self.title.as_str(),
            self.location.as_str(),
            self.company.as_str(),
            self.salary.as_str(),
            self.deadline.as_str(),
        ]
    }
}

pub struct ListingParser {
    selectors: ListingSelectors,
    base_url: String,
}

impl ListingParser {
    /// Fails if any selector does not compile.
    pub fn new(selectors: ListingSelectors, base_url: &str) -> Result<Self, ParseError> {
        for pattern in selectors.all() {
            compile_selector(pattern)?;
        }

        Ok(Self {
            selectors,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn selectors(&self) -> &ListingSelectors {
        &self.selectors
    }

    /// Parse a results page into listings, in document order.
    pub fn parse_listings(&self, markup: &str) -> Result<Vec<RawListing>, ParseError> {
        let document = Html::parse_document(markup);
        self.extract(document.root_element())
    }

    /// Extract listings from any node tree exposing [`NodeQuery`].
    pub fn extract<N: NodeQuery>(&self, root: N) -> Result<Vec<RawListing>, ParseError> {
        let mut listings = Vec::new();
        for container in root.select_all(&self.selectors.container)? {
            if let Some(listing) = self.extract_one(&container)? {
                listings.push(listing);
            }
        }
        Ok(listings)
    }

    fn extract_one<N: NodeQuery>(&self, container: &N) -> Result<Option<RawListing>, ParseError> {
        let Some(anchor) = container.select_first(&self.selectors.title)? else {
            return Ok(None);
        };
        let Some(href) = anchor.attribute("href").filter(|h| !h.trim().is_empty()) else {
            return Ok(None);
        };
        let title = anchor.text_content();
        if title.is_empty() {
            return Ok(None);
        }

        Ok(Some(RawListing {
            title,
            company_name: self.field_text(container, &self.selectors.company)?,
            location: self.field_text(container, &self.selectors.location)?,
            salary_text: self.field_text(container, &self.selectors.salary)?,
            deadline_text: self.field_text(container, &self.selectors.deadline)?,
            listing_url: self.absolute_url(href.trim()),
        }))
    }

    fn field_text<N: NodeQuery>(&self, container: &N, pattern: &str) -> Result<String, ParseError> {
        Ok(container
            .select_first(pattern)?
            .map(|node| node.text_content())
            .unwrap_or_default())
    }

    fn absolute_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            format!("{}/{}", self.base_url, href)
        }
    }
}
