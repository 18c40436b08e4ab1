// src/record.rs
use serde::{Deserialize, Serialize};

use crate::salary::{PayPeriod, SalaryPolicy};

/// Fields read off one listing node. Missing sub-nodes are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawListing {
    pub title: String,
    pub company_name: String,
    pub location: String,
    pub salary_text: String,
    pub deadline_text: String,
    pub listing_url: String,
}

/// One row of the `jobs` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary_type: PayPeriod,
    pub salary_min: f64,
    pub salary_max: f64,
    pub hourly_equiv_min: f64,
    pub hourly_equiv_max: f64,
    pub monthly_equiv_min: f64,
    pub monthly_equiv_max: f64,
    /// Always written as `false`; nothing in the pipeline reads it.
    pub calculated: bool,
    pub url: String,
    pub deadline: String,
    pub category: String,
}

/// Turns raw listings into job records under one salary policy.
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    policy: SalaryPolicy,
}

impl RecordBuilder {
    pub fn new(policy: SalaryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SalaryPolicy {
        &self.policy
    }

    /// `None` when the listing's salary text has no usable number.
    pub fn build(&self, listing: &RawListing, category: &str) -> Option<JobRecord> {
        let salary = self.policy.normalize(&listing.salary_text)?;

        Some(JobRecord {
            title: listing.title.clone(),
            company: listing.company_name.clone(),
            location: listing.location.clone(),
            salary_type: salary.period,
            salary_min: salary.min,
            salary_max: salary.max,
            hourly_equiv_min: salary.hourly_equiv_min,
            hourly_equiv_max: salary.hourly_equiv_max,
            monthly_equiv_min: salary.monthly_equiv_min,
            monthly_equiv_max: salary.monthly_equiv_max,
            calculated: false,
            url: listing.listing_url.clone(),
            deadline: listing.deadline_text.clone(),
            category: category.to_string(),
        })
    }

    /// Build every resolvable listing, keeping input order.
    pub fn build_all(&self, listings: &[RawListing], category: &str) -> Vec<JobRecord> {
        listings
            .iter()
            .filter_map(|listing| self.build(listing, category))
            .collect()
    }
}
