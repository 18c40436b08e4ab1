// src/salary.rs
//! Salary text parsing and hourly/monthly normalization.
//!
//! Listings quote pay as free text ("1500 - 2000 €", "8,50 EUR/st."). These
//! functions turn that text into a numeric range, decide whether the range is
//! hourly or monthly, and derive the figure for the other period.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

pub const DEFAULT_HOURS_PER_MONTH: f64 = 160.0;
pub const DEFAULT_CURRENCY: &str = "EUR";

/// A `max` at or above this is monthly pay when no keyword says otherwise.
const MONTHLY_FLOOR: f64 = 500.0;
/// A `max` at or below this is hourly pay when no keyword says otherwise.
const HOURLY_CEILING: f64 = 30.0;

static NUMBER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid regex"));
static DECIMAL_DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d$").expect("valid regex"));

/// Numbers pulled out of a salary string. Both absent means unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SalaryQuote {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl SalaryQuote {
    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn is_resolved(&self) -> bool {
        self.range().is_some()
    }

    pub fn range(&self) -> Option<(f64, f64)> {
        Some((self.min?, self.max?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayPeriod {
    Hourly,
    Monthly,
}

impl PayPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayPeriod::Hourly => "hourly",
            PayPeriod::Monthly => "monthly",
        }
    }
}

impl fmt::Display for PayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedSalary {
    pub min: f64,
    pub max: f64,
    pub period: PayPeriod,
    pub hourly_equiv_min: f64,
    pub hourly_equiv_max: f64,
    pub monthly_equiv_min: f64,
    pub monthly_equiv_max: f64,
}

/// Tunables for salary normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalaryPolicy {
    pub hours_per_month: f64,
    /// Label for the currency quoted on the site. Figures are never converted.
    pub currency: String,
    /// Case-insensitive markers that make a quote hourly regardless of size.
    pub hourly_keywords: Vec<String>,
}

impl Default for SalaryPolicy {
    fn default() -> Self {
        Self {
            hours_per_month: DEFAULT_HOURS_PER_MONTH,
            currency: DEFAULT_CURRENCY.to_string(),
            hourly_keywords: ["hour", "/h", "per hour", "st.", "stundā"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

impl SalaryPolicy {
    pub fn classify(&self, min: f64, max: f64, raw_text: &str) -> PayPeriod {
        classify_period(min, max, raw_text, &self.hourly_keywords)
    }

    pub fn equivalents(&self, period: PayPeriod, min: f64, max: f64) -> NormalizedSalary {
        compute_equivalents(period, min, max, self.hours_per_month)
    }

    /// Parse, classify and convert in one step. `None` when the text has no number.
    pub fn normalize(&self, raw_text: &str) -> Option<NormalizedSalary> {
        let (min, max) = parse_salary_text(raw_text).range()?;
        let period = self.classify(min, max, raw_text);
        Some(self.equivalents(period, min, max))
    }
}

fn is_decimal_digit(code_point: u32) -> bool {
    char::from_u32(code_point).is_some_and(|c| {
        let mut buf = [0u8; 4];
        DECIMAL_DIGIT.is_match(c.encode_utf8(&mut buf))
    })
}

/// Value of a Unicode decimal digit.
///
/// Decimal digits come in contiguous 0..=9 blocks, so the distance to the
/// start of the surrounding run gives the value.
fn decimal_value(c: char) -> Option<u32> {
    let code_point = c as u32;
    if !is_decimal_digit(code_point) {
        return None;
    }
    let offset = (1u32..)
        .take_while(|step| *step <= code_point && is_decimal_digit(code_point - step))
        .count() as u32;
    Some(offset % 10)
}

/// Rewrite non-ASCII decimal digits (e.g. Arabic-Indic) as ASCII ones.
fn ascii_digits(token: &str) -> String {
    token
        .chars()
        .map(|c| match decimal_value(c) {
            Some(digit) if !c.is_ascii() => char::from_digit(digit, 10).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Extract the first two numbers of a salary string.
///
/// Commas count as decimal separators. A single number is both ends of the
/// range; anything past the second number is ignored. The order is kept as
/// written, so `min > max` is possible.
pub fn parse_salary_text(text: &str) -> SalaryQuote {
    let normalized = text.replace(',', ".");
    let mut numbers = NUMBER_TOKEN
        .find_iter(&normalized)
        .filter_map(|m| ascii_digits(m.as_str()).parse::<f64>().ok());

    match (numbers.next(), numbers.next()) {
        (Some(min), Some(max)) => SalaryQuote {
            min: Some(min),
            max: Some(max),
        },
        (Some(only), None) => SalaryQuote {
            min: Some(only),
            max: Some(only),
        },
        _ => SalaryQuote::unresolved(),
    }
}

/// Decide whether a quote is hourly or monthly.
///
/// Keywords win. Without one, `max >= 500` is monthly, `max <= 30` is hourly
/// and the band in between falls back to monthly. `min` does not take part.
pub fn classify_period<S: AsRef<str>>(
    _min: f64,
    max: f64,
    raw_text: &str,
    hourly_keywords: &[S],
) -> PayPeriod {
    let raw = raw_text.to_lowercase();
    if hourly_keywords
        .iter()
        .any(|k| raw.contains(&k.as_ref().to_lowercase()))
    {
        return PayPeriod::Hourly;
    }

    if max >= MONTHLY_FLOOR {
        PayPeriod::Monthly
    } else if max <= HOURLY_CEILING {
        PayPeriod::Hourly
    } else {
        PayPeriod::Monthly
    }
}

/// Derive the other period's figures. The quoted side is kept unrounded.
pub fn compute_equivalents(
    period: PayPeriod,
    min: f64,
    max: f64,
    hours_per_month: f64,
) -> NormalizedSalary {
    let ((hourly_min, hourly_max), (monthly_min, monthly_max)) = match period {
        PayPeriod::Hourly => (
            (min, max),
            (round2(min * hours_per_month), round2(max * hours_per_month)),
        ),
        PayPeriod::Monthly => (
            (round2(min / hours_per_month), round2(max / hours_per_month)),
            (min, max),
        ),
    };

    NormalizedSalary {
        min,
        max,
        period,
        hourly_equiv_min: hourly_min,
        hourly_equiv_max: hourly_max,
        monthly_equiv_min: monthly_min,
        monthly_equiv_max: monthly_max,
    }
}

/// Round to cents, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
