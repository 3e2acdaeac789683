// Filter Engine - criteria matching over the flow records
// Every optional criterion is a wildcard when absent

use crate::records::FlowRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_TOP_N: usize = 10;

// ============================================================================
// METRIC
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    ValueUsd,
    QuantityMt,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::ValueUsd => "value_usd",
            Metric::QuantityMt => "quantity_mt",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::ValueUsd => "USD",
            Metric::QuantityMt => "MT",
        }
    }

    /// Axis caption for bar charts
    pub fn axis_label(&self) -> &'static str {
        match self {
            Metric::ValueUsd => "Value (USD)",
            Metric::QuantityMt => "Qty (MT)",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Metric::ValueUsd => Metric::QuantityMt,
            Metric::QuantityMt => Metric::ValueUsd,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "value_usd" | "usd" | "value" => Ok(Metric::ValueUsd),
            "quantity_mt" | "mt" | "quantity" => Ok(Metric::QuantityMt),
            other => Err(format!("unknown metric '{}' (expected value_usd or quantity_mt)", other)),
        }
    }
}

// ============================================================================
// CRITERIA
// ============================================================================

/// User-selected criteria. `None` (or an empty string) matches everything.
///
/// The `secondary_*` fields are only read by compare mode, which substitutes
/// them for their primary counterpart on side B.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub primary_partner: Option<String>,
    pub secondary_partner: Option<String>,
    pub year: Option<i32>,
    pub secondary_year: Option<i32>,
    pub temperature: Option<String>,
    pub secondary_temperature: Option<String>,
    pub top_n: usize,
    pub product_class: Option<String>,
    pub metric: Metric,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        FilterCriteria {
            primary_partner: None,
            secondary_partner: None,
            year: None,
            secondary_year: None,
            temperature: None,
            secondary_temperature: None,
            top_n: DEFAULT_TOP_N,
            product_class: None,
            metric: Metric::ValueUsd,
        }
    }
}

/// A single edit coming from the UI layer (`setCriteria(partial)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CriteriaUpdate {
    PrimaryPartner(Option<String>),
    SecondaryPartner(Option<String>),
    Year(Option<i32>),
    SecondaryYear(Option<i32>),
    Temperature(Option<String>),
    SecondaryTemperature(Option<String>),
    ProductClass(Option<String>),
    /// Raw requested count; zero or negative falls back to the default
    TopN(i64),
    Metric(Metric),
}

impl FilterCriteria {
    pub fn apply_update(&mut self, update: CriteriaUpdate) {
        match update {
            CriteriaUpdate::PrimaryPartner(v) => self.primary_partner = non_empty(v),
            CriteriaUpdate::SecondaryPartner(v) => self.secondary_partner = non_empty(v),
            CriteriaUpdate::Year(v) => self.year = v,
            CriteriaUpdate::SecondaryYear(v) => self.secondary_year = v,
            CriteriaUpdate::Temperature(v) => self.temperature = non_empty(v),
            CriteriaUpdate::SecondaryTemperature(v) => self.secondary_temperature = non_empty(v),
            CriteriaUpdate::ProductClass(v) => self.product_class = non_empty(v),
            CriteriaUpdate::TopN(n) => self.top_n = coerce_top_n(n),
            CriteriaUpdate::Metric(m) => self.metric = m,
        }
    }

    pub fn apply_updates<I>(&mut self, updates: I)
    where
        I: IntoIterator<Item = CriteriaUpdate>,
    {
        for update in updates {
            self.apply_update(update);
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Coerce a requested top-N to a positive count.
pub fn coerce_top_n(n: i64) -> usize {
    if n <= 0 {
        DEFAULT_TOP_N
    } else {
        usize::try_from(n).unwrap_or(DEFAULT_TOP_N)
    }
}

// ============================================================================
// FILTER ENGINE
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Keep every year in scope (time-series views bin by year instead)
    pub ignore_year: bool,
}

impl ApplyOptions {
    pub fn all_years() -> Self {
        ApplyOptions { ignore_year: true }
    }
}

pub struct FilterEngine;

impl FilterEngine {
    /// Records matching every non-wildcard criterion, in input order.
    pub fn apply<'a>(
        records: &'a [FlowRecord],
        criteria: &FilterCriteria,
        options: ApplyOptions,
    ) -> Vec<&'a FlowRecord> {
        records
            .iter()
            .filter(|r| Self::matches(r, criteria, options))
            .collect()
    }

    pub fn matches(record: &FlowRecord, criteria: &FilterCriteria, options: ApplyOptions) -> bool {
        matches_text(Some(record.partner.as_str()), criteria.primary_partner.as_deref())
            && (options.ignore_year || criteria.year.map_or(true, |y| record.year == Some(y)))
            && matches_text(record.product_class.as_deref(), criteria.product_class.as_deref())
            && matches_text(record.temperature.as_deref(), criteria.temperature.as_deref())
    }
}

fn matches_text(value: Option<&str>, wanted: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(w) if w.is_empty() => true,
        Some(w) => value == Some(w),
    }
}

// ============================================================================
// TESTS
// ============================================================================
