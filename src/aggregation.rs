// Aggregation Engine - ranked sums per reporter
//
// Ranking rules:
//   - group by reporter, sum the selected metric
//   - drop reporters whose sum is not positive
//   - sort descending; equal sums keep first-appearance order

use crate::filter::{Metric, DEFAULT_TOP_N};
use crate::records::FlowRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

// ============================================================================
// RESULT TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub code: String,
    pub value: f64,
}

impl RankedEntry {
    pub fn new(code: &str, value: f64) -> Self {
        RankedEntry {
            code: code.to_string(),
            value,
        }
    }
}

/// Standing of the distinguished entity in the full (untruncated) ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsaSummary {
    /// 1-based rank, `None` when the entity has no positive sum
    pub rank: Option<usize>,
    pub value: f64,
    pub total_ranked: usize,
}

impl UsaSummary {
    pub fn rank_text(&self) -> String {
        match self.rank {
            Some(rank) => format!("Rank #{} of {}", rank, self.total_ranked),
            None => "No data".to_string(),
        }
    }
}

// ============================================================================
// AGGREGATION ENGINE
// ============================================================================

pub struct AggregationEngine;

impl AggregationEngine {
    /// Every reporter with a positive sum, highest first.
    pub fn ranked_reporters<'a, I>(records: I, metric: Metric) -> Vec<RankedEntry>
    where
        I: IntoIterator<Item = &'a FlowRecord>,
    {
        rank_positive(sums_by_reporter(records, metric))
    }

    /// First `n` of the full ranking; `n == 0` means the default count.
    pub fn top_n<'a, I>(records: I, metric: Metric, n: usize) -> Vec<RankedEntry>
    where
        I: IntoIterator<Item = &'a FlowRecord>,
    {
        let n = if n == 0 { DEFAULT_TOP_N } else { n };
        let mut ranked = Self::ranked_reporters(records, metric);
        ranked.truncate(n);
        ranked
    }

    pub fn distinguished_entity_summary<'a, I>(records: I, metric: Metric, entity_code: &str) -> UsaSummary
    where
        I: IntoIterator<Item = &'a FlowRecord>,
    {
        let sums = sums_by_reporter(records, metric);
        let value = sums
            .iter()
            .find(|entry| entry.code == entity_code)
            .map(|entry| entry.value)
            .unwrap_or(0.0);

        let ranked = rank_positive(sums);
        let rank = ranked
            .iter()
            .position(|entry| entry.code == entity_code)
            .map(|index| index + 1);

        UsaSummary {
            rank,
            value,
            total_ranked: ranked.len(),
        }
    }

    /// Distinct valid years in ascending order.
    pub fn years_observed<'a, I>(records: I) -> Vec<i32>
    where
        I: IntoIterator<Item = &'a FlowRecord>,
    {
        records
            .into_iter()
            .filter_map(|r| r.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Metric total per year, aligned with `years`. Years absent from the
    /// records stay at 0; records without a year are skipped.
    pub fn totals_by_year<'a, I>(records: I, metric: Metric, years: &[i32]) -> Vec<f64>
    where
        I: IntoIterator<Item = &'a FlowRecord>,
    {
        let slots: HashMap<i32, usize> = years.iter().enumerate().map(|(i, y)| (*y, i)).collect();
        let mut totals = vec![0.0; years.len()];

        for record in records {
            if let Some(slot) = record.year.and_then(|y| slots.get(&y)) {
                totals[*slot] += record.metric_value(metric);
            }
        }

        totals
    }

    /// Per-year series for the top `n` reporters by overall total.
    pub fn reporter_breakdown(
        records: &[&FlowRecord],
        metric: Metric,
        n: usize,
        years: &[i32],
    ) -> Vec<(String, Vec<f64>)> {
        Self::top_n(records.iter().copied(), metric, n)
            .into_iter()
            .map(|entry| {
                let values = Self::totals_by_year(
                    records.iter().copied().filter(|r| r.reporter == entry.code),
                    metric,
                    years,
                );
                (entry.code, values)
            })
            .collect()
    }
}

/// Sum per reporter in first-appearance order. Rows without a reporter are skipped.
fn sums_by_reporter<'a, I>(records: I, metric: Metric) -> Vec<RankedEntry>
where
    I: IntoIterator<Item = &'a FlowRecord>,
{
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut sums: Vec<RankedEntry> = Vec::new();

    for record in records {
        let Some(code) = record.reporter_code() else {
            continue;
        };
        let value = record.metric_value(metric);

        match index.get(code) {
            Some(&i) => sums[i].value += value,
            None => {
                index.insert(code, sums.len());
                sums.push(RankedEntry::new(code, value));
            }
        }
    }

    sums
}

/// Drop non-positive sums and sort descending. `sort_by` is stable, so ties
/// stay in first-appearance order.
fn rank_positive(sums: Vec<RankedEntry>) -> Vec<RankedEntry> {
    let mut ranked: Vec<RankedEntry> = sums.into_iter().filter(|entry| entry.value > 0.0).collect();
    ranked.sort_by(|a, b| b.value.total_cmp(&a.value));
    ranked
}

// ============================================================================
// TESTS
// ============================================================================
