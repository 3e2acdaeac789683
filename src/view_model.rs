// View-Model Builder - one consistent snapshot per recomputation
//
// Composes filter + aggregation + compare state into the exact series and
// labels a renderer consumes. Pure: same store + state, same snapshot.

use crate::aggregation::{AggregationEngine, RankedEntry, UsaSummary};
use crate::compare::{labels_for, CompareAxis, CompareState, Side};
use crate::error::{DashboardError, Result};
use crate::filter::{ApplyOptions, FilterCriteria, FilterEngine, Metric};
use crate::records::{DataStore, EntityLookup, FilterOptions};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

pub const DEFAULT_DISTINGUISHED_ENTITY: &str = "USA";

// ============================================================================
// DASHBOARD STATE
// ============================================================================

/// Line chart series selection for single mode.
///
/// Total and breakdown are exclusive unless built with [`LineToggles::both`];
/// at least one of them is always on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineToggles {
    show_total: bool,
    show_breakdown: bool,
}

impl Default for LineToggles {
    fn default() -> Self {
        LineToggles {
            show_total: true,
            show_breakdown: false,
        }
    }
}

impl LineToggles {
    /// Explicit opt-in to drawing the total and the breakdown together
    pub fn both() -> Self {
        LineToggles {
            show_total: true,
            show_breakdown: true,
        }
    }

    pub fn show_total(&self) -> bool {
        self.show_total
    }

    pub fn show_breakdown(&self) -> bool {
        self.show_breakdown
    }

    pub fn set_total(&mut self, on: bool) {
        self.show_total = on;
        if on {
            self.show_breakdown = false;
        }
        self.ensure_one();
    }

    pub fn set_breakdown(&mut self, on: bool) {
        self.show_breakdown = on;
        if on {
            self.show_total = false;
        }
        self.ensure_one();
    }

    fn ensure_one(&mut self) {
        if !self.show_total && !self.show_breakdown {
            self.show_total = true;
        }
    }
}

/// Everything the UI layer owns; passed explicitly into every rebuild.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardState {
    pub criteria: FilterCriteria,
    pub compare: CompareState,
    pub line_toggles: LineToggles,
}

impl DashboardState {
    /// Start-up selection: first partner on side A, second partner (or the
    /// first again) on side B, every other filter open.
    pub fn initial(options: &FilterOptions, top_n: usize, metric: Metric) -> Self {
        let first = options.partners.first().map(|p| p.code.clone());
        let second = options.partners.get(1).map(|p| p.code.clone()).or_else(|| first.clone());

        DashboardState {
            criteria: FilterCriteria {
                primary_partner: first,
                secondary_partner: second,
                top_n: crate::filter::coerce_top_n(top_n as i64),
                metric,
                ..FilterCriteria::default()
            },
            compare: CompareState::new(),
            line_toggles: LineToggles::default(),
        }
    }

    pub fn reset(&mut self, options: &FilterOptions, top_n: usize, metric: Metric) {
        *self = Self::initial(options, top_n, metric);
    }
}

// ============================================================================
// VIEW-MODEL TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarEntry {
    pub code: String,
    /// Display name, or the raw code for unknown entities
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub name: String,
    /// One value per entry of [`LineChart::years`]
    pub values: Vec<f64>,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChart {
    pub title: String,
    pub years: Vec<i32>,
    pub series: Vec<LineSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub code: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSource {
    pub point: MapPoint,
    pub value: f64,
    /// Also ranked on the other visible compare side
    pub shared: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSeries {
    pub destination: Option<MapPoint>,
    pub sources: Vec<MapSource>,
    /// Ranked codes with no coordinates
    pub unresolved: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsaCard {
    pub title: String,
    pub summary: UsaSummary,
    pub value_text: String,
    pub rank_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapLayout {
    /// One destination per side (country axis)
    Separate,
    /// Both sides flow into the same destination
    Overlay,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleView {
    pub bar_title: String,
    pub map_title: String,
    pub bar_series: Vec<BarEntry>,
    pub line: LineChart,
    pub usa: UsaCard,
    pub map: MapSeries,
    pub map_max_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompareSide {
    pub label: String,
    /// Computed but not to be drawn
    pub hidden: bool,
    pub bar_title: String,
    pub bar_series: Vec<BarEntry>,
    pub usa: UsaCard,
    pub map: MapSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompareView {
    pub axis: CompareAxis,
    pub map_title: String,
    pub map_layout: MapLayout,
    pub map_max_value: f64,
    pub side_a: CompareSide,
    pub side_b: CompareSide,
    pub line: LineChart,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ViewContent {
    Single(SingleView),
    Compare(CompareView),
}

/// Renderer-agnostic snapshot of one recomputation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub metric: Metric,
    pub unit: String,
    pub axis_label: String,
    pub top_n: usize,
    pub content: ViewContent,
}

impl ViewModel {
    pub fn as_single(&self) -> Option<&SingleView> {
        match &self.content {
            ViewContent::Single(view) => Some(view),
            ViewContent::Compare(_) => None,
        }
    }

    pub fn as_compare(&self) -> Option<&CompareView> {
        match &self.content {
            ViewContent::Compare(view) => Some(view),
            ViewContent::Single(_) => None,
        }
    }
}

// ============================================================================
// BUILDER
// ============================================================================

pub struct ViewModelBuilder<'a> {
    store: &'a DataStore,
    distinguished_entity: &'a str,
}

/// Rebuild the full snapshot; refuses to run without loaded data.
pub fn rebuild_view_model(
    store: Option<&DataStore>,
    state: &DashboardState,
    distinguished_entity: &str,
) -> Result<ViewModel> {
    let store = store.ok_or_else(|| {
        DashboardError::DataUnavailable("no flow records or entity metadata loaded".to_string())
    })?;
    Ok(ViewModelBuilder::new(store, distinguished_entity).build(state))
}

impl<'a> ViewModelBuilder<'a> {
    pub fn new(store: &'a DataStore, distinguished_entity: &'a str) -> Self {
        ViewModelBuilder {
            store,
            distinguished_entity,
        }
    }

    pub fn build(&self, state: &DashboardState) -> ViewModel {
        let criteria = &state.criteria;
        let content = if state.compare.enabled() {
            ViewContent::Compare(self.build_compare(criteria, &state.compare))
        } else {
            ViewContent::Single(self.build_single(criteria, state.line_toggles))
        };

        ViewModel {
            metric: criteria.metric,
            unit: criteria.metric.unit().to_string(),
            axis_label: criteria.metric.axis_label().to_string(),
            top_n: criteria.top_n,
            content,
        }
    }

    // ------------------------------------------------------------------------
    // Single mode
    // ------------------------------------------------------------------------

    fn build_single(&self, criteria: &FilterCriteria, toggles: LineToggles) -> SingleView {
        let records = self.store.records();
        let metric = criteria.metric;
        let filtered = FilterEngine::apply(records, criteria, ApplyOptions::default());
        let top = AggregationEngine::top_n(filtered.iter().copied(), metric, criteria.top_n);
        let summary = AggregationEngine::distinguished_entity_summary(
            filtered.iter().copied(),
            metric,
            self.distinguished_entity,
        );

        let over_time = FilterEngine::apply(records, criteria, ApplyOptions::all_years());
        let years = AggregationEngine::years_observed(over_time.iter().copied());
        let mut series = Vec::new();
        if toggles.show_total() {
            series.push(LineSeries {
                name: "TOTAL".to_string(),
                values: AggregationEngine::totals_by_year(over_time.iter().copied(), metric, &years),
                hidden: false,
            });
        }
        if toggles.show_breakdown() {
            for (code, values) in
                AggregationEngine::reporter_breakdown(&over_time, metric, criteria.top_n, &years)
            {
                series.push(LineSeries {
                    name: self.store.display_name(&code).to_string(),
                    values,
                    hidden: false,
                });
            }
        }

        debug!(
            filtered = filtered.len(),
            ranked = summary.total_ranked,
            years = years.len(),
            "built single view"
        );

        let top_label = format!("Top {}", criteria.top_n);
        let partner = criteria.primary_partner.as_deref().filter(|p| !p.is_empty());
        let (bar_title, map_title, line_title) = match partner {
            Some(code) => {
                let name = self.store.display_name(code);
                (
                    format!("{} Exporters to {}", top_label, name),
                    format!("{} Sources to {}", top_label, name),
                    format!("Imports to {}", name),
                )
            }
            None => (
                format!("{} Exporters", top_label),
                "Top Sources".to_string(),
                "Over Time".to_string(),
            ),
        };

        let map = self.map_series(partner, &top, None);
        let map_max_value = max_value(&[&top]);

        SingleView {
            bar_title,
            map_title,
            bar_series: self.bar_series(&top),
            line: LineChart {
                title: line_title,
                years,
                series,
            },
            usa: self.usa_card(format!("Imports from {}", self.distinguished_entity), summary),
            map,
            map_max_value,
        }
    }

    // ------------------------------------------------------------------------
    // Compare mode
    // ------------------------------------------------------------------------

    fn build_compare(&self, criteria: &FilterCriteria, compare: &CompareState) -> CompareView {
        let records = self.store.records();
        let metric = criteria.metric;
        let axis = compare.axis();
        let visibility = compare.visibility();
        let (label_a, label_b) = labels_for(axis, criteria, self.store);

        let criteria_a = axis.side_criteria(criteria, Side::A);
        let criteria_b = axis.side_criteria(criteria, Side::B);

        // Each side ranks its own candidates; truncation never crosses sides.
        let filtered_a = FilterEngine::apply(records, &criteria_a, ApplyOptions::default());
        let filtered_b = FilterEngine::apply(records, &criteria_b, ApplyOptions::default());
        let top_a = AggregationEngine::top_n(filtered_a.iter().copied(), metric, criteria.top_n);
        let top_b = AggregationEngine::top_n(filtered_b.iter().copied(), metric, criteria.top_n);

        // Year stays the x-axis everywhere; only the year axis keeps each
        // side's own year filter so the two series actually differ.
        let line_options = match axis {
            CompareAxis::Years => ApplyOptions::default(),
            _ => ApplyOptions::all_years(),
        };
        let over_time_a = FilterEngine::apply(records, &criteria_a, line_options);
        let over_time_b = FilterEngine::apply(records, &criteria_b, line_options);
        let years: Vec<i32> = over_time_a
            .iter()
            .chain(over_time_b.iter())
            .filter_map(|r| r.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let line = LineChart {
            title: format!("Over Time — {} vs {}", label_a, label_b),
            series: vec![
                LineSeries {
                    name: label_a.clone(),
                    values: AggregationEngine::totals_by_year(over_time_a.iter().copied(), metric, &years),
                    hidden: !visibility.show_a(),
                },
                LineSeries {
                    name: label_b.clone(),
                    values: AggregationEngine::totals_by_year(over_time_b.iter().copied(), metric, &years),
                    hidden: !visibility.show_b(),
                },
            ],
            years,
        };

        let (map_layout, destination_a, destination_b) = match axis {
            CompareAxis::Countries => (
                MapLayout::Separate,
                criteria_a.primary_partner.as_deref(),
                criteria_b.primary_partner.as_deref(),
            ),
            _ => (
                MapLayout::Overlay,
                criteria.primary_partner.as_deref(),
                criteria.primary_partner.as_deref(),
            ),
        };

        let shared_for_a = visibility.show_b().then_some(top_b.as_slice());
        let shared_for_b = visibility.show_a().then_some(top_a.as_slice());
        let visible_tops: Vec<&Vec<RankedEntry>> = [(visibility.show_a(), &top_a), (visibility.show_b(), &top_b)]
            .into_iter()
            .filter(|(shown, _)| *shown)
            .map(|(_, top)| top)
            .collect();
        let map_max_value = max_value(&visible_tops);

        let top_label = format!("Top {}", criteria.top_n);
        let side_a = CompareSide {
            bar_title: format!("{} to {}", top_label, label_a),
            bar_series: self.bar_series(&top_a),
            usa: self.usa_card(
                self.compare_card_title(axis, &criteria_a, &label_a),
                AggregationEngine::distinguished_entity_summary(
                    filtered_a.iter().copied(),
                    metric,
                    self.distinguished_entity,
                ),
            ),
            map: self.map_series(destination_a, &top_a, shared_for_a),
            hidden: !visibility.show_a(),
            label: label_a.clone(),
        };
        let side_b = CompareSide {
            bar_title: format!("{} to {}", top_label, label_b),
            bar_series: self.bar_series(&top_b),
            usa: self.usa_card(
                self.compare_card_title(axis, &criteria_b, &label_b),
                AggregationEngine::distinguished_entity_summary(
                    filtered_b.iter().copied(),
                    metric,
                    self.distinguished_entity,
                ),
            ),
            map: self.map_series(destination_b, &top_b, shared_for_b),
            hidden: !visibility.show_b(),
            label: label_b.clone(),
        };

        debug!(
            axis = %axis,
            filtered_a = filtered_a.len(),
            filtered_b = filtered_b.len(),
            "built compare view"
        );

        CompareView {
            axis,
            map_title: format!("{} Sources — {} vs {}", top_label, label_a, label_b),
            map_layout,
            map_max_value,
            side_a,
            side_b,
            line,
        }
    }

    fn compare_card_title(&self, axis: CompareAxis, side: &FilterCriteria, label: &str) -> String {
        let entity = self.distinguished_entity;
        match axis {
            CompareAxis::Countries => format!("{} → {}", entity, label),
            CompareAxis::Years => match side.year {
                Some(year) => format!("{} ({})", entity, year),
                None => format!("{} (All)", entity),
            },
            CompareAxis::Temperature => {
                format!("{} ({})", entity, side.temperature.as_deref().unwrap_or("All"))
            }
        }
    }

    // ------------------------------------------------------------------------
    // Shared pieces
    // ------------------------------------------------------------------------

    fn bar_series(&self, top: &[RankedEntry]) -> Vec<BarEntry> {
        top.iter()
            .map(|entry| BarEntry {
                code: entry.code.clone(),
                label: self.store.display_name(&entry.code).to_string(),
                value: entry.value,
            })
            .collect()
    }

    fn map_series(&self, destination: Option<&str>, top: &[RankedEntry], other_side: Option<&[RankedEntry]>) -> MapSeries {
        let mut sources = Vec::new();
        let mut unresolved = Vec::new();

        for entry in top {
            match self.map_point(&entry.code) {
                Some(point) => sources.push(MapSource {
                    point,
                    value: entry.value,
                    shared: other_side.map_or(false, |other| other.iter().any(|o| o.code == entry.code)),
                }),
                None => unresolved.push(entry.code.clone()),
            }
        }

        MapSeries {
            destination: destination.and_then(|code| self.map_point(code)),
            sources,
            unresolved,
        }
    }

    fn map_point(&self, code: &str) -> Option<MapPoint> {
        self.store.entity(code).map(|info| MapPoint {
            code: code.to_string(),
            name: self.store.display_name(code).to_string(),
            latitude: info.latitude,
            longitude: info.longitude,
        })
    }

    fn usa_card(&self, title: String, summary: UsaSummary) -> UsaCard {
        let value_text = if summary.value > 0.0 {
            format_compact(summary.value)
        } else {
            "N/A".to_string()
        };
        UsaCard {
            title,
            value_text,
            rank_text: summary.rank_text(),
            summary,
        }
    }
}

/// Largest ranked value across the given lists, never below 1.
fn max_value<T: AsRef<[RankedEntry]>>(tops: &[T]) -> f64 {
    tops.iter()
        .flat_map(|top| top.as_ref().iter().map(|e| e.value))
        .fold(1.0, f64::max)
}

/// Compact number text: 1.2B, 3.4M, 5.6K, or a whole number below 1000.
/// Halves round away from zero.
pub fn format_compact(n: f64) -> String {
    if n >= 1e9 {
        format!("{:.1}B", round_tenths(n / 1e9))
    } else if n >= 1e6 {
        format!("{:.1}M", round_tenths(n / 1e6))
    } else if n >= 1e3 {
        format!("{:.1}K", round_tenths(n / 1e3))
    } else {
        format!("{:.0}", n.round())
    }
}

fn round_tenths(n: f64) -> f64 {
    (n * 10.0).round() / 10.0
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{EntityInfo, FlowRecord};
    use std::collections::HashMap;

    fn end_to_end_store() -> DataStore {
        let records = vec![
            FlowRecord::new("A", "X", Some(2020)).with_value(100.0),
            FlowRecord::new("B", "X", Some(2020)).with_value(300.0),
            FlowRecord::new("A", "X", Some(2021)).with_value(50.0),
        ];
        DataStore::new(records, HashMap::new())
    }

    fn compare_store() -> DataStore {
        let records = vec![
            // side A (partner X): A dominates
            FlowRecord::new("A", "X", Some(2020)).with_value(900.0).with_temperature("Frozen"),
            FlowRecord::new("B", "X", Some(2020)).with_value(100.0).with_temperature("Chilled"),
            // side B (partner Y): A also present and on top
            FlowRecord::new("A", "Y", Some(2021)).with_value(500.0).with_temperature("Frozen"),
            FlowRecord::new("C", "Y", Some(2021)).with_value(200.0).with_temperature("Frozen"),
            FlowRecord::new("USA", "Y", Some(2021)).with_value(50.0).with_temperature("Chilled"),
        ];
        let mut entities = HashMap::new();
        entities.insert("X".to_string(), EntityInfo::new("Xland", 10.0, 20.0));
        entities.insert("Y".to_string(), EntityInfo::new("Yland", -5.0, 30.0));
        entities.insert("A".to_string(), EntityInfo::new("Aland", 1.0, 2.0));
        DataStore::new(records, entities)
    }

    fn state_with(criteria: FilterCriteria) -> DashboardState {
        DashboardState {
            criteria,
            ..DashboardState::default()
        }
    }

    #[test]
    fn test_end_to_end_single_view() {
        let store = end_to_end_store();
        let state = state_with(FilterCriteria {
            primary_partner: Some("X".to_string()),
            top_n: 1,
            ..FilterCriteria::default()
        });

        let view = ViewModelBuilder::new(&store, "USA").build(&state);
        let single = view.as_single().unwrap();

        assert_eq!(single.bar_series.len(), 1);
        assert_eq!(single.bar_series[0].code, "B");
        assert_eq!(single.bar_series[0].value, 300.0);
        assert_eq!(single.line.years, vec![2020, 2021]);
        assert_eq!(single.line.series.len(), 1);
        assert_eq!(single.line.series[0].name, "TOTAL");
        assert_eq!(single.line.series[0].values, vec![400.0, 50.0]);
    }

    #[test]
    fn test_single_line_ignores_year_filter() {
        let store = end_to_end_store();
        let state = state_with(FilterCriteria {
            primary_partner: Some("X".to_string()),
            year: Some(2021),
            ..FilterCriteria::default()
        });

        let view = ViewModelBuilder::new(&store, "USA").build(&state);
        let single = view.as_single().unwrap();

        assert_eq!(single.bar_series.len(), 1);
        assert_eq!(single.bar_series[0].value, 50.0);
        assert_eq!(single.line.years, vec![2020, 2021]);
    }

    #[test]
    fn test_single_breakdown_replaces_total() {
        let store = end_to_end_store();
        let mut state = state_with(FilterCriteria::default());
        state.line_toggles.set_breakdown(true);

        let view = ViewModelBuilder::new(&store, "USA").build(&state);
        let names: Vec<&str> = view
            .as_single()
            .unwrap()
            .line
            .series
            .iter()
            .map(|s| s.name.as_str())
            .collect();

        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_single_titles_and_usa_card() {
        let store = compare_store();
        let state = state_with(FilterCriteria {
            primary_partner: Some("Y".to_string()),
            top_n: 2,
            ..FilterCriteria::default()
        });

        let view = ViewModelBuilder::new(&store, "USA").build(&state);
        let single = view.as_single().unwrap();

        assert_eq!(single.bar_title, "Top 2 Exporters to Yland");
        assert_eq!(single.map_title, "Top 2 Sources to Yland");
        assert_eq!(single.line.title, "Imports to Yland");
        assert_eq!(single.usa.title, "Imports from USA");
        assert_eq!(single.usa.summary.rank, Some(3));
        assert_eq!(single.usa.rank_text, "Rank #3 of 3");
        assert_eq!(single.usa.value_text, "50");
        assert_eq!(view.unit, "USD");
    }

    #[test]
    fn test_single_map_skips_unknown_entities() {
        let store = compare_store();
        let state = state_with(FilterCriteria {
            primary_partner: Some("Y".to_string()),
            ..FilterCriteria::default()
        });

        let view = ViewModelBuilder::new(&store, "USA").build(&state);
        let map = &view.as_single().unwrap().map;

        assert_eq!(map.destination.as_ref().map(|d| d.name.as_str()), Some("Yland"));
        assert_eq!(map.sources.len(), 1);
        assert_eq!(map.sources[0].point.code, "A");
        assert_eq!(map.unresolved, vec!["C".to_string(), "USA".to_string()]);
        assert_eq!(view.as_single().unwrap().map_max_value, 500.0);
    }

    #[test]
    fn test_compare_countries_has_no_cross_side_leakage() {
        let store = compare_store();
        let mut state = state_with(FilterCriteria {
            primary_partner: Some("X".to_string()),
            secondary_partner: Some("Y".to_string()),
            top_n: 1,
            ..FilterCriteria::default()
        });
        state
            .compare
            .enter_compare(CompareAxis::Countries, &mut state.criteria, &store.options());

        let view = ViewModelBuilder::new(&store, "USA").build(&state);
        let compare = view.as_compare().unwrap();

        assert_eq!(compare.side_a.bar_series[0].code, "A");
        assert_eq!(compare.side_a.bar_series[0].value, 900.0);
        // A is side A's top-1 and must still rank on side B
        assert_eq!(compare.side_b.bar_series.len(), 1);
        assert_eq!(compare.side_b.bar_series[0].code, "A");
        assert_eq!(compare.side_b.bar_series[0].value, 500.0);
        assert_eq!(compare.map_layout, MapLayout::Separate);
        assert!(compare.side_b.map.sources[0].shared);
    }

    #[test]
    fn test_compare_labels_and_titles() {
        let store = compare_store();
        let mut state = state_with(FilterCriteria {
            primary_partner: Some("X".to_string()),
            secondary_partner: Some("Y".to_string()),
            ..FilterCriteria::default()
        });
        state
            .compare
            .enter_compare(CompareAxis::Countries, &mut state.criteria, &store.options());

        let view = ViewModelBuilder::new(&store, "USA").build(&state);
        let compare = view.as_compare().unwrap();

        assert_eq!(compare.side_a.label, "Xland");
        assert_eq!(compare.side_b.label, "Yland");
        assert_eq!(compare.side_a.usa.title, "USA → Xland");
        assert_eq!(compare.side_b.usa.summary.rank, Some(3));
        assert_eq!(compare.side_a.usa.rank_text, "No data");
        assert_eq!(compare.side_a.usa.value_text, "N/A");
        assert_eq!(compare.map_title, "Top 10 Sources — Xland vs Yland");
        assert_eq!(compare.line.title, "Over Time — Xland vs Yland");
    }

    #[test]
    fn test_compare_hidden_side_still_computed() {
        let store = compare_store();
        let mut state = state_with(FilterCriteria {
            primary_partner: Some("X".to_string()),
            secondary_partner: Some("Y".to_string()),
            ..FilterCriteria::default()
        });
        state
            .compare
            .enter_compare(CompareAxis::Countries, &mut state.criteria, &store.options());
        state.compare.toggle_visibility(Side::B);

        let view = ViewModelBuilder::new(&store, "USA").build(&state);
        let compare = view.as_compare().unwrap();

        assert!(compare.side_b.hidden);
        assert!(!compare.side_b.bar_series.is_empty());
        assert!(compare.line.series[1].hidden);
        assert!(!compare.side_a.map.sources.iter().any(|s| s.shared));
        assert_eq!(compare.map_max_value, 900.0);
    }

    #[test]
    fn test_compare_years_line_uses_union_with_gaps() {
        let store = compare_store();
        let mut state = state_with(FilterCriteria {
            year: Some(2020),
            secondary_year: Some(2021),
            ..FilterCriteria::default()
        });
        state
            .compare
            .enter_compare(CompareAxis::Years, &mut state.criteria, &store.options());

        let view = ViewModelBuilder::new(&store, "USA").build(&state);
        let compare = view.as_compare().unwrap();

        assert_eq!(compare.line.years, vec![2020, 2021]);
        assert_eq!(compare.line.series[0].values, vec![1000.0, 0.0]);
        assert_eq!(compare.line.series[1].values, vec![0.0, 750.0]);
        assert_eq!(compare.side_a.label, "2020");
        assert_eq!(compare.side_b.usa.title, "USA (2021)");
        assert_eq!(compare.map_layout, MapLayout::Overlay);
    }

    #[test]
    fn test_compare_temperature_sides() {
        let store = compare_store();
        let mut state = state_with(FilterCriteria {
            temperature: Some("Frozen".to_string()),
            ..FilterCriteria::default()
        });
        state
            .compare
            .enter_compare(CompareAxis::Temperature, &mut state.criteria, &store.options());

        let view = ViewModelBuilder::new(&store, "USA").build(&state);
        let compare = view.as_compare().unwrap();

        assert_eq!(state.criteria.secondary_temperature.as_deref(), Some("Chilled"));
        assert_eq!(compare.side_a.label, "Frozen");
        assert_eq!(compare.side_b.label, "Chilled");
        assert_eq!(compare.side_a.bar_series[0].value, 1400.0);
        assert_eq!(compare.side_b.usa.summary.rank, Some(2));
        assert_eq!(compare.side_b.usa.title, "USA (Chilled)");
        // non-year axes plot every year on both sides
        assert_eq!(compare.line.series[0].values, vec![900.0, 700.0]);
        assert_eq!(compare.line.series[1].values, vec![100.0, 50.0]);
    }

    #[test]
    fn test_identical_sides_render_identically() {
        let store = end_to_end_store();
        let mut state = state_with(FilterCriteria {
            primary_partner: Some("X".to_string()),
            ..FilterCriteria::default()
        });
        // only one partner exists, so side B cannot be seeded
        state
            .compare
            .enter_compare(CompareAxis::Countries, &mut state.criteria, &store.options());
        state.criteria.secondary_partner = Some("X".to_string());

        let view = ViewModelBuilder::new(&store, "USA").build(&state);
        let compare = view.as_compare().unwrap();

        assert_eq!(compare.side_a.bar_series, compare.side_b.bar_series);
        assert_eq!(compare.line.series[0].values, compare.line.series[1].values);
    }

    #[test]
    fn test_rebuild_without_data_is_unavailable() {
        let result = rebuild_view_model(None, &DashboardState::default(), "USA");

        assert!(matches!(result, Err(DashboardError::DataUnavailable(_))));
    }

    #[test]
    fn test_initial_state_and_reset() {
        let store = compare_store();
        let options = store.options();
        let mut state = DashboardState::initial(&options, 5, Metric::QuantityMt);

        assert_eq!(state.criteria.primary_partner.as_deref(), Some("X"));
        assert_eq!(state.criteria.secondary_partner.as_deref(), Some("Y"));
        assert_eq!(state.criteria.top_n, 5);
        assert_eq!(state.criteria.metric, Metric::QuantityMt);

        state.criteria.year = Some(2020);
        state.compare.enter_compare(CompareAxis::Years, &mut state.criteria, &options);
        state.line_toggles.set_breakdown(true);
        state.reset(&options, 5, Metric::QuantityMt);

        assert_eq!(state, DashboardState::initial(&options, 5, Metric::QuantityMt));
        assert!(!state.compare.enabled());
    }

    #[test]
    fn test_line_toggles_are_exclusive() {
        let mut toggles = LineToggles::default();

        toggles.set_breakdown(true);
        assert!(!toggles.show_total());
        assert!(toggles.show_breakdown());

        toggles.set_breakdown(false);
        assert!(toggles.show_total());

        toggles.set_total(false);
        assert!(toggles.show_total());

        let both = LineToggles::both();
        assert!(both.show_total() && both.show_breakdown());
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(format_compact(1_250_000_000.0), "1.3B");
        assert_eq!(format_compact(3_400_000.0), "3.4M");
        assert_eq!(format_compact(5_600.0), "5.6K");
        assert_eq!(format_compact(999.0), "999");
    }

    #[test]
    fn test_format_compact_rounds_halves_up() {
        assert_eq!(format_compact(2.5), "3");
        assert_eq!(format_compact(0.5), "1");
        assert_eq!(format_compact(1_250.0), "1.3K");
    }

    #[test]
    fn test_view_model_serializes_with_mode_tag() {
        let store = end_to_end_store();
        let view = ViewModelBuilder::new(&store, "USA").build(&DashboardState::default());

        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["metric"], "value_usd");
        assert_eq!(json["content"]["mode"], "single");
    }
}
