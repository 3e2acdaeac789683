// Compare State Machine - side-by-side analysis mode
//
// States: Single (initial), CompareByCountry, CompareByYear, CompareByTemperature
// Invariant: at least one of the two sides is always visible

use crate::filter::FilterCriteria;
use crate::records::{EntityLookup, FilterOptions};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

// ============================================================================
// AXIS / MODE / SIDE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareAxis {
    #[default]
    Countries,
    Years,
    Temperature,
}

impl CompareAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareAxis::Countries => "countries",
            CompareAxis::Years => "years",
            CompareAxis::Temperature => "temperature",
        }
    }

    /// Next axis in selector order (wraps around)
    pub fn next(&self) -> Self {
        match self {
            CompareAxis::Countries => CompareAxis::Years,
            CompareAxis::Years => CompareAxis::Temperature,
            CompareAxis::Temperature => CompareAxis::Countries,
        }
    }

    /// Criteria for one side: side A is the criteria as-is, side B swaps in
    /// the secondary value for this axis and holds everything else fixed.
    pub fn side_criteria(&self, criteria: &FilterCriteria, side: Side) -> FilterCriteria {
        let mut side_criteria = criteria.clone();
        if side == Side::B {
            match self {
                CompareAxis::Countries => side_criteria.primary_partner = criteria.secondary_partner.clone(),
                CompareAxis::Years => side_criteria.year = criteria.secondary_year,
                CompareAxis::Temperature => {
                    side_criteria.temperature = criteria.secondary_temperature.clone()
                }
            }
        }
        side_criteria
    }
}

impl fmt::Display for CompareAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompareAxis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "countries" | "country" => Ok(CompareAxis::Countries),
            "years" | "year" => Ok(CompareAxis::Years),
            "temperature" | "temp" | "temps" => Ok(CompareAxis::Temperature),
            other => Err(format!(
                "unknown compare axis '{}' (expected countries, years or temperature)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareMode {
    Single,
    CompareByCountry,
    CompareByYear,
    CompareByTemperature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(&self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

// ============================================================================
// VISIBILITY
// ============================================================================

/// Which compare sides get drawn. Never both hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Visibility {
    show_a: bool,
    show_b: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility {
            show_a: true,
            show_b: true,
        }
    }
}

impl Visibility {
    pub fn show_a(&self) -> bool {
        self.show_a
    }

    pub fn show_b(&self) -> bool {
        self.show_b
    }

    pub fn is_visible(&self, side: Side) -> bool {
        match side {
            Side::A => self.show_a,
            Side::B => self.show_b,
        }
    }

    /// Flip one side. Hiding the last visible side re-shows the other one.
    pub fn toggled(&self, side: Side) -> Visibility {
        let mut next = *self;
        match side {
            Side::A => next.show_a = !next.show_a,
            Side::B => next.show_b = !next.show_b,
        }
        if !next.show_a && !next.show_b {
            match side.other() {
                Side::A => next.show_a = true,
                Side::B => next.show_b = true,
            }
        }
        next
    }
}

// ============================================================================
// COMPARE STATE
// ============================================================================

/// Comparison mode, axis and side visibility.
///
/// Only changed through the transition methods; each one replaces the whole
/// state in a single assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompareState {
    enabled: bool,
    axis: CompareAxis,
    visibility: Visibility,
}

impl CompareState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn axis(&self) -> CompareAxis {
        self.axis
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn mode(&self) -> CompareMode {
        if !self.enabled {
            return CompareMode::Single;
        }
        match self.axis {
            CompareAxis::Countries => CompareMode::CompareByCountry,
            CompareAxis::Years => CompareMode::CompareByYear,
            CompareAxis::Temperature => CompareMode::CompareByTemperature,
        }
    }

    /// Enter (or switch to) compare mode along `axis`.
    ///
    /// Visibility resets to both sides. An unset secondary value for the axis
    /// is seeded with the first option that differs from the primary value;
    /// with no such option it stays unset and both sides show the same data.
    pub fn enter_compare(&mut self, axis: CompareAxis, criteria: &mut FilterCriteria, options: &FilterOptions) {
        let seeded = seed_secondary(axis, criteria, options);
        *self = CompareState {
            enabled: true,
            axis,
            visibility: Visibility::default(),
        };
        debug!(axis = %axis, seeded, "entered compare mode");
    }

    /// Back to single mode. Criteria values are kept, the axis is remembered.
    pub fn exit_compare(&mut self) {
        *self = CompareState {
            enabled: false,
            axis: self.axis,
            visibility: Visibility::default(),
        };
        debug!("left compare mode");
    }

    pub fn toggle_visibility(&mut self, side: Side) {
        *self = CompareState {
            visibility: self.visibility.toggled(side),
            ..*self
        };
    }
}

/// Returns true when a secondary value was filled in.
fn seed_secondary(axis: CompareAxis, criteria: &mut FilterCriteria, options: &FilterOptions) -> bool {
    match axis {
        CompareAxis::Countries => {
            if criteria.secondary_partner.is_some() {
                return false;
            }
            criteria.secondary_partner = options
                .partners
                .iter()
                .map(|p| p.code.as_str())
                .find(|code| !code.is_empty() && Some(*code) != criteria.primary_partner.as_deref())
                .map(str::to_string);
            criteria.secondary_partner.is_some()
        }
        CompareAxis::Years => {
            if criteria.secondary_year.is_some() {
                return false;
            }
            criteria.secondary_year = options
                .years
                .iter()
                .copied()
                .find(|year| Some(*year) != criteria.year);
            criteria.secondary_year.is_some()
        }
        CompareAxis::Temperature => {
            if criteria.secondary_temperature.is_some() {
                return false;
            }
            criteria.secondary_temperature = options
                .temperatures
                .iter()
                .find(|t| !t.is_empty() && Some(t.as_str()) != criteria.temperature.as_deref())
                .cloned();
            criteria.secondary_temperature.is_some()
        }
    }
}

// ============================================================================
// LABELS
// ============================================================================

/// Display labels for side A and side B along `axis`.
pub fn labels_for<L>(axis: CompareAxis, criteria: &FilterCriteria, entities: &L) -> (String, String)
where
    L: EntityLookup + ?Sized,
{
    match axis {
        CompareAxis::Countries => (
            partner_label(criteria.primary_partner.as_deref(), entities, "Country 1"),
            partner_label(criteria.secondary_partner.as_deref(), entities, "Country 2"),
        ),
        CompareAxis::Years => (year_label(criteria.year), year_label(criteria.secondary_year)),
        CompareAxis::Temperature => (
            criteria.temperature.clone().unwrap_or_else(|| "All Temps".to_string()),
            criteria
                .secondary_temperature
                .clone()
                .unwrap_or_else(|| "All Temps".to_string()),
        ),
    }
}

fn partner_label<L>(code: Option<&str>, entities: &L, fallback: &str) -> String
where
    L: EntityLookup + ?Sized,
{
    match code {
        Some(code) if !code.is_empty() => entities.display_name(code).to_string(),
        _ => fallback.to_string(),
    }
}

fn year_label(year: Option<i32>) -> String {
    year.map(|y| y.to_string())
        .unwrap_or_else(|| "All Years".to_string())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{EntityInfo, PartnerOption};
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn options() -> FilterOptions {
        FilterOptions {
            partners: vec![
                PartnerOption { code: "BRA".to_string(), text: "Brazil (BRA)".to_string() },
                PartnerOption { code: "DEU".to_string(), text: "Germany (DEU)".to_string() },
            ],
            years: vec![2019, 2020, 2021],
            temperatures: vec!["Chilled".to_string(), "Frozen".to_string()],
            product_classes: vec![],
        }
    }

    #[test]
    fn test_initial_state_is_single() {
        let state = CompareState::new();

        assert_eq!(state.mode(), CompareMode::Single);
        assert!(state.visibility().show_a());
        assert!(state.visibility().show_b());
    }

    #[test]
    fn test_enter_years_seeds_first_differing_year() {
        let mut state = CompareState::new();
        let mut criteria = FilterCriteria {
            year: Some(2020),
            ..FilterCriteria::default()
        };

        state.enter_compare(CompareAxis::Years, &mut criteria, &options());

        assert_eq!(state.mode(), CompareMode::CompareByYear);
        assert_eq!(criteria.secondary_year, Some(2019));
    }

    #[test]
    fn test_enter_countries_skips_primary_partner() {
        let mut state = CompareState::new();
        let mut criteria = FilterCriteria {
            primary_partner: Some("BRA".to_string()),
            ..FilterCriteria::default()
        };

        state.enter_compare(CompareAxis::Countries, &mut criteria, &options());

        assert_eq!(state.mode(), CompareMode::CompareByCountry);
        assert_eq!(criteria.secondary_partner.as_deref(), Some("DEU"));
    }

    #[test]
    fn test_enter_keeps_existing_secondary_value() {
        let mut state = CompareState::new();
        let mut criteria = FilterCriteria {
            temperature: Some("Chilled".to_string()),
            secondary_temperature: Some("Ambient".to_string()),
            ..FilterCriteria::default()
        };

        state.enter_compare(CompareAxis::Temperature, &mut criteria, &options());

        assert_eq!(criteria.secondary_temperature.as_deref(), Some("Ambient"));
    }

    #[test]
    fn test_enter_without_differing_option_leaves_unset() {
        let mut state = CompareState::new();
        let mut criteria = FilterCriteria {
            temperature: Some("Frozen".to_string()),
            ..FilterCriteria::default()
        };
        let only_frozen = FilterOptions {
            temperatures: vec!["Frozen".to_string()],
            ..FilterOptions::default()
        };

        state.enter_compare(CompareAxis::Temperature, &mut criteria, &only_frozen);

        assert_eq!(state.mode(), CompareMode::CompareByTemperature);
        assert_eq!(criteria.secondary_temperature, None);
    }

    #[test]
    fn test_axis_switch_resets_visibility() {
        let mut state = CompareState::new();
        let mut criteria = FilterCriteria::default();

        state.enter_compare(CompareAxis::Countries, &mut criteria, &options());
        state.toggle_visibility(Side::A);
        assert!(!state.visibility().show_a());

        state.enter_compare(CompareAxis::Years, &mut criteria, &options());
        assert_eq!(state.visibility(), Visibility::default());
        assert_eq!(state.axis(), CompareAxis::Years);
    }

    #[test]
    fn test_exit_compare_preserves_criteria() {
        let mut state = CompareState::new();
        let mut criteria = FilterCriteria {
            year: Some(2021),
            ..FilterCriteria::default()
        };

        state.enter_compare(CompareAxis::Years, &mut criteria, &options());
        state.toggle_visibility(Side::B);
        state.exit_compare();

        assert_eq!(state.mode(), CompareMode::Single);
        assert_eq!(state.axis(), CompareAxis::Years);
        assert_eq!(state.visibility(), Visibility::default());
        assert_eq!(criteria.secondary_year, Some(2019));
    }

    #[test]
    fn test_toggle_last_visible_side_reenables_other() {
        let mut state = CompareState::new();

        state.toggle_visibility(Side::A);
        assert!(!state.visibility().show_a());
        assert!(state.visibility().show_b());

        // hiding B while A is hidden forces A back on, B stays off
        state.toggle_visibility(Side::B);
        assert!(state.visibility().show_a());
        assert!(!state.visibility().show_b());
    }

    #[test]
    fn test_side_criteria_substitution() {
        let criteria = FilterCriteria {
            primary_partner: Some("BRA".to_string()),
            secondary_partner: Some("DEU".to_string()),
            year: Some(2020),
            secondary_year: Some(2021),
            temperature: Some("Frozen".to_string()),
            secondary_temperature: Some("Chilled".to_string()),
            ..FilterCriteria::default()
        };

        assert_eq!(CompareAxis::Countries.side_criteria(&criteria, Side::A), criteria);

        let b = CompareAxis::Countries.side_criteria(&criteria, Side::B);
        assert_eq!(b.primary_partner.as_deref(), Some("DEU"));
        assert_eq!(b.year, Some(2020));

        let b = CompareAxis::Years.side_criteria(&criteria, Side::B);
        assert_eq!(b.year, Some(2021));
        assert_eq!(b.primary_partner.as_deref(), Some("BRA"));

        let b = CompareAxis::Temperature.side_criteria(&criteria, Side::B);
        assert_eq!(b.temperature.as_deref(), Some("Chilled"));
        assert_eq!(b.year, Some(2020));
    }

    #[test]
    fn test_labels_for_each_axis() {
        let mut entities = HashMap::new();
        entities.insert("DEU".to_string(), EntityInfo::new("Germany", 51.0, 10.0));

        let criteria = FilterCriteria {
            primary_partner: Some("DEU".to_string()),
            secondary_partner: Some("XKX".to_string()),
            year: Some(2020),
            temperature: None,
            secondary_temperature: Some("Frozen".to_string()),
            ..FilterCriteria::default()
        };

        assert_eq!(
            labels_for(CompareAxis::Countries, &criteria, &entities),
            ("Germany".to_string(), "XKX".to_string())
        );
        assert_eq!(
            labels_for(CompareAxis::Years, &criteria, &entities),
            ("2020".to_string(), "All Years".to_string())
        );
        assert_eq!(
            labels_for(CompareAxis::Temperature, &criteria, &entities),
            ("All Temps".to_string(), "Frozen".to_string())
        );
        assert_eq!(
            labels_for(CompareAxis::Countries, &FilterCriteria::default(), &entities),
            ("Country 1".to_string(), "Country 2".to_string())
        );
    }

    #[test]
    fn test_axis_parsing_and_cycle() {
        assert_eq!("temp".parse::<CompareAxis>(), Ok(CompareAxis::Temperature));
        assert!("product".parse::<CompareAxis>().is_err());
        assert_eq!(CompareAxis::Temperature.next(), CompareAxis::Countries);
    }

    proptest! {
        #[test]
        fn prop_toggles_never_hide_both_sides(toggles in prop::collection::vec(any::<bool>(), 0..64)) {
            let mut state = CompareState::new();
            for toggle_a in toggles {
                state.toggle_visibility(if toggle_a { Side::A } else { Side::B });
                let visibility = state.visibility();
                prop_assert!(visibility.show_a() || visibility.show_b());
            }
        }
    }
}
