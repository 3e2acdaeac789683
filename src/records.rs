// Flow records and entity metadata
// The immutable data set every dashboard view is computed from

use crate::filter::Metric;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

// ============================================================================
// FLOW RECORD
// ============================================================================

/// One observed trade flow from `reporter` (exporter) to `partner` (importer).
///
/// Numeric fields are already coerced by the loader: never negative, never NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub reporter: String,
    pub partner: String,
    pub year: Option<i32>,
    pub temperature: Option<String>,
    pub product_class: Option<String>,
    pub value_usd: f64,
    pub quantity_mt: f64,
}

impl FlowRecord {
    /// Minimal record, mostly used by fixtures and the loader
    pub fn new(reporter: &str, partner: &str, year: Option<i32>) -> Self {
        FlowRecord {
            reporter: reporter.to_string(),
            partner: partner.to_string(),
            year,
            temperature: None,
            product_class: None,
            value_usd: 0.0,
            quantity_mt: 0.0,
        }
    }

    pub fn with_value(mut self, value_usd: f64) -> Self {
        self.value_usd = value_usd;
        self
    }

    pub fn with_quantity(mut self, quantity_mt: f64) -> Self {
        self.quantity_mt = quantity_mt;
        self
    }

    pub fn with_temperature(mut self, temperature: &str) -> Self {
        self.temperature = Some(temperature.to_string());
        self
    }

    pub fn with_product_class(mut self, product_class: &str) -> Self {
        self.product_class = Some(product_class.to_string());
        self
    }

    /// Value of the selected metric; anything non-finite counts as 0.
    pub fn metric_value(&self, metric: Metric) -> f64 {
        let raw = match metric {
            Metric::ValueUsd => self.value_usd,
            Metric::QuantityMt => self.quantity_mt,
        };
        if raw.is_finite() {
            raw
        } else {
            0.0
        }
    }

    /// Reporter code, or `None` when the row has no reporter to aggregate under
    pub fn reporter_code(&self) -> Option<&str> {
        if self.reporter.is_empty() {
            None
        } else {
            Some(&self.reporter)
        }
    }
}

// ============================================================================
// ENTITY METADATA
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl EntityInfo {
    pub fn new(name: &str, latitude: f64, longitude: f64) -> Self {
        EntityInfo {
            name: name.to_string(),
            latitude,
            longitude,
        }
    }
}

/// Read-only view of the entity table.
///
/// Unknown codes are never an error: name lookups fall back to the raw code.
pub trait EntityLookup {
    fn entity(&self, code: &str) -> Option<&EntityInfo>;

    fn display_name<'a>(&'a self, code: &'a str) -> &'a str {
        match self.entity(code) {
            Some(info) if !info.name.is_empty() => &info.name,
            _ => code,
        }
    }
}

impl EntityLookup for HashMap<String, EntityInfo> {
    fn entity(&self, code: &str) -> Option<&EntityInfo> {
        self.get(code)
    }
}

// ============================================================================
// FILTER OPTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerOption {
    pub code: String,
    /// "Name (CODE)" for known entities, the raw code otherwise
    pub text: String,
}

/// Selectable values for every criteria field, in display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub partners: Vec<PartnerOption>,
    pub years: Vec<i32>,
    pub temperatures: Vec<String>,
    pub product_classes: Vec<String>,
}

impl FilterOptions {
    pub fn partner_codes(&self) -> Vec<String> {
        self.partners.iter().map(|p| p.code.clone()).collect()
    }
}

// ============================================================================
// DATA STORE
// ============================================================================

/// Loaded flow records plus the entity table. Never mutated after load.
#[derive(Debug, Clone, Default)]
pub struct DataStore {
    records: Vec<FlowRecord>,
    entities: HashMap<String, EntityInfo>,
}

impl DataStore {
    pub fn new(records: Vec<FlowRecord>, entities: HashMap<String, EntityInfo>) -> Self {
        DataStore { records, entities }
    }

    pub fn records(&self) -> &[FlowRecord] {
        &self.records
    }

    pub fn entities(&self) -> &HashMap<String, EntityInfo> {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Enumerate distinct, non-empty values per field.
    ///
    /// Partners, temperatures and product classes sort by string; years sort
    /// ascending numerically.
    pub fn options(&self) -> FilterOptions {
        let mut partners = BTreeSet::new();
        let mut years = BTreeSet::new();
        let mut temperatures = BTreeSet::new();
        let mut product_classes = BTreeSet::new();

        for record in &self.records {
            if !record.partner.is_empty() {
                partners.insert(record.partner.as_str());
            }
            if let Some(year) = record.year {
                years.insert(year);
            }
            if let Some(temp) = record.temperature.as_deref().filter(|t| !t.is_empty()) {
                temperatures.insert(temp);
            }
            if let Some(class) = record.product_class.as_deref().filter(|c| !c.is_empty()) {
                product_classes.insert(class);
            }
        }

        FilterOptions {
            partners: partners
                .into_iter()
                .map(|code| PartnerOption {
                    code: code.to_string(),
                    text: match self.entities.get(code) {
                        Some(info) => format!("{} ({})", info.name, code),
                        None => code.to_string(),
                    },
                })
                .collect(),
            years: years.into_iter().collect(),
            temperatures: temperatures.into_iter().map(str::to_string).collect(),
            product_classes: product_classes.into_iter().map(str::to_string).collect(),
        }
    }
}

impl EntityLookup for DataStore {
    fn entity(&self, code: &str) -> Option<&EntityInfo> {
        self.entities.get(code)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> DataStore {
        let records = vec![
            FlowRecord::new("CHN", "DEU", Some(2021)).with_temperature("Frozen"),
            FlowRecord::new("USA", "BRA", Some(2019)).with_product_class("Seafood"),
            FlowRecord::new("USA", "DEU", Some(2020)).with_temperature("Chilled"),
            FlowRecord::new("FRA", "", None),
        ];
        let mut entities = HashMap::new();
        entities.insert("DEU".to_string(), EntityInfo::new("Germany", 51.0, 10.0));
        DataStore::new(records, entities)
    }

    #[test]
    fn test_metric_value_ignores_non_finite() {
        let record = FlowRecord::new("USA", "DEU", Some(2020))
            .with_value(f64::NAN)
            .with_quantity(12.5);

        assert_eq!(record.metric_value(Metric::ValueUsd), 0.0);
        assert_eq!(record.metric_value(Metric::QuantityMt), 12.5);
    }

    #[test]
    fn test_reporter_code_empty_is_none() {
        assert_eq!(FlowRecord::new("", "DEU", None).reporter_code(), None);
        assert_eq!(FlowRecord::new("USA", "DEU", None).reporter_code(), Some("USA"));
    }

    #[test]
    fn test_options_are_sorted_and_deduplicated() {
        let options = sample_store().options();

        assert_eq!(options.partner_codes(), vec!["BRA", "DEU"]);
        assert_eq!(options.years, vec![2019, 2020, 2021]);
        assert_eq!(options.temperatures, vec!["Chilled", "Frozen"]);
        assert_eq!(options.product_classes, vec!["Seafood"]);
    }

    #[test]
    fn test_partner_option_text_uses_entity_name() {
        let options = sample_store().options();

        assert_eq!(options.partners[0].text, "BRA");
        assert_eq!(options.partners[1].text, "Germany (DEU)");
    }

    #[test]
    fn test_display_name_falls_back_to_code() {
        let store = sample_store();

        assert_eq!(store.display_name("DEU"), "Germany");
        assert_eq!(store.display_name("XYZ"), "XYZ");
    }
}
