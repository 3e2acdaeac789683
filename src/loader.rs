// CSV Loader - flow table + entity centroid table into a DataStore
//
// Flows:     ReporterISO3, PartnerISO3, Year, Temperature, Value chains, value_usd, quantity_mt
// Entities:  ReporterISO3, Country, y_lat, x_lon
//
// Unparseable numbers become 0 (negative values too); unparseable years
// become None. Every coercion is counted in the LoadReport.

use crate::error::{DashboardError, Result};
use crate::records::{DataStore, EntityInfo, FlowRecord};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ============================================================================
// RAW ROWS
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawFlowRow {
    #[serde(rename = "ReporterISO3", default)]
    reporter: String,
    #[serde(rename = "PartnerISO3", default)]
    partner: String,
    #[serde(rename = "Year", default)]
    year: String,
    #[serde(rename = "Temperature", default)]
    temperature: String,
    #[serde(rename = "Value chains", default)]
    product_class: String,
    #[serde(default)]
    value_usd: String,
    #[serde(default)]
    quantity_mt: String,
}

#[derive(Debug, Deserialize)]
struct RawEntityRow {
    #[serde(rename = "ReporterISO3", default)]
    code: String,
    #[serde(rename = "Country", default)]
    name: String,
    #[serde(default)]
    y_lat: String,
    #[serde(default)]
    x_lon: String,
}

// ============================================================================
// LOAD REPORT
// ============================================================================

/// What the loader had to coerce on the way in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub flow_rows: usize,
    pub entity_rows: usize,
    /// value_usd / quantity_mt fields that were empty, non-numeric or negative
    pub coerced_numbers: usize,
    pub missing_years: usize,
    /// Entity rows whose coordinates could not be parsed
    pub coerced_coordinates: usize,
    /// Entity rows dropped for having no code
    pub skipped_entities: usize,
}

impl LoadReport {
    pub fn has_coercions(&self) -> bool {
        self.coerced_numbers > 0
            || self.missing_years > 0
            || self.coerced_coordinates > 0
            || self.skipped_entities > 0
    }
}

// ============================================================================
// CSV LOADER
// ============================================================================

pub struct CsvLoader {
    flows_path: PathBuf,
    entities_path: PathBuf,
}

impl CsvLoader {
    pub fn new(flows_path: impl Into<PathBuf>, entities_path: impl Into<PathBuf>) -> Self {
        CsvLoader {
            flows_path: flows_path.into(),
            entities_path: entities_path.into(),
        }
    }

    pub fn load(&self) -> Result<(DataStore, LoadReport)> {
        let flows = reader_builder()
            .from_path(&self.flows_path)
            .map_err(|e| load_error(&self.flows_path, e))?;
        let entities = reader_builder()
            .from_path(&self.entities_path)
            .map_err(|e| load_error(&self.entities_path, e))?;

        let mut report = LoadReport::default();
        let entity_table = read_entities(entities, &self.entities_path, &mut report)?;
        let records = read_flows(flows, &self.flows_path, &mut report)?;

        finish(records, entity_table, report)
    }

    /// Load from in-memory readers (tests, embedded data)
    pub fn from_readers<F: Read, E: Read>(flows: F, entities: E) -> Result<(DataStore, LoadReport)> {
        let flows_label = Path::new("<flows>");
        let entities_label = Path::new("<entities>");

        let mut report = LoadReport::default();
        let entity_table = read_entities(reader_builder().from_reader(entities), entities_label, &mut report)?;
        let records = read_flows(reader_builder().from_reader(flows), flows_label, &mut report)?;

        finish(records, entity_table, report)
    }
}

/// Header-based reader; short rows leave their trailing columns empty.
fn reader_builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.has_headers(true).flexible(true);
    builder
}

fn finish(
    records: Vec<FlowRecord>,
    entities: HashMap<String, EntityInfo>,
    report: LoadReport,
) -> Result<(DataStore, LoadReport)> {
    if report.has_coercions() {
        warn!(
            coerced_numbers = report.coerced_numbers,
            missing_years = report.missing_years,
            coerced_coordinates = report.coerced_coordinates,
            skipped_entities = report.skipped_entities,
            "coerced malformed fields while loading"
        );
    }
    info!(
        flows = report.flow_rows,
        entities = entities.len(),
        "trade-flow data loaded"
    );

    Ok((DataStore::new(records, entities), report))
}

fn load_error(path: &Path, source: csv::Error) -> DashboardError {
    DashboardError::Load {
        path: path.to_path_buf(),
        source,
    }
}

fn read_flows<R: Read>(mut reader: csv::Reader<R>, path: &Path, report: &mut LoadReport) -> Result<Vec<FlowRecord>> {
    let mut records = Vec::new();

    for result in reader.deserialize() {
        let row: RawFlowRow = result.map_err(|e| load_error(path, e))?;
        report.flow_rows += 1;

        let year = parse_year(&row.year);
        if year.is_none() {
            report.missing_years += 1;
        }

        let (value_usd, value_ok) = parse_amount(&row.value_usd);
        let (quantity_mt, quantity_ok) = parse_amount(&row.quantity_mt);
        report.coerced_numbers += usize::from(!value_ok) + usize::from(!quantity_ok);

        records.push(FlowRecord {
            reporter: row.reporter.trim().to_string(),
            partner: row.partner.trim().to_string(),
            year,
            temperature: non_empty(&row.temperature),
            product_class: non_empty(&row.product_class),
            value_usd,
            quantity_mt,
        });
    }

    Ok(records)
}

fn read_entities<R: Read>(
    mut reader: csv::Reader<R>,
    path: &Path,
    report: &mut LoadReport,
) -> Result<HashMap<String, EntityInfo>> {
    let mut entities = HashMap::new();

    for result in reader.deserialize() {
        let row: RawEntityRow = result.map_err(|e| load_error(path, e))?;
        report.entity_rows += 1;

        let code = row.code.trim();
        if code.is_empty() {
            report.skipped_entities += 1;
            continue;
        }

        let latitude = parse_coordinate(&row.y_lat);
        let longitude = parse_coordinate(&row.x_lon);
        if latitude.is_none() || longitude.is_none() {
            report.coerced_coordinates += 1;
        }

        // later rows win on duplicate codes
        entities.insert(
            code.to_string(),
            EntityInfo::new(
                row.name.trim(),
                latitude.unwrap_or(0.0),
                longitude.unwrap_or(0.0),
            ),
        );
    }

    Ok(entities)
}

// ============================================================================
// FIELD COERCION
// ============================================================================

/// Returns the coerced amount and whether the raw text was usable as-is.
fn parse_amount(raw: &str) -> (f64, bool) {
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => (n, true),
        _ => (0.0, false),
    }
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Integer years, also accepting whole floats such as "2020.0"
fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if let Ok(year) = raw.parse::<i32>() {
        return Some(year);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|y| y.is_finite() && y.fract() == 0.0 && y.abs() <= i32::MAX as f64)
        .map(|y| y as i32)
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
