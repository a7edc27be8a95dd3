//! Flat projections of the derived records for the charting layer.
//!
//! Supports pretty-printing, JSON files, and CSV files.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::analyzers::types::{AccessibilityRecord, GapCandidate, OverlapRecord};
use csv::WriterBuilder;
use std::fs::File;
use std::path::Path;

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty(value: &impl std::fmt::Debug) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes `value` as pretty-printed JSON, replacing any existing file.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)?;
    debug!(path = %path.display(), "Wrote JSON");
    Ok(())
}

/// Writes rows to a CSV file with a header, replacing any existing file.
/// Returns the number of rows written.
pub fn write_csv<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<usize> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer.flush()?;

    debug!(path = %path.display(), rows = count, "Wrote CSV");
    Ok(count)
}

/// One line of `accessibility.csv`. An empty distance means no stop exists.
#[derive(Debug, Serialize)]
pub struct AccessibilityRow<'a> {
    pub owner: &'a str,
    pub name: Option<&'a str>,
    pub latitude: f64,
    pub longitude: f64,
    pub nearby_stop_count: usize,
    pub nearby_route_count: u64,
    pub extended_stop_count: usize,
    pub nearest_stop_distance_meters: Option<f64>,
    pub nearest_stop_id: Option<&'a str>,
    pub accessibility_level: String,
    pub category: Option<&'a str>,
}

impl<'a> From<&'a AccessibilityRecord> for AccessibilityRow<'a> {
    fn from(r: &'a AccessibilityRecord) -> Self {
        Self {
            owner: &r.owner,
            name: r.name.as_deref(),
            latitude: r.location.latitude(),
            longitude: r.location.longitude(),
            nearby_stop_count: r.nearby_stop_count,
            nearby_route_count: r.nearby_route_count,
            extended_stop_count: r.extended_stop_count,
            nearest_stop_distance_meters: r.nearest_stop_distance_meters,
            nearest_stop_id: r.nearest_stop_id.as_ref().map(|id| id.0.as_str()),
            accessibility_level: r.level.to_string(),
            category: r.category.as_deref(),
        }
    }
}

/// One line of `overlap.csv`: a home branch and one competitor.
#[derive(Debug, Serialize)]
pub struct OverlapRow<'a> {
    pub home_owner: &'a str,
    pub home_branch: Option<&'a str>,
    pub latitude: f64,
    pub longitude: f64,
    pub competitor: Option<&'a str>,
    pub competitor_count: usize,
}

impl<'a> OverlapRow<'a> {
    /// One row per competitor, or a single empty-competitor row when the
    /// home branch has none nearby.
    pub fn expand(record: &'a OverlapRecord) -> Vec<OverlapRow<'a>> {
        let base = |competitor: Option<&'a str>, competitor_count: usize| OverlapRow {
            home_owner: &record.branch.owner,
            home_branch: record.branch.name.as_deref(),
            latitude: record.branch.location.latitude(),
            longitude: record.branch.location.longitude(),
            competitor,
            competitor_count,
        };

        if record.competitor_counts.is_empty() {
            return vec![base(None, 0)];
        }
        record
            .competitor_counts
            .iter()
            .map(|(owner, count)| base(Some(owner.as_str()), *count))
            .collect()
    }
}

/// One line of `gaps.csv`, ranked from 1.
#[derive(Debug, Serialize)]
pub struct GapRow<'a> {
    pub rank: usize,
    pub stop_id: &'a str,
    pub latitude: f64,
    pub longitude: f64,
    pub is_hub: bool,
    pub route_count: u32,
    pub competitors_nearby: usize,
}

impl<'a> GapRow<'a> {
    pub fn new(rank: usize, gap: &'a GapCandidate) -> Self {
        Self {
            rank,
            stop_id: &gap.stop.id.0,
            latitude: gap.stop.location.latitude(),
            longitude: gap.stop.location.longitude(),
            is_hub: gap.stop.is_hub,
            route_count: gap.stop.route_count,
            competitors_nearby: gap.competitors_nearby,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::AccessibilityLevel;
    use crate::geo::GeoPoint;
    use crate::model::Branch;
    use std::collections::BTreeMap;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(name)
    }

    fn record(nearest: Option<f64>) -> AccessibilityRecord {
        AccessibilityRecord {
            owner: "A".to_string(),
            name: Some("Main".to_string()),
            category: None,
            location: GeoPoint::new(40.4, 49.85).unwrap(),
            nearby_stop_count: 1,
            nearby_route_count: 5,
            extended_stop_count: 2,
            nearest_stop_distance_meters: nearest,
            nearest_stop_id: None,
            level: AccessibilityLevel::Medium,
        }
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&record(None));
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&record(Some(12.0))).unwrap();
    }

    #[test]
    fn test_write_csv_header_and_rows() {
        let path = temp_path("branch_transit_rater_test_rows.csv");
        let _ = fs::remove_file(&path);

        let records = vec![record(Some(120.5)), record(None)];
        let written = write_csv(&path, records.iter().map(AccessibilityRow::from)).unwrap();
        assert_eq!(written, 2);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("owner,name,latitude,longitude"));
        assert!(lines[1].contains("120.5"));
        // absent nearest stop is an empty cell, never 0
        assert!(lines[2].contains(",2,,,Medium"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_csv_replaces_existing_file() {
        let path = temp_path("branch_transit_rater_test_replace.csv");
        let records = vec![record(None)];
        write_csv(&path, records.iter().map(AccessibilityRow::from)).unwrap();
        write_csv(&path, records.iter().map(AccessibilityRow::from)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_json_null_distance() {
        let path = temp_path("branch_transit_rater_test.json");
        write_json(&path, &record(None)).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(value["nearestStopDistanceMeters"].is_null());
        assert_eq!(value["level"], "Medium");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_overlap_row_expand() {
        let branch = Branch::new("Home", GeoPoint::new(40.4, 49.85).unwrap());
        let empty = OverlapRecord {
            branch: branch.clone(),
            competitor_counts: BTreeMap::new(),
        };
        let rows = OverlapRow::expand(&empty);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].competitor, None);

        let mut counts = BTreeMap::new();
        counts.insert("B".to_string(), 2);
        counts.insert("C".to_string(), 1);
        let full = OverlapRecord {
            branch,
            competitor_counts: counts,
        };
        let rows = OverlapRow::expand(&full);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].competitor, Some("B"));
        assert_eq!(rows[0].competitor_count, 2);
    }
}
