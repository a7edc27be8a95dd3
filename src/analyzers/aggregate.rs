use crate::analyzers::level::density_band;
use crate::analyzers::types::{AccessibilityLevel, AccessibilityRecord, MarketReport, OwnerSummary};
use crate::analyzers::utility::{mean, median};
use crate::analyzers::zones::ZoneClassifier;
use chrono::Utc;
use std::collections::BTreeMap;

/// Nearby-stop count from which a branch counts as stop-rich in the report.
const STOP_RICH_THRESHOLD: usize = 5;

/// Rolls accessibility records up per owner.
///
/// Owners only appear when they have at least one record, so every mean is
/// over a non-empty set. Distance statistics skip branches with no nearest
/// stop and are `None` when no branch of the owner has one.
pub fn summarize_by_owner(records: &[AccessibilityRecord]) -> BTreeMap<String, OwnerSummary> {
    let mut by_owner: BTreeMap<&str, Vec<&AccessibilityRecord>> = BTreeMap::new();
    for record in records {
        by_owner.entry(record.owner.as_str()).or_default().push(record);
    }

    by_owner
        .into_iter()
        .map(|(owner, rows)| (owner.to_string(), summarize_rows(&rows)))
        .collect()
}

fn summarize_rows(rows: &[&AccessibilityRecord]) -> OwnerSummary {
    let stops: Vec<f64> = rows.iter().map(|r| r.nearby_stop_count as f64).collect();
    let routes: Vec<f64> = rows.iter().map(|r| r.nearby_route_count as f64).collect();
    let distances: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.nearest_stop_distance_meters)
        .collect();

    OwnerSummary {
        branch_count: rows.len(),
        mean_nearby_stops: mean(&stops).unwrap_or_default(),
        mean_nearby_routes: mean(&routes).unwrap_or_default(),
        median_nearest_stop_distance: median(&distances),
        mean_nearest_stop_distance: mean(&distances),
        levels: level_counts(rows.iter().copied()),
    }
}

/// Counts records per level. Every level is present, possibly with zero.
fn level_counts<'a>(
    records: impl Iterator<Item = &'a AccessibilityRecord>,
) -> BTreeMap<AccessibilityLevel, usize> {
    let mut counts: BTreeMap<AccessibilityLevel, usize> =
        AccessibilityLevel::ALL.iter().map(|l| (*l, 0)).collect();
    for record in records {
        *counts.entry(record.level).or_default() += 1;
    }
    counts
}

/// Builds the whole-run report from accessibility records.
pub fn build_report(records: &[AccessibilityRecord], zones: &ZoneClassifier) -> MarketReport {
    let distances: Vec<f64> = records
        .iter()
        .filter_map(|r| r.nearest_stop_distance_meters)
        .collect();

    let nearby: Vec<f64> = records.iter().map(|r| r.nearby_stop_count as f64).collect();

    let mut density_bands = BTreeMap::new();
    for record in records {
        *density_bands
            .entry(density_band(record.nearby_stop_count))
            .or_default() += 1;
    }

    let mut by_category: BTreeMap<&str, Vec<&AccessibilityRecord>> = BTreeMap::new();
    for record in records {
        if let Some(category) = record.category.as_deref() {
            by_category.entry(category).or_default().push(record);
        }
    }

    MarketReport {
        schema_version: 1,
        generated_at: Utc::now(),
        total_branches: records.len(),
        levels: level_counts(records.iter()),
        levels_by_category: by_category
            .into_iter()
            .map(|(category, rows)| (category.to_string(), level_counts(rows.into_iter())))
            .collect(),
        mean_nearest_stop_distance: mean(&distances),
        mean_nearby_stops: mean(&nearby),
        branches_without_nearby_stops: records.iter().filter(|r| r.nearby_stop_count == 0).count(),
        branches_with_five_plus_stops: records
            .iter()
            .filter(|r| r.nearby_stop_count >= STOP_RICH_THRESHOLD)
            .count(),
        density_bands,
        zones: zones.count_by_zone(records.iter().map(|r| (r.owner.as_str(), r.location))),
        owners: summarize_by_owner(records),
    }
}
