//! Data types produced by the analysis pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::geo::GeoPoint;
use crate::model::{Branch, Stop, StopId};

/// How well a branch is served by transit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AccessibilityLevel {
    High,
    Medium,
    Low,
}

impl AccessibilityLevel {
    pub const ALL: [AccessibilityLevel; 3] = [
        AccessibilityLevel::High,
        AccessibilityLevel::Medium,
        AccessibilityLevel::Low,
    ];
}

impl fmt::Display for AccessibilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccessibilityLevel::High => "High",
            AccessibilityLevel::Medium => "Medium",
            AccessibilityLevel::Low => "Low",
        };
        f.write_str(label)
    }
}

/// Histogram bucket for the number of stops near a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum StopDensityBand {
    #[serde(rename = "0 stops")]
    None,
    #[serde(rename = "1-2 stops")]
    Sparse,
    #[serde(rename = "3-4 stops")]
    Moderate,
    #[serde(rename = "5-9 stops")]
    Dense,
    #[serde(rename = "10+ stops")]
    VeryDense,
}

/// Transit access for a single branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityRecord {
    pub owner: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub location: GeoPoint,
    /// Stops within the accessibility radius.
    pub nearby_stop_count: usize,
    /// Sum of route counts over the nearby stops.
    pub nearby_route_count: u64,
    /// Stops within the extended walking radius.
    pub extended_stop_count: usize,
    /// `None` when there are no stops at all.
    pub nearest_stop_distance_meters: Option<f64>,
    pub nearest_stop_id: Option<StopId>,
    pub level: AccessibilityLevel,
}

/// Competitors co-located with one home branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapRecord {
    pub branch: Branch,
    /// Only owners with at least one branch in range appear.
    pub competitor_counts: BTreeMap<String, usize>,
}

impl OverlapRecord {
    pub fn total_competitors(&self) -> usize {
        self.competitor_counts.values().sum()
    }
}

/// Per-competitor rollup across all home branches.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorOverlap {
    /// Competitor branches counted, summed over home branches.
    pub co_located_branches: usize,
    /// Home branches with at least one of this competitor's branches nearby.
    pub home_branches_affected: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapSummary {
    pub home_branch_count: usize,
    pub home_branches_without_competitors: usize,
    pub competitors: BTreeMap<String, CompetitorOverlap>,
}

/// A busy stop with competitor presence and no home branch nearby.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GapCandidate {
    pub stop: Stop,
    pub competitors_nearby: usize,
}

/// Per-owner rollup of accessibility records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub branch_count: usize,
    pub mean_nearby_stops: f64,
    pub mean_nearby_routes: f64,
    /// Over branches that have a nearest stop; `None` if none do.
    pub median_nearest_stop_distance: Option<f64>,
    pub mean_nearest_stop_distance: Option<f64>,
    pub levels: BTreeMap<AccessibilityLevel, usize>,
}

/// Whole-run summary handed to the charting layer as `report.json`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketReport {
    pub schema_version: u8,
    pub generated_at: DateTime<Utc>,
    pub total_branches: usize,
    pub levels: BTreeMap<AccessibilityLevel, usize>,
    /// category -> level -> branch count, for branches that carry a category
    pub levels_by_category: BTreeMap<String, BTreeMap<AccessibilityLevel, usize>>,
    pub mean_nearest_stop_distance: Option<f64>,
    /// `None` only when there are no branches.
    pub mean_nearby_stops: Option<f64>,
    pub branches_without_nearby_stops: usize,
    pub branches_with_five_plus_stops: usize,
    pub density_bands: BTreeMap<StopDensityBand, usize>,
    /// zone -> owner -> branch count
    pub zones: BTreeMap<String, BTreeMap<String, usize>>,
    pub owners: BTreeMap<String, OwnerSummary>,
}
