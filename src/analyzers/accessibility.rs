//! Nearest-stop distance and nearby stop/route counts per branch.

use tracing::debug;

use crate::analyzers::level::accessibility_level;
use crate::analyzers::types::AccessibilityRecord;
use crate::config::{AnalysisConfig, ConfigError, validate_radius};
use crate::geo::LinearScan;
use crate::model::{Branch, Stop};

pub const DEFAULT_EXTENDED_RADIUS_METERS: f64 = 1_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccessibilityAnalyzer {
    radius_meters: f64,
    extended_radius_meters: f64,
}

impl AccessibilityAnalyzer {
    /// The extended radius defaults to 1 km, or `radius_meters` if larger.
    pub fn new(radius_meters: f64) -> Result<Self, ConfigError> {
        let radius_meters = validate_radius("accessibilityRadiusMeters", radius_meters)?;
        Ok(Self {
            radius_meters,
            extended_radius_meters: DEFAULT_EXTENDED_RADIUS_METERS.max(radius_meters),
        })
    }

    /// Never below the accessibility radius, so `extended_stop_count` always
    /// includes every nearby stop.
    pub fn with_extended_radius(mut self, meters: f64) -> Result<Self, ConfigError> {
        self.extended_radius_meters =
            validate_radius("extendedRadiusMeters", meters)?.max(self.radius_meters);
        Ok(self)
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        Self::new(config.accessibility_radius_meters)?
            .with_extended_radius(config.extended_radius_meters)
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    /// One record per branch, in branch order.
    ///
    /// Counts and the nearest distance do not depend on stop order. When two
    /// stops are exactly equally near, `nearest_stop_id` is the earlier one.
    #[tracing::instrument(skip_all, fields(branches = branches.len(), stops = stops.len()))]
    pub fn analyze(&self, branches: &[Branch], stops: &[Stop]) -> Vec<AccessibilityRecord> {
        let scan = LinearScan::new(stops);
        let records: Vec<_> = branches.iter().map(|b| self.record_for(b, &scan)).collect();

        debug!(
            with_nearby = records.iter().filter(|r| r.nearby_stop_count > 0).count(),
            "Accessibility computed"
        );
        records
    }

    fn record_for(&self, branch: &Branch, scan: &LinearScan<'_, Stop>) -> AccessibilityRecord {
        let mut nearest: Option<(&Stop, f64)> = None;
        let mut nearby_stop_count = 0;
        let mut nearby_route_count = 0u64;
        let mut extended_stop_count = 0;

        for (stop, d) in scan.distances(branch.location) {
            if nearest.is_none_or(|(_, best)| d < best) {
                nearest = Some((stop, d));
            }
            if d <= self.radius_meters {
                nearby_stop_count += 1;
                nearby_route_count += u64::from(stop.route_count);
            }
            if d <= self.extended_radius_meters {
                extended_stop_count += 1;
            }
        }

        let nearest_stop_distance_meters = nearest.map(|(_, d)| d);

        AccessibilityRecord {
            owner: branch.owner.clone(),
            name: branch.name.clone(),
            category: branch.category.clone(),
            location: branch.location,
            nearby_stop_count,
            nearby_route_count,
            extended_stop_count,
            nearest_stop_distance_meters,
            nearest_stop_id: nearest.map(|(s, _)| s.id.clone()),
            level: accessibility_level(
                nearby_stop_count,
                nearest_stop_distance_meters,
                self.radius_meters,
            ),
        }
    }
}

/// Accessibility for every branch with the given radius.
pub fn compute_accessibility(
    branches: &[Branch],
    stops: &[Stop],
    radius_meters: f64,
) -> Result<Vec<AccessibilityRecord>, ConfigError> {
    Ok(AccessibilityAnalyzer::new(radius_meters)?.analyze(branches, stops))
}
