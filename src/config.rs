//! Analysis configuration: radii, thresholds, zone boxes.
//!
//! Loaded from a JSON file with camelCase keys; every field has a default so
//! an empty object `{}` is a valid configuration:
//! ```json
//! {
//!   "accessibilityRadiusMeters": 400,
//!   "overlapRadiusMeters": 500,
//!   "gapRadiusMeters": 600,
//!   "highTrafficRouteThreshold": 10,
//!   "homeOwner": "PASHA Bank",
//!   "zoneBoundingBoxes": [
//!     { "name": "Center", "minLatitude": 40.36, "maxLatitude": 40.42,
//!       "minLongitude": 49.80, "maxLongitude": 49.90 }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::geo::GeoPoint;

/// Raised before any data is processed when the configuration is unusable.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a finite, non-negative number of meters (got {value})")]
    InvalidRadius { name: &'static str, value: f64 },

    #[error("zone box {name:?} is invalid: {reason}")]
    InvalidZone { name: String, reason: String },

    #[error("home owner must not be empty")]
    EmptyHomeOwner,
}

/// Checks a radius and hands it back unchanged when usable.
pub fn validate_radius(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidRadius { name, value })
    }
}

/// Axis-aligned latitude/longitude box naming a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneBox {
    pub name: String,
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl ZoneBox {
    pub fn new(
        name: impl Into<String>,
        (min_latitude, max_latitude): (f64, f64),
        (min_longitude, max_longitude): (f64, f64),
    ) -> Self {
        Self {
            name: name.into(),
            min_latitude,
            max_latitude,
            min_longitude,
            max_longitude,
        }
    }

    /// Inclusive on every edge.
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&point.latitude())
            && (self.min_longitude..=self.max_longitude).contains(&point.longitude())
    }

    fn encloses(&self, inner: &ZoneBox) -> bool {
        self.min_latitude <= inner.min_latitude
            && self.max_latitude >= inner.max_latitude
            && self.min_longitude <= inner.min_longitude
            && self.max_longitude >= inner.max_longitude
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidZone {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if GeoPoint::new(self.min_latitude, self.min_longitude).is_none()
            || GeoPoint::new(self.max_latitude, self.max_longitude).is_none()
        {
            return Err(invalid("corner outside valid coordinate range"));
        }
        if self.min_latitude > self.max_latitude {
            return Err(invalid("minLatitude is greater than maxLatitude"));
        }
        if self.min_longitude > self.max_longitude {
            return Err(invalid("minLongitude is greater than maxLongitude"));
        }
        Ok(())
    }
}

/// Central Baku, then the greater Baku area.
fn default_zone_boxes() -> Vec<ZoneBox> {
    vec![
        ZoneBox::new("Center", (40.360, 40.420), (49.800, 49.900)),
        ZoneBox::new("Greater Area", (40.280, 40.600), (49.650, 50.250)),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    /// Radius for "nearby" stop and route counts.
    pub accessibility_radius_meters: f64,
    /// Wider walking radius reported alongside the nearby count.
    pub extended_radius_meters: f64,
    pub overlap_radius_meters: f64,
    /// Radius for the "no home coverage" and "competitor present" tests.
    pub gap_radius_meters: f64,
    pub high_traffic_route_threshold: u32,
    pub home_owner: Option<String>,
    /// Most specific first.
    pub zone_bounding_boxes: Vec<ZoneBox>,
    /// Zone assigned when no box matches.
    pub fallback_zone: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            accessibility_radius_meters: 400.0,
            extended_radius_meters: 1_000.0,
            overlap_radius_meters: 500.0,
            gap_radius_meters: 600.0,
            high_traffic_route_threshold: 10,
            home_owner: None,
            zone_bounding_boxes: default_zone_boxes(),
            fallback_zone: "Regional".to_string(),
        }
    }
}

impl AnalysisConfig {
    /// Loads and validates the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {path}"))?;
        let config = Self::from_json(&content).with_context(|| format!("in config file {path}"))?;
        debug!(path, ?config, "Loaded analysis config");
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects negative or non-finite radii, malformed zone boxes and an
    /// empty home owner or fallback zone name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_radius("accessibilityRadiusMeters", self.accessibility_radius_meters)?;
        validate_radius("extendedRadiusMeters", self.extended_radius_meters)?;
        validate_radius("overlapRadiusMeters", self.overlap_radius_meters)?;
        validate_radius("gapRadiusMeters", self.gap_radius_meters)?;

        if let Some(home) = &self.home_owner {
            if home.trim().is_empty() {
                return Err(ConfigError::EmptyHomeOwner);
            }
        }

        if self.fallback_zone.trim().is_empty() {
            return Err(ConfigError::InvalidZone {
                name: self.fallback_zone.clone(),
                reason: "fallback zone name is empty".to_string(),
            });
        }

        for zone in &self.zone_bounding_boxes {
            zone.validate()?;
        }

        for pair in self.zone_bounding_boxes.windows(2) {
            if !pair[1].encloses(&pair[0]) {
                warn!(
                    inner = %pair[0].name,
                    outer = %pair[1].name,
                    "Zone box is not nested inside the next one; first match still wins"
                );
            }
        }

        Ok(())
    }

    /// Home owner from the config, failing when none was given.
    pub fn require_home_owner(&self) -> Result<&str, ConfigError> {
        match self.home_owner.as_deref() {
            Some(home) if !home.trim().is_empty() => Ok(home),
            _ => Err(ConfigError::EmptyHomeOwner),
        }
    }
}
