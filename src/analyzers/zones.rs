//! Named geographic zones by nested bounding boxes.

use std::collections::BTreeMap;

use crate::config::{AnalysisConfig, ConfigError, ZoneBox};
use crate::geo::GeoPoint;

/// Assigns a point to the first configured box containing it, or to the
/// fallback zone. Boxes are tried in configuration order, most specific
/// first.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneClassifier {
    boxes: Vec<ZoneBox>,
    fallback: String,
}

impl ZoneClassifier {
    pub fn new(boxes: Vec<ZoneBox>, fallback: impl Into<String>) -> Result<Self, ConfigError> {
        let fallback = fallback.into();
        if fallback.trim().is_empty() {
            return Err(ConfigError::InvalidZone {
                name: fallback,
                reason: "fallback zone name is empty".to_string(),
            });
        }
        for zone in &boxes {
            zone.validate()?;
        }
        Ok(Self { boxes, fallback })
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.zone_bounding_boxes.clone(),
            config.fallback_zone.clone(),
        )
    }

    pub fn classify(&self, point: GeoPoint) -> &str {
        self.boxes
            .iter()
            .find(|zone| zone.contains(point))
            .map_or(self.fallback.as_str(), |zone| zone.name.as_str())
    }

    /// Zone names in evaluation order, fallback last.
    pub fn zone_names(&self) -> impl Iterator<Item = &str> {
        self.boxes
            .iter()
            .map(|z| z.name.as_str())
            .chain(std::iter::once(self.fallback.as_str()))
    }

    /// zone -> owner -> number of located items.
    pub fn count_by_zone<'a>(
        &self,
        items: impl IntoIterator<Item = (&'a str, GeoPoint)>,
    ) -> BTreeMap<String, BTreeMap<String, usize>> {
        let mut counts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
        for (owner, location) in items {
            *counts
                .entry(self.classify(location).to_string())
                .or_default()
                .entry(owner.to_string())
                .or_default() += 1;
        }
        counts
    }
}
