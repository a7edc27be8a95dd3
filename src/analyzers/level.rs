use crate::analyzers::types::{AccessibilityLevel, StopDensityBand};

/// Classifies a branch by the stops around it.
///
/// | Condition                                          | Level  |
/// |----------------------------------------------------|--------|
/// | >= 3 stops within the radius                       | High   |
/// | >= 1 stop within the radius, or nearest <= radius  | Medium |
/// | otherwise                                          | Low    |
pub fn accessibility_level(
    nearby_stops: usize,
    nearest_stop_meters: Option<f64>,
    radius_meters: f64,
) -> AccessibilityLevel {
    match nearby_stops {
        n if n >= 3 => AccessibilityLevel::High,
        n if n >= 1 => AccessibilityLevel::Medium,
        _ if nearest_stop_meters.is_some_and(|d| d <= radius_meters) => AccessibilityLevel::Medium,
        _ => AccessibilityLevel::Low,
    }
}

/// Buckets a nearby-stop count: 0, 1-2, 3-4, 5-9, 10+.
pub fn density_band(nearby_stops: usize) -> StopDensityBand {
    match nearby_stops {
        0 => StopDensityBand::None,
        1..=2 => StopDensityBand::Sparse,
        3..=4 => StopDensityBand::Moderate,
        5..=9 => StopDensityBand::Dense,
        _ => StopDensityBand::VeryDense,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries() {
        assert_eq!(accessibility_level(5, Some(10.0), 400.0), AccessibilityLevel::High);
        assert_eq!(accessibility_level(3, Some(10.0), 400.0), AccessibilityLevel::High);
        assert_eq!(accessibility_level(2, Some(10.0), 400.0), AccessibilityLevel::Medium);
        assert_eq!(accessibility_level(1, Some(399.0), 400.0), AccessibilityLevel::Medium);
        assert_eq!(accessibility_level(0, Some(400.0), 400.0), AccessibilityLevel::Medium);
        assert_eq!(accessibility_level(0, Some(401.0), 400.0), AccessibilityLevel::Low);
        assert_eq!(accessibility_level(0, None, 400.0), AccessibilityLevel::Low);
    }

    #[test]
    fn test_density_band_boundaries() {
        assert_eq!(density_band(0), StopDensityBand::None);
        assert_eq!(density_band(1), StopDensityBand::Sparse);
        assert_eq!(density_band(2), StopDensityBand::Sparse);
        assert_eq!(density_band(3), StopDensityBand::Moderate);
        assert_eq!(density_band(4), StopDensityBand::Moderate);
        assert_eq!(density_band(5), StopDensityBand::Dense);
        assert_eq!(density_band(9), StopDensityBand::Dense);
        assert_eq!(density_band(10), StopDensityBand::VeryDense);
        assert_eq!(density_band(250), StopDensityBand::VeryDense);
    }
}
