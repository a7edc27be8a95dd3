//! Expansion gaps: busy stops where competitors are present and the home
//! owner is not.

use tracing::debug;

use crate::analyzers::types::GapCandidate;
use crate::config::{AnalysisConfig, ConfigError, validate_radius};
use crate::geo::LinearScan;
use crate::model::{Branch, Stop};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapFinder {
    traffic_threshold: u32,
    radius_meters: f64,
}

impl GapFinder {
    pub fn new(traffic_threshold: u32, radius_meters: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            traffic_threshold,
            radius_meters: validate_radius("gapRadiusMeters", radius_meters)?,
        })
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        Self::new(config.high_traffic_route_threshold, config.gap_radius_meters)
    }

    /// Stops with `route_count >= threshold`, no home branch within the
    /// radius and at least one competitor branch within it.
    ///
    /// Sorted by route count descending, then competitor count descending;
    /// remaining ties keep stop input order.
    #[tracing::instrument(skip_all, fields(stops = stops.len(), home = home_branches.len(), competitors = competitor_branches.len()))]
    pub fn find(
        &self,
        stops: &[Stop],
        home_branches: &[Branch],
        competitor_branches: &[Branch],
    ) -> Vec<GapCandidate> {
        let home = LinearScan::new(home_branches);
        let competitors = LinearScan::new(competitor_branches);

        let busy: Vec<&Stop> = stops
            .iter()
            .filter(|s| s.route_count >= self.traffic_threshold)
            .collect();

        let mut gaps: Vec<GapCandidate> = busy
            .iter()
            .filter(|s| home.within(s.location, self.radius_meters).next().is_none())
            .filter_map(|s| {
                let competitors_nearby = competitors.count_within(s.location, self.radius_meters);
                (competitors_nearby > 0).then(|| GapCandidate {
                    stop: (*s).clone(),
                    competitors_nearby,
                })
            })
            .collect();

        // stable: equal keys stay in input order
        gaps.sort_by(|a, b| {
            b.stop
                .route_count
                .cmp(&a.stop.route_count)
                .then(b.competitors_nearby.cmp(&a.competitors_nearby))
        });

        debug!(busy = busy.len(), gaps = gaps.len(), "Gap search finished");
        gaps
    }
}

pub fn find_gaps(
    stops: &[Stop],
    home_branches: &[Branch],
    competitor_branches: &[Branch],
    traffic_threshold: u32,
    gap_radius_meters: f64,
) -> Result<Vec<GapCandidate>, ConfigError> {
    Ok(GapFinder::new(traffic_threshold, gap_radius_meters)?.find(
        stops,
        home_branches,
        competitor_branches,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;

    fn pt(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    /// Places `n` competitor branches right next to `p`.
    fn competitors_at(p: GeoPoint, n: usize) -> Vec<Branch> {
        (0..n)
            .map(|i| Branch::new("Rival", pt(p.latitude() + 0.0001 * i as f64, p.longitude())))
            .collect()
    }

    #[test]
    fn test_ordering_by_routes_then_competitors() {
        let a = pt(40.30, 49.70);
        let b = pt(40.35, 49.75);
        let c = pt(40.40, 49.80);
        let stops = vec![
            Stop::new("c", c).with_route_count(30),
            Stop::new("a", a).with_route_count(50),
            Stop::new("b", b).with_route_count(30),
        ];
        let mut competitors = competitors_at(a, 1);
        competitors.extend(competitors_at(b, 3));
        competitors.extend(competitors_at(c, 1));

        let gaps = find_gaps(&stops, &[], &competitors, 10, 600.0).unwrap();
        let order: Vec<(u32, usize)> = gaps
            .iter()
            .map(|g| (g.stop.route_count, g.competitors_nearby))
            .collect();

        assert_eq!(order, vec![(50, 1), (30, 3), (30, 1)]);
    }

    #[test]
    fn test_full_ties_keep_input_order() {
        let a = pt(40.30, 49.70);
        let b = pt(40.35, 49.75);
        let stops = vec![
            Stop::new("first", a).with_route_count(12),
            Stop::new("second", b).with_route_count(12),
        ];
        let mut competitors = competitors_at(a, 2);
        competitors.extend(competitors_at(b, 2));

        let gaps = find_gaps(&stops, &[], &competitors, 10, 600.0).unwrap();
        assert_eq!(gaps[0].stop.id.0, "first");
        assert_eq!(gaps[1].stop.id.0, "second");
    }

    #[test]
    fn test_filters() {
        let covered = pt(40.30, 49.70);
        let quiet = pt(40.35, 49.75);
        let empty = pt(40.40, 49.80);
        let open = pt(40.45, 49.85);
        let stops = vec![
            Stop::new("covered", covered).with_route_count(40),
            Stop::new("quiet", quiet).with_route_count(9),
            Stop::new("empty", empty).with_route_count(40),
            Stop::new("open", open).with_route_count(10),
        ];
        let home = vec![Branch::new("Home", pt(40.302, 49.70))];
        let mut competitors = competitors_at(covered, 2);
        competitors.extend(competitors_at(quiet, 2));
        competitors.extend(competitors_at(open, 1));

        let gaps = find_gaps(&stops, &home, &competitors, 10, 600.0).unwrap();

        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].stop.id.0, "open");
        assert_eq!(gaps[0].competitors_nearby, 1);
    }

    #[test]
    fn test_invalid_radius() {
        assert!(GapFinder::new(10, f64::NEG_INFINITY).is_err());
    }
}
