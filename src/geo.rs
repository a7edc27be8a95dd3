//! Great-circle distance and pairwise point search.
//!
//! Every analyzer measures distance through [`distance_meters`] and scans
//! candidate points through [`LinearScan`]. The scan is a plain O(n) loop per
//! origin; a grid or R-tree index can replace it behind the same methods.

use serde::Serialize;

/// Mean Earth radius used for every distance in the crate.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A validated latitude/longitude pair in decimal degrees.
///
/// Only constructible through [`GeoPoint::new`], so a value of this type is
/// always finite and inside the valid ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Returns `None` unless `latitude` is in `[-90, 90]` and `longitude` in
    /// `[-180, 180]`. NaN and infinities are rejected by the same range check.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude) {
            Some(Self {
                latitude,
                longitude,
            })
        } else {
            None
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Shorthand for [`distance_meters`].
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        distance_meters(*self, *other)
    }
}

/// Haversine distance between two points, in meters.
///
/// Symmetric, zero for identical points, never negative.
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // rounding can push h a hair above 1 for antipodal points
    let c = 2.0 * h.min(1.0).sqrt().asin();

    EARTH_RADIUS_METERS * c
}

/// Anything with a position that the scans can measure against.
pub trait Located {
    fn location(&self) -> GeoPoint;
}

impl Located for GeoPoint {
    fn location(&self) -> GeoPoint {
        *self
    }
}

/// Brute-force search over a borrowed slice of located items.
pub struct LinearScan<'a, T> {
    items: &'a [T],
}

impl<'a, T: Located> LinearScan<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Every item paired with its distance from `origin`, in slice order.
    pub fn distances(&self, origin: GeoPoint) -> impl Iterator<Item = (&'a T, f64)> + use<'a, T> {
        let items = self.items;
        items
            .iter()
            .map(move |item| (item, distance_meters(origin, item.location())))
    }

    /// Items whose distance from `origin` is at most `radius_meters`.
    pub fn within(
        &self,
        origin: GeoPoint,
        radius_meters: f64,
    ) -> impl Iterator<Item = (&'a T, f64)> + use<'a, T> {
        self.distances(origin)
            .filter(move |(_, d)| *d <= radius_meters)
    }

    /// Closest item to `origin`, or `None` for an empty slice.
    ///
    /// Ties keep the first item in slice order.
    pub fn nearest(&self, origin: GeoPoint) -> Option<(&'a T, f64)> {
        self.distances(origin).fold(None, |best, (item, d)| match best {
            Some((_, best_d)) if best_d <= d => best,
            _ => Some((item, d)),
        })
    }

    pub fn count_within(&self, origin: GeoPoint, radius_meters: f64) -> usize {
        self.within(origin, radius_meters).count()
    }
}
