use crate::geo::GeoPoint;

/// Axis-aligned geographic rectangle in degrees.
///
/// Always normalized: `min_lon <= max_lon` and `min_lat <= max_lat`.
/// Edges are inclusive on all four sides.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoBounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl GeoBounds {
    /// The whole geographic domain.
    pub const WORLD: GeoBounds = GeoBounds {
        min_lon: -180.0,
        min_lat: -90.0,
        max_lon: 180.0,
        max_lat: 90.0,
    };

    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Build a normalized box from two arbitrary corner points.
    pub fn from_corners(a: GeoPoint, b: GeoPoint) -> Self {
        Self {
            min_lon: a.lon_deg.min(b.lon_deg),
            min_lat: a.lat_deg.min(b.lat_deg),
            max_lon: a.lon_deg.max(b.lon_deg),
            max_lat: a.lat_deg.max(b.lat_deg),
        }
    }

    /// Inclusive containment on all edges.
    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lon_deg >= self.min_lon
            && p.lon_deg <= self.max_lon
            && p.lat_deg >= self.min_lat
            && p.lat_deg <= self.max_lat
    }

    /// True when the two boxes share at least an edge or a corner.
    pub fn intersects(&self, other: &GeoBounds) -> bool {
        self.min_lon <= other.max_lon
            && self.max_lon >= other.min_lon
            && self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
    }

    /// Smallest box covering both inputs.
    pub fn union(&self, other: &GeoBounds) -> GeoBounds {
        GeoBounds {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.min_lon.is_finite()
            && self.min_lat.is_finite()
            && self.max_lon.is_finite()
            && self.max_lat.is_finite()
    }
}
