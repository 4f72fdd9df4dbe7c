use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};
use std::fmt;

use crate::geo::GeoPoint;
use crate::math::rotation::SphereRotation;
use crate::math::vec::Vec2;

/// Raw Times projection coefficients.
const TIMES_LON_BASE: f64 = 0.74482;
const TIMES_LON_SHRINK: f64 = 0.34588;
const TIMES_LAT_SCALE: f64 = 1.70711;

/// Parameters of a world projection.
///
/// Immutable: two equal configs built against the same viewport size yield
/// interchangeable projections.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProjectionConfig {
    /// Pixels per unscaled projection unit.
    pub scale: f64,
    /// Horizontal shift of the projection origin, in pixels.
    pub x_offset: f64,
    /// Vertical shift of the projection origin, in pixels.
    pub y_offset: f64,
    /// Globe reorientation `[lambda, phi, gamma]` in degrees, applied
    /// before the raw projection.
    pub rotation_deg: [f64; 3],
    /// Round-trip tolerance in degrees; also the slack allowed when an
    /// inverted pixel lands just outside the geographic domain.
    pub precision_deg: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            scale: 160.0,
            x_offset: 0.0,
            y_offset: 0.0,
            rotation_deg: [0.0, 0.0, 0.0],
            precision_deg: 0.1,
        }
    }
}

impl ProjectionConfig {
    /// True when every parameter is finite, `scale` is positive and the
    /// precision is non-negative.
    pub fn is_valid(&self) -> bool {
        self.scale.is_finite()
            && self.scale > 0.0
            && self.x_offset.is_finite()
            && self.y_offset.is_finite()
            && self.rotation_deg.iter().all(|v| v.is_finite())
            && self.precision_deg.is_finite()
            && self.precision_deg >= 0.0
    }
}

/// Inversion failure: the pixel does not correspond to any point of the
/// geographic domain.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionError {
    OutOfRange { x_px: f64, y_px: f64 },
}

impl fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionError::OutOfRange { x_px, y_px } => {
                write!(f, "pixel ({x_px}, {y_px}) inverts outside the geographic domain")
            }
        }
    }
}

impl std::error::Error for ProjectionError {}

/// Times-style world projection anchored to a pixel viewport.
///
/// The pipeline is rotate, raw Times, then scale and translate; screen y
/// grows downward. The translation origin is fixed at construction from
/// the config offsets and the viewport size.
#[derive(Debug, Clone)]
pub struct WorldProjection {
    rotation: SphereRotation,
    scale: f64,
    tx: f64,
    ty: f64,
    domain_slack_rad: f64,
}

impl WorldProjection {
    /// Build a projection for a `width_px` by `height_px` viewport.
    ///
    /// The config is taken at face value; callers validate with
    /// [`ProjectionConfig::is_valid`] first.
    pub fn new(config: &ProjectionConfig, width_px: f64, height_px: f64) -> Self {
        Self {
            rotation: SphereRotation::from_degrees(config.rotation_deg),
            scale: config.scale,
            tx: config.x_offset + width_px / 2.0,
            ty: config.y_offset + height_px / 2.0,
            domain_slack_rad: config.precision_deg.to_radians(),
        }
    }

    /// Geographic point to screen pixels.
    pub fn project(&self, p: GeoPoint) -> Vec2 {
        let rotated = self.rotation.forward(p);
        let (raw_x, raw_y) = times_forward(
            rotated.lon_deg.to_radians(),
            rotated.lat_deg.to_radians(),
        );
        Vec2::new(self.tx + self.scale * raw_x, self.ty - self.scale * raw_y)
    }

    /// Screen pixels back to a geographic point.
    ///
    /// Fails with `OutOfRange` when the raw inversion leaves the
    /// geographic domain by more than the configured precision. Values
    /// inside the slack band are clamped onto the domain edge before the
    /// inverse rotation runs.
    pub fn unproject(&self, px: Vec2) -> Result<GeoPoint, ProjectionError> {
        let raw_x = (px.x - self.tx) / self.scale;
        let raw_y = (self.ty - px.y) / self.scale;
        let (lon_rad, lat_rad) = times_inverse(raw_x, raw_y);

        if lon_rad.abs() > PI + self.domain_slack_rad
            || lat_rad.abs() > FRAC_PI_2 + self.domain_slack_rad
        {
            return Err(ProjectionError::OutOfRange {
                x_px: px.x,
                y_px: px.y,
            });
        }

        let lon = lon_rad.clamp(-PI, PI);
        let lat = lat_rad.clamp(-FRAC_PI_2, FRAC_PI_2);
        Ok(self
            .rotation
            .inverse(GeoPoint::new(lon.to_degrees(), lat.to_degrees())))
    }
}

/// Raw Times forward formula, radians in, unscaled planar units out.
fn times_forward(lon_rad: f64, lat_rad: f64) -> (f64, f64) {
    let t = (lat_rad / 2.0).tan();
    let s = (FRAC_PI_4 * t).sin();
    (
        lon_rad * (TIMES_LON_BASE - TIMES_LON_SHRINK * s * s),
        TIMES_LAT_SCALE * t,
    )
}

/// Closed-form inverse of [`times_forward`].
///
/// The longitude denominator stays positive for every `t`, so the
/// division is always defined.
fn times_inverse(x: f64, y: f64) -> (f64, f64) {
    let t = y / TIMES_LAT_SCALE;
    let s = (FRAC_PI_4 * t).sin();
    (
        x / (TIMES_LON_BASE - TIMES_LON_SHRINK * s * s),
        2.0 * t.atan(),
    )
}
