use std::fmt;

use foundation::bounds::GeoBounds;
use foundation::geo::GeoPoint;
use foundation::math::projection::{ProjectionConfig, WorldProjection};
use foundation::math::vec::Vec2;

use crate::camera::Viewport;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewportError {
    InvalidZoom { zoom: f64 },
    InvalidViewportSize { width_px: f64, height_px: f64 },
    InvalidProjectionConfig,
}

impl fmt::Display for ViewportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewportError::InvalidZoom { zoom } => {
                write!(f, "zoom must be finite and positive, got {zoom}")
            }
            ViewportError::InvalidViewportSize {
                width_px,
                height_px,
            } => {
                write!(
                    f,
                    "viewport size must be finite and positive, got {width_px}x{height_px}"
                )
            }
            ViewportError::InvalidProjectionConfig => {
                write!(f, "projection config has non-finite or non-positive parameters")
            }
        }
    }
}

impl std::error::Error for ViewportError {}

fn validate(viewport: &Viewport, config: &ProjectionConfig) -> Result<(), ViewportError> {
    if !viewport.zoom.is_finite() || viewport.zoom <= 0.0 {
        return Err(ViewportError::InvalidZoom {
            zoom: viewport.zoom,
        });
    }
    if !viewport.width_px.is_finite()
        || viewport.width_px <= 0.0
        || !viewport.height_px.is_finite()
        || viewport.height_px <= 0.0
    {
        return Err(ViewportError::InvalidViewportSize {
            width_px: viewport.width_px,
            height_px: viewport.height_px,
        });
    }
    if !config.is_valid() {
        return Err(ViewportError::InvalidProjectionConfig);
    }
    Ok(())
}

/// The camera's pixel position: the projected center nudged by the pan
/// offset, which shrinks as the view zooms in.
fn camera_px(viewport: &Viewport, proj: &WorldProjection) -> Vec2 {
    proj.project(viewport.center) + viewport.offset_px * (1.0 / viewport.zoom)
}

/// Geographic box covering everything the viewport shows.
///
/// When a corner of the view falls off the projected globe the box
/// degrades to `GeoBounds::WORLD`: over-inclusion is acceptable, dropped
/// markers are not. A view straddling the date line also degrades to the
/// single spanning box; use [`visible_regions`] to split it instead.
pub fn visible_bounds(
    viewport: &Viewport,
    config: &ProjectionConfig,
) -> Result<GeoBounds, ViewportError> {
    validate(viewport, config)?;
    let proj = WorldProjection::new(config, viewport.width_px, viewport.height_px);
    let camera = camera_px(viewport, &proj);
    let half = Vec2::new(viewport.width_px, viewport.height_px) * (0.5 / viewport.zoom);

    match (proj.unproject(camera - half), proj.unproject(camera + half)) {
        (Ok(a), Ok(b)) => Ok(GeoBounds::from_corners(a, b)),
        _ => Ok(GeoBounds::WORLD),
    }
}

/// The geographic point actually at the middle of the view.
///
/// Differs from `viewport.center` whenever a pan offset is set. Falls
/// back to `viewport.center` when the camera point has no geographic
/// counterpart, so marker placement never errors.
pub fn effective_center(
    viewport: &Viewport,
    config: &ProjectionConfig,
) -> Result<GeoPoint, ViewportError> {
    validate(viewport, config)?;
    let proj = WorldProjection::new(config, viewport.width_px, viewport.height_px);
    let camera = camera_px(viewport, &proj);
    Ok(proj.unproject(camera).unwrap_or(viewport.center))
}

/// Antimeridian-aware variant of [`visible_bounds`].
///
/// Yields one box normally. When the view crosses the date line, which
/// shows up as the unprojected west corner lying east of the east corner,
/// it yields two disjoint boxes meeting at longitude 180.
pub fn visible_regions(
    viewport: &Viewport,
    config: &ProjectionConfig,
) -> Result<Vec<GeoBounds>, ViewportError> {
    validate(viewport, config)?;
    let proj = WorldProjection::new(config, viewport.width_px, viewport.height_px);
    let camera = camera_px(viewport, &proj);
    let half = Vec2::new(viewport.width_px, viewport.height_px) * (0.5 / viewport.zoom);

    let nw = proj.unproject(camera - half);
    let se = proj.unproject(camera + half);
    let (Ok(nw), Ok(se)) = (nw, se) else {
        return Ok(vec![GeoBounds::WORLD]);
    };

    let min_lat = nw.lat_deg.min(se.lat_deg);
    let max_lat = nw.lat_deg.max(se.lat_deg);
    if nw.lon_deg > se.lon_deg {
        Ok(vec![
            GeoBounds::new(nw.lon_deg, min_lat, 180.0, max_lat),
            GeoBounds::new(-180.0, min_lat, se.lon_deg, max_lat),
        ])
    } else {
        Ok(vec![GeoBounds::new(nw.lon_deg, min_lat, se.lon_deg, max_lat)])
    }
}

#[cfg(test)]
mod tests {
    use super::{ViewportError, effective_center, visible_bounds, visible_regions};
    use crate::camera::Viewport;
    use foundation::bounds::GeoBounds;
    use foundation::geo::GeoPoint;
    use foundation::math::projection::ProjectionConfig;
    use foundation::math::vec::Vec2;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn atlas_config() -> ProjectionConfig {
        ProjectionConfig {
            scale: 3000.0,
            ..ProjectionConfig::default()
        }
    }

    #[test]
    fn world_view_straddles_both_axes() {
        let vp = Viewport::new(GeoPoint::new(0.0, 0.0), 1.0, 800.0, 450.0);
        let bounds = visible_bounds(&vp, &atlas_config()).unwrap();
        assert!(bounds.min_lon < 0.0 && bounds.max_lon > 0.0);
        assert!(bounds.min_lat < 0.0 && bounds.max_lat > 0.0);
        assert_close(bounds.max_lon, 10.26, 0.1);
        assert_close(bounds.min_lon, -10.26, 0.1);
        assert_close(bounds.max_lat, 5.03, 0.1);
        assert_close(bounds.min_lat, -5.03, 0.1);
    }

    #[test]
    fn doubling_zoom_halves_the_spans() {
        let config = atlas_config();
        let center = GeoPoint::new(13.405, 52.52);
        let at = |zoom: f64| {
            visible_bounds(&Viewport::new(center, zoom, 800.0, 450.0), &config).unwrap()
        };
        let coarse = at(2.0);
        let fine = at(4.0);
        let lon_ratio = coarse.lon_span() / fine.lon_span();
        let lat_ratio = coarse.lat_span() / fine.lat_span();
        assert_close(lon_ratio, 2.0, 0.02);
        assert_close(lat_ratio, 2.0, 0.02);
    }

    #[test]
    fn bounds_shrink_monotonically_with_zoom() {
        let config = atlas_config();
        let center = GeoPoint::new(-30.0, 20.0);
        let mut prev = visible_bounds(&Viewport::new(center, 1.0, 800.0, 450.0), &config).unwrap();
        for zoom in [2.0, 4.0, 8.0, 16.0] {
            let next =
                visible_bounds(&Viewport::new(center, zoom, 800.0, 450.0), &config).unwrap();
            assert!(next.lon_span() < prev.lon_span());
            assert!(next.lat_span() < prev.lat_span());
            prev = next;
        }
    }

    #[test]
    fn effective_center_stays_inside_the_bounds() {
        let config = atlas_config();
        let vp = Viewport::new(GeoPoint::new(13.405, 52.52), 4.0, 800.0, 450.0)
            .with_offset(Vec2::new(120.0, -60.0));
        let bounds = visible_bounds(&vp, &config).unwrap();
        let center = effective_center(&vp, &config).unwrap();
        assert!(bounds.contains(center));
        // The pan offset decouples the camera from the nominal center.
        assert!((center.lon_deg - vp.center.lon_deg).abs() > 1e-6);
    }

    #[test]
    fn zero_offset_keeps_the_nominal_center() {
        let config = atlas_config();
        let vp = Viewport::new(GeoPoint::new(13.405, 52.52), 4.0, 800.0, 450.0);
        let center = effective_center(&vp, &config).unwrap();
        assert_close(center.lon_deg, 13.405, 1e-9);
        assert_close(center.lat_deg, 52.52, 1e-9);
    }

    #[test]
    fn off_globe_corners_fall_back_to_the_world() {
        let config = ProjectionConfig::default();
        let vp = Viewport::new(GeoPoint::new(0.0, 0.0), 0.1, 800.0, 450.0);
        let bounds = visible_bounds(&vp, &config).unwrap();
        assert_eq!(bounds, GeoBounds::WORLD);
        let regions = visible_regions(&vp, &config).unwrap();
        assert_eq!(regions, vec![GeoBounds::WORLD]);
    }

    #[test]
    fn rejects_invalid_inputs() {
        let config = atlas_config();
        let good = Viewport::new(GeoPoint::new(0.0, 0.0), 1.0, 800.0, 450.0);

        let mut vp = good;
        vp.zoom = 0.0;
        assert!(matches!(
            visible_bounds(&vp, &config),
            Err(ViewportError::InvalidZoom { .. })
        ));

        let mut vp = good;
        vp.width_px = -800.0;
        assert!(matches!(
            visible_bounds(&vp, &config),
            Err(ViewportError::InvalidViewportSize { .. })
        ));

        let mut bad_config = config;
        bad_config.scale = f64::NAN;
        assert!(matches!(
            visible_bounds(&good, &bad_config),
            Err(ViewportError::InvalidProjectionConfig)
        ));

        bad_config.scale = -100.0;
        assert!(matches!(
            visible_bounds(&good, &bad_config),
            Err(ViewportError::InvalidProjectionConfig)
        ));
    }

    #[test]
    fn date_line_views_split_into_two_regions() {
        let config = ProjectionConfig {
            scale: 1000.0,
            rotation_deg: [-180.0, 0.0, 0.0],
            ..ProjectionConfig::default()
        };
        let vp = Viewport::new(GeoPoint::new(180.0, 0.0), 1.0, 800.0, 450.0);

        let regions = visible_regions(&vp, &config).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].max_lon, 180.0);
        assert_eq!(regions[1].min_lon, -180.0);
        assert!(regions[0].min_lon > 140.0);
        assert!(regions[1].max_lon < -140.0);
        assert!(regions[0].contains(GeoPoint::new(160.0, 0.0)));
        assert!(regions[1].contains(GeoPoint::new(-160.0, 0.0)));

        // The single-box calculator keeps the original spanning behavior.
        let single = visible_bounds(&vp, &config).unwrap();
        assert!(single.min_lon < single.max_lon);
    }

    #[test]
    fn ordinary_views_stay_a_single_region() {
        let vp = Viewport::new(GeoPoint::new(13.405, 52.52), 2.0, 800.0, 450.0);
        let regions = visible_regions(&vp, &atlas_config()).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0], visible_bounds(&vp, &atlas_config()).unwrap());
    }
}
