use foundation::geo::GeoPoint;
use foundation::math::vec::Vec2;

/// Camera state of a map view.
///
/// A plain value: pan, zoom and resize produce a new `Viewport` rather
/// than mutating this one, and the query layer never retains it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    /// Geographic point the view is nominally centered on.
    pub center: GeoPoint,
    /// Magnification factor, 1.0 shows the unzoomed projection.
    pub zoom: f64,
    pub width_px: f64,
    pub height_px: f64,
    /// Pixel offset of the camera from the projected center, applied in
    /// zoomed screen space. Decouples marker anchoring from the visual
    /// center.
    pub offset_px: Vec2,
}

impl Viewport {
    pub fn new(center: GeoPoint, zoom: f64, width_px: f64, height_px: f64) -> Self {
        Self {
            center,
            zoom,
            width_px,
            height_px,
            offset_px: Vec2::new(0.0, 0.0),
        }
    }

    pub fn with_offset(mut self, offset_px: Vec2) -> Self {
        self.offset_px = offset_px;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::Viewport;
    use foundation::geo::GeoPoint;
    use foundation::math::vec::Vec2;

    #[test]
    fn offset_defaults_to_zero() {
        let vp = Viewport::new(GeoPoint::new(0.0, 0.0), 1.0, 800.0, 450.0);
        assert_eq!(vp.offset_px, Vec2::new(0.0, 0.0));
        let shifted = vp.with_offset(Vec2::new(10.0, -4.0));
        assert_eq!(shifted.offset_px, Vec2::new(10.0, -4.0));
        // The original is untouched; viewports are replaced, not mutated.
        assert_eq!(vp.offset_px, Vec2::new(0.0, 0.0));
    }
}
