use std::f64::consts::PI;

use crate::geo::GeoPoint;

/// Three-axis spherical rotation used to reorient the globe before
/// projecting.
///
/// Angles follow the usual cartographic convention: `lambda` spins the
/// globe around its axis, `phi` tilts it toward the viewer, `gamma` rolls
/// the view. `inverse` undoes `forward` exactly (up to float rounding).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SphereRotation {
    delta_lambda_rad: f64,
    sin_phi: f64,
    cos_phi: f64,
    sin_gamma: f64,
    cos_gamma: f64,
    identity: bool,
}

impl SphereRotation {
    /// Build a rotation from `[lambda, phi, gamma]` in degrees.
    pub fn from_degrees(rotation_deg: [f64; 3]) -> Self {
        let [dl, dp, dg] = rotation_deg;
        let identity = dl == 0.0 && dp == 0.0 && dg == 0.0;
        let (sin_phi, cos_phi) = dp.to_radians().sin_cos();
        let (sin_gamma, cos_gamma) = dg.to_radians().sin_cos();
        Self {
            delta_lambda_rad: dl.to_radians(),
            sin_phi,
            cos_phi,
            sin_gamma,
            cos_gamma,
            identity,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Rotate a geographic point into the projection frame.
    pub fn forward(&self, p: GeoPoint) -> GeoPoint {
        if self.identity {
            return p;
        }
        let lon = normalize_lon_rad(p.lon_deg.to_radians() + self.delta_lambda_rad);
        let lat = p.lat_deg.to_radians();

        let cos_lat = lat.cos();
        let x = lon.cos() * cos_lat;
        let y = lon.sin() * cos_lat;
        let z = lat.sin();

        let k = z * self.cos_phi + x * self.sin_phi;
        let lon_r = (y * self.cos_gamma - k * self.sin_gamma)
            .atan2(x * self.cos_phi - z * self.sin_phi);
        let lat_r = clamped_asin(k * self.cos_gamma + y * self.sin_gamma);

        GeoPoint::new(lon_r.to_degrees(), lat_r.to_degrees())
    }

    /// Rotate a projection-frame point back to geographic coordinates.
    pub fn inverse(&self, p: GeoPoint) -> GeoPoint {
        if self.identity {
            return p;
        }
        let lon = p.lon_deg.to_radians();
        let lat = p.lat_deg.to_radians();

        let cos_lat = lat.cos();
        let x = lon.cos() * cos_lat;
        let y = lon.sin() * cos_lat;
        let z = lat.sin();

        let k = z * self.cos_gamma - y * self.sin_gamma;
        let lon_r = (y * self.cos_gamma + z * self.sin_gamma)
            .atan2(x * self.cos_phi + k * self.sin_phi);
        let lat_r = clamped_asin(k * self.cos_phi - x * self.sin_phi);

        GeoPoint::new(
            normalize_lon_rad(lon_r - self.delta_lambda_rad).to_degrees(),
            lat_r.to_degrees(),
        )
    }
}

/// Wrap a longitude in radians into `(-pi, pi]`.
fn normalize_lon_rad(lon: f64) -> f64 {
    if lon > PI {
        lon - 2.0 * PI
    } else if lon <= -PI {
        lon + 2.0 * PI
    } else {
        lon
    }
}

/// `asin` with its argument clamped against rounding just outside `[-1, 1]`.
fn clamped_asin(v: f64) -> f64 {
    v.clamp(-1.0, 1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::SphereRotation;
    use crate::geo::GeoPoint;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn identity_rotation_is_a_no_op() {
        let rot = SphereRotation::from_degrees([0.0, 0.0, 0.0]);
        assert!(rot.is_identity());
        let p = GeoPoint::new(12.5, -33.0);
        assert_eq!(rot.forward(p), p);
        assert_eq!(rot.inverse(p), p);
    }

    #[test]
    fn lambda_only_rotation_shifts_longitude() {
        let rot = SphereRotation::from_degrees([-90.0, 0.0, 0.0]);
        let p = rot.forward(GeoPoint::new(100.0, 15.0));
        assert_close(p.lon_deg, 10.0, 1e-12);
        assert_close(p.lat_deg, 15.0, 1e-12);
    }

    #[test]
    fn lambda_rotation_wraps_across_the_date_line() {
        let rot = SphereRotation::from_degrees([-180.0, 0.0, 0.0]);
        let p = rot.forward(GeoPoint::new(170.0, 0.0));
        assert_close(p.lon_deg, -10.0, 1e-12);
    }

    #[test]
    fn round_trips_general_rotation() {
        let rot = SphereRotation::from_degrees([20.0, -30.0, 10.0]);
        for &(lon, lat) in &[
            (0.0, 0.0),
            (100.0, 45.0),
            (-170.0, -80.0),
            (12.3, -45.6),
        ] {
            let p = GeoPoint::new(lon, lat);
            let rt = rot.inverse(rot.forward(p));
            assert_close(rt.lon_deg, lon, 1e-9);
            assert_close(rt.lat_deg, lat, 1e-9);
        }
    }

    #[test]
    fn phi_rotation_moves_the_pole() {
        // Tilting by -90 brings the north pole to the center.
        let rot = SphereRotation::from_degrees([0.0, -90.0, 0.0]);
        let p = rot.forward(GeoPoint::new(0.0, 90.0));
        assert_close(p.lat_deg, 0.0, 1e-9);
    }
}
