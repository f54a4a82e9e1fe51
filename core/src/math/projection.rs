//! WGS84 to UTM forward projection (Krüger series, third order).

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const UTM_SCALE: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Transverse Mercator parameters for one UTM zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    central_meridian: f64,
    false_northing: f64,
    rectifying_radius: f64,
    eccentricity: f64,
    alpha: [f64; 3],
}

impl TransverseMercator {
    pub fn utm(zone: u8, northern: bool) -> Self {
        let n = WGS84_F / (2.0 - WGS84_F);
        let n2 = n * n;
        let n3 = n2 * n;
        Self {
            central_meridian: (-183.0 + 6.0 * f64::from(zone)).to_radians(),
            false_northing: if northern { 0.0 } else { FALSE_NORTHING_SOUTH },
            rectifying_radius: WGS84_A / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0),
            eccentricity: (WGS84_F * (2.0 - WGS84_F)).sqrt(),
            alpha: [
                n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
                13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
                61.0 * n3 / 240.0,
            ],
        }
    }

    /// Central meridian of the zone, in degrees.
    pub fn central_meridian_deg(&self) -> f64 {
        self.central_meridian.to_degrees()
    }

    /// Projects geodetic degrees to `(easting, northing)` in meters.
    pub fn forward(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let phi = lat_deg.to_radians();
        let lambda = lon_deg.to_radians() - self.central_meridian;
        let e = self.eccentricity;

        // conformal latitude
        let t = (phi.sin().atanh() - e * (e * phi.sin()).atanh()).sinh();
        let xi_prime = t.atan2(lambda.cos());
        let eta_prime = (lambda.sin() / (1.0 + t * t).sqrt()).atanh();

        let mut xi = xi_prime;
        let mut eta = eta_prime;
        for (j, alpha) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi += alpha * (k * xi_prime).sin() * (k * eta_prime).cosh();
            eta += alpha * (k * xi_prime).cos() * (k * eta_prime).sinh();
        }

        let easting = FALSE_EASTING + UTM_SCALE * self.rectifying_radius * eta;
        let northing = self.false_northing + UTM_SCALE * self.rectifying_radius * xi;
        (easting, northing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: (f64, f64), expected: (f64, f64)) {
        assert!(
            (actual.0 - expected.0).abs() < 0.01 && (actual.1 - expected.1).abs() < 0.01,
            "{actual:?} != {expected:?}"
        );
    }

    #[test]
    fn central_meridian_maps_to_false_easting() {
        let tm = TransverseMercator::utm(16, true);
        assert_eq!(tm.central_meridian_deg().round(), -87.0);
        assert_close(tm.forward(27.0, -87.0), (500_000.0, 2_986_435.2426));
        assert_close(tm.forward(0.0, -87.0), (500_000.0, 0.0));
    }

    #[test]
    fn zone_16_reference_points() {
        let tm = TransverseMercator::utm(16, true);
        assert_close(tm.forward(27.0, -88.0), (400_781.8296, 2_986_828.3527));
        assert_close(tm.forward(27.02, -88.0), (400_799.3913, 2_989_043.7394));
        assert_close(tm.forward(30.0, -83.0), (885_948.5828, 3_325_528.3472));
    }

    #[test]
    fn projection_is_symmetric_about_central_meridian() {
        let tm = TransverseMercator::utm(16, true);
        let (west_x, west_y) = tm.forward(27.0, -88.0);
        let (east_x, east_y) = tm.forward(27.0, -86.0);
        assert!((west_x + east_x - 1_000_000.0).abs() < 1e-6);
        assert!((west_y - east_y).abs() < 1e-6);
    }

    #[test]
    fn southern_hemisphere_adds_false_northing() {
        let tm = TransverseMercator::utm(16, false);
        let (_, y) = tm.forward(-1.0, -87.0);
        assert!(y < FALSE_NORTHING_SOUTH && y > 9_800_000.0);
    }
}
