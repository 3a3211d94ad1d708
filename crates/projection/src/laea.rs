//! Lambert Azimuthal Equal-Area projection (ellipsoidal, oblique aspect).
//!
//! This is the projection behind EPSG:3035 (ETRS89-extended / LAEA Europe),
//! the standard grid for pan-European statistics because it preserves area.
//!
//! Formulas follow the oblique ellipsoidal case using authalic latitude:
//! - q(φ): authalic function, qP = q(90°)
//! - β = asin(q / qP): authalic latitude
//! - Rq = a·sqrt(qP / 2): radius of the authalic sphere
//! - D: scale correction so the projection is true to scale at the origin
//!
//! The inverse uses the standard series expansion from authalic back to
//! geodetic latitude, accurate to well below a millimetre on GRS80.

use std::f64::consts::{FRAC_PI_2, PI};

use landcover_common::{CrsCode, CrsDefinition, Ellipsoid};

use crate::error::{ProjectionError, Result};
use crate::transform::Projection;

#[derive(Debug, Clone)]
pub struct LambertAzimuthalEqualArea {
    crs: CrsCode,
    /// First eccentricity
    e: f64,
    e2: f64,
    /// Longitude of origin in radians
    lon0: f64,
    false_easting: f64,
    false_northing: f64,
    qp: f64,
    sin_beta0: f64,
    cos_beta0: f64,
    rq: f64,
    d: f64,
}

impl LambertAzimuthalEqualArea {
    /// Build the projection from ellipsoid and origin parameters (degrees, meters).
    pub fn new(
        crs: CrsCode,
        ellipsoid: Ellipsoid,
        lat0_deg: f64,
        lon0_deg: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let a = ellipsoid.semi_major_axis;
        let e2 = ellipsoid.eccentricity_squared();
        let e = e2.sqrt();
        let lat0 = lat0_deg.to_radians();

        let qp = authalic_q(FRAC_PI_2, e, e2);
        let q0 = authalic_q(lat0, e, e2);
        let beta0 = (q0 / qp).clamp(-1.0, 1.0).asin();
        let rq = a * (qp / 2.0).sqrt();
        let d = a * (lat0.cos() / (1.0 - e2 * lat0.sin().powi(2)).sqrt()) / (rq * beta0.cos());

        Self {
            crs,
            e,
            e2,
            lon0: lon0_deg.to_radians(),
            false_easting,
            false_northing,
            qp,
            sin_beta0: beta0.sin(),
            cos_beta0: beta0.cos(),
            rq,
            d,
        }
    }

    /// Build the projection for a CRS whose definition is LAEA.
    pub fn from_crs(crs: CrsCode) -> Option<Self> {
        match crs.definition() {
            CrsDefinition::LambertAzimuthalEqualArea {
                ellipsoid,
                lat0,
                lon0,
                false_easting,
                false_northing,
            } => Some(Self::new(
                crs,
                ellipsoid,
                lat0,
                lon0,
                false_easting,
                false_northing,
            )),
            _ => None,
        }
    }
}

/// Authalic function q(φ).
fn authalic_q(phi: f64, e: f64, e2: f64) -> f64 {
    let sin_phi = phi.sin();
    if e == 0.0 {
        return 2.0 * sin_phi;
    }
    let e_sin = e * sin_phi;
    (1.0 - e2)
        * (sin_phi / (1.0 - e2 * sin_phi * sin_phi)
            - (1.0 / (2.0 * e)) * ((1.0 - e_sin) / (1.0 + e_sin)).ln())
}

fn normalize_lon(mut dlon: f64) -> f64 {
    while dlon > PI {
        dlon -= 2.0 * PI;
    }
    while dlon < -PI {
        dlon += 2.0 * PI;
    }
    dlon
}

impl Projection for LambertAzimuthalEqualArea {
    fn crs(&self) -> CrsCode {
        self.crs
    }

    fn from_geographic(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 {
            return Err(ProjectionError::OutOfDomain { x: lon, y: lat });
        }
        let phi = lat.to_radians();
        let dlon = normalize_lon(lon.to_radians() - self.lon0);

        let q = authalic_q(phi, self.e, self.e2);
        let beta = (q / self.qp).clamp(-1.0, 1.0).asin();
        let (sin_beta, cos_beta) = beta.sin_cos();

        let denom = 1.0 + self.sin_beta0 * sin_beta + self.cos_beta0 * cos_beta * dlon.cos();
        // Antipode of the origin has no unique image
        if denom <= 1e-12 {
            return Err(ProjectionError::OutOfDomain { x: lon, y: lat });
        }
        let b = self.rq * (2.0 / denom).sqrt();

        let x = self.false_easting + b * self.d * cos_beta * dlon.sin();
        let y = self.false_northing
            + (b / self.d)
                * (self.cos_beta0 * sin_beta - self.sin_beta0 * cos_beta * dlon.cos());
        Ok((x, y))
    }

    fn to_geographic(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjectionError::OutOfDomain { x, y });
        }
        let dx = x - self.false_easting;
        let dy = y - self.false_northing;
        let rho = ((dx / self.d).powi(2) + (self.d * dy).powi(2)).sqrt();

        if rho < 1e-10 {
            return Ok((self.lon0.to_degrees(), self.origin_latitude_deg()));
        }

        let ratio = rho / (2.0 * self.rq);
        if ratio > 1.0 {
            return Err(ProjectionError::OutOfDomain { x, y });
        }
        let c = 2.0 * ratio.asin();
        let (sin_c, cos_c) = c.sin_cos();

        let beta_prime = (cos_c * self.sin_beta0 + self.d * dy * sin_c * self.cos_beta0 / rho)
            .clamp(-1.0, 1.0)
            .asin();

        let lat = authalic_to_geodetic(beta_prime, self.e2);
        let lon = self.lon0
            + (dx * sin_c).atan2(
                self.d * rho * self.cos_beta0 * cos_c - self.d * self.d * dy * self.sin_beta0 * sin_c,
            );

        Ok((normalize_lon(lon).to_degrees(), lat.to_degrees()))
    }
}

impl LambertAzimuthalEqualArea {
    fn origin_latitude_deg(&self) -> f64 {
        let beta0 = self.sin_beta0.asin();
        authalic_to_geodetic(beta0, self.e2).to_degrees()
    }
}

/// Series expansion from authalic latitude β back to geodetic latitude φ.
fn authalic_to_geodetic(beta: f64, e2: f64) -> f64 {
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    beta + (e2 / 3.0 + 31.0 * e4 / 180.0 + 517.0 * e6 / 5040.0) * (2.0 * beta).sin()
        + (23.0 * e4 / 360.0 + 251.0 * e6 / 3780.0) * (4.0 * beta).sin()
        + (761.0 * e6 / 45360.0) * (6.0 * beta).sin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, assert_coords_approx_eq};

    fn europe() -> LambertAzimuthalEqualArea {
        LambertAzimuthalEqualArea::from_crs(CrsCode::Epsg3035).unwrap()
    }

    #[test]
    fn test_forward_guidance_example() {
        // Worked example for EPSG:3035: 50°N, 5°E
        let proj = europe();
        let (e, n) = proj.from_geographic(5.0, 50.0).unwrap();
        assert_approx_eq!(e, 3962799.45, 0.05);
        assert_approx_eq!(n, 2999718.85, 0.05);
    }

    #[test]
    fn test_inverse_guidance_example() {
        let proj = europe();
        let (lon, lat) = proj.to_geographic(3962799.45, 2999718.85).unwrap();
        assert_coords_approx_eq!((lon, lat), (5.0, 50.0), 1e-7);
    }

    #[test]
    fn test_origin_maps_to_false_origin() {
        let proj = europe();
        let (e, n) = proj.from_geographic(10.0, 52.0).unwrap();
        assert_coords_approx_eq!((e, n), (4321000.0, 3210000.0), 1e-6);

        let (lon, lat) = proj.to_geographic(4321000.0, 3210000.0).unwrap();
        assert_coords_approx_eq!((lon, lat), (10.0, 52.0), 1e-8);
    }

    #[test]
    fn test_roundtrip_across_europe() {
        let proj = europe();
        for &(lon, lat) in &[(-10.0, 36.0), (30.0, 70.0), (2.35, 48.85), (25.0, 35.0), (-25.0, 65.0)] {
            let (x, y) = proj.from_geographic(lon, lat).unwrap();
            let (lon2, lat2) = proj.to_geographic(x, y).unwrap();
            assert_coords_approx_eq!((lon2, lat2), (lon, lat), 1e-7);
        }
    }

    #[test]
    fn test_not_laea() {
        assert!(LambertAzimuthalEqualArea::from_crs(CrsCode::Epsg4326).is_none());
    }

    #[test]
    fn test_out_of_domain() {
        let proj = europe();
        // Far beyond the authalic sphere's projected disc
        assert!(proj.to_geographic(4321000.0 + 2.0e7, 3210000.0).is_err());
        assert!(proj.from_geographic(0.0, 91.0).is_err());
    }
}
