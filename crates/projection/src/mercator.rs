//! Spherical ("Web") Mercator projection, EPSG:3857.

use std::f64::consts::{FRAC_PI_4, PI};

use landcover_common::{CrsCode, CrsDefinition};

use crate::error::{ProjectionError, Result};
use crate::transform::Projection;

/// Latitude limit where the Web Mercator square ends.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

#[derive(Debug, Clone, Copy)]
pub struct WebMercator {
    radius: f64,
}

impl WebMercator {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    pub fn from_crs(crs: CrsCode) -> Option<Self> {
        match crs.definition() {
            CrsDefinition::WebMercator { radius } => Some(Self::new(radius)),
            _ => None,
        }
    }
}

impl Projection for WebMercator {
    fn crs(&self) -> CrsCode {
        CrsCode::Epsg3857
    }

    fn from_geographic(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        if !lon.is_finite() || !lat.is_finite() || lat.abs() >= 90.0 {
            return Err(ProjectionError::OutOfDomain { x: lon, y: lat });
        }
        let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
        let x = self.radius * lon.to_radians();
        let y = self.radius * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
        Ok((x, y))
    }

    fn to_geographic(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjectionError::OutOfDomain { x, y });
        }
        let lon = (x / self.radius).to_degrees();
        let lat = (2.0 * (y / self.radius).exp().atan() - PI / 2.0).to_degrees();
        Ok((lon, lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, assert_coords_approx_eq};

    #[test]
    fn test_square_extent() {
        let merc = WebMercator::from_crs(CrsCode::Epsg3857).unwrap();
        let (x, y) = merc.from_geographic(180.0, MAX_LATITUDE).unwrap();
        assert_approx_eq!(x, 20037508.342789244, 1e-6);
        assert_approx_eq!(y, 20037508.342789244, 1e-3);
    }

    #[test]
    fn test_roundtrip() {
        let merc = WebMercator::new(6378137.0);
        let (x, y) = merc.from_geographic(10.0, 52.0).unwrap();
        let (lon, lat) = merc.to_geographic(x, y).unwrap();
        assert_coords_approx_eq!((lon, lat), (10.0, 52.0), 1e-9);
    }

    #[test]
    fn test_pole_rejected() {
        let merc = WebMercator::new(6378137.0);
        assert!(merc.from_geographic(0.0, 90.0).is_err());
    }
}
