//! Geographic (longitude/latitude) coordinate systems.
//!
//! Geographic CRSs act as the pivot of every transform. Datum shifts between
//! WGS84 and ETRS89 are below the resolution of the land-cover products and
//! are not applied.

use landcover_common::CrsCode;

use crate::error::{ProjectionError, Result};
use crate::transform::Projection;

/// Identity projection over longitude/latitude degrees.
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    crs: CrsCode,
}

impl Geographic {
    pub fn new(crs: CrsCode) -> Self {
        Self { crs }
    }
}

fn check_latitude(lon: f64, lat: f64) -> Result<()> {
    if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 {
        return Err(ProjectionError::OutOfDomain { x: lon, y: lat });
    }
    Ok(())
}

impl Projection for Geographic {
    fn crs(&self) -> CrsCode {
        self.crs
    }

    fn to_geographic(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        check_latitude(x, y)?;
        Ok((x, y))
    }

    fn from_geographic(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        check_latitude(lon, lat)?;
        Ok((lon, lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let geo = Geographic::new(CrsCode::Epsg4326);
        assert_eq!(geo.from_geographic(12.5, 48.0).unwrap(), (12.5, 48.0));
        assert_eq!(geo.to_geographic(-3.0, -45.0).unwrap(), (-3.0, -45.0));
    }

    #[test]
    fn test_rejects_invalid_latitude() {
        let geo = Geographic::new(CrsCode::Epsg4258);
        assert!(geo.from_geographic(0.0, 90.5).is_err());
        assert!(geo.to_geographic(f64::NAN, 0.0).is_err());
    }
}
