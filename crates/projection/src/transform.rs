//! CRS-to-CRS coordinate transformation.
//!
//! Transforms pivot through geographic longitude/latitude: the source
//! projection's inverse followed by the target projection's forward.

use landcover_common::{BoundingBox, CrsCode, CrsDefinition};

use crate::error::{ProjectionError, Result};
use crate::geographic::Geographic;
use crate::laea::LambertAzimuthalEqualArea;
use crate::mercator::WebMercator;

/// Points sampled per edge when transforming bounds.
pub const DEFAULT_DENSIFY_POINTS: usize = 21;

/// A map projection to and from geographic degrees.
pub trait Projection: Send + Sync {
    /// The CRS this projection realizes.
    fn crs(&self) -> CrsCode;

    /// Projected (x, y) to geographic (lon, lat) in degrees.
    fn to_geographic(&self, x: f64, y: f64) -> Result<(f64, f64)>;

    /// Geographic (lon, lat) in degrees to projected (x, y).
    fn from_geographic(&self, lon: f64, lat: f64) -> Result<(f64, f64)>;
}

/// Build the projection for a CRS.
pub fn for_crs(crs: CrsCode) -> Box<dyn Projection> {
    match crs.definition() {
        CrsDefinition::Geographic { .. } => Box::new(Geographic::new(crs)),
        CrsDefinition::LambertAzimuthalEqualArea {
            ellipsoid,
            lat0,
            lon0,
            false_easting,
            false_northing,
        } => Box::new(LambertAzimuthalEqualArea::new(
            crs,
            ellipsoid,
            lat0,
            lon0,
            false_easting,
            false_northing,
        )),
        CrsDefinition::WebMercator { radius } => Box::new(WebMercator::new(radius)),
    }
}

/// Transforms coordinates from a source CRS to a target CRS and back.
pub struct CrsTransformer {
    source: Box<dyn Projection>,
    target: Box<dyn Projection>,
}

impl std::fmt::Debug for CrsTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrsTransformer")
            .field("source", &self.source.crs())
            .field("target", &self.target.crs())
            .finish()
    }
}

impl CrsTransformer {
    pub fn new(source: CrsCode, target: CrsCode) -> Self {
        Self {
            source: for_crs(source),
            target: for_crs(target),
        }
    }

    /// Build a transformer from `authority:code` strings.
    pub fn from_codes(source: &str, target: &str) -> Result<Self> {
        let parse = |s: &str| {
            CrsCode::parse(s).map_err(|_| ProjectionError::UnsupportedCrs(s.to_string()))
        };
        Ok(Self::new(parse(source)?, parse(target)?))
    }

    pub fn source_crs(&self) -> CrsCode {
        self.source.crs()
    }

    pub fn target_crs(&self) -> CrsCode {
        self.target.crs()
    }

    fn is_identity(&self) -> bool {
        self.source.crs() == self.target.crs()
    }

    /// Source (x, y) to target (x, y).
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if self.is_identity() {
            return Ok((x, y));
        }
        let (lon, lat) = self.source.to_geographic(x, y)?;
        self.target.from_geographic(lon, lat)
    }

    /// Target (x, y) back to source (x, y).
    pub fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if self.is_identity() {
            return Ok((x, y));
        }
        let (lon, lat) = self.target.to_geographic(x, y)?;
        self.source.from_geographic(lon, lat)
    }

    /// Transform a bounding box by sampling `densify_pts` points along each edge.
    ///
    /// Straight edges in one CRS are curves in another, so transforming only
    /// the corners under-estimates the extent. Points that fall outside the
    /// target domain are skipped; the result must still be a valid box.
    pub fn transform_bounds(&self, bounds: &BoundingBox, densify_pts: usize) -> Result<BoundingBox> {
        if !bounds.is_valid() {
            return Err(ProjectionError::InvalidBounds(format!(
                "source bounds are not finite or inverted: {:?}",
                bounds
            )));
        }

        let mut out = BoundingBox::empty();
        for (x, y) in bounds.edge_points(densify_pts) {
            if let Ok((tx, ty)) = self.transform(x, y) {
                if tx.is_finite() && ty.is_finite() {
                    out.include(tx, ty);
                }
            }
        }

        if !out.is_valid() {
            return Err(ProjectionError::InvalidBounds(format!(
                "no edge point of {:?} maps into {}",
                bounds,
                self.target.crs()
            )));
        }
        Ok(out)
    }
}
