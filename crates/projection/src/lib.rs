//! Coordinate reference system transformations.
//!
//! Implements map projections from scratch without external dependencies.
//! Every projection converts to and from geographic longitude/latitude in
//! degrees; `CrsTransformer` chains two of them to move between arbitrary
//! supported CRSs.

pub mod error;
pub mod geographic;
pub mod laea;
pub mod mercator;
pub mod transform;

pub use error::ProjectionError;
pub use geographic::Geographic;
pub use laea::LambertAzimuthalEqualArea;
pub use mercator::WebMercator;
pub use transform::{for_crs, CrsTransformer, Projection, DEFAULT_DENSIFY_POINTS};
