//! Common types shared across the land-cover pipeline crates.

pub mod attributes;
pub mod bbox;
pub mod crs;
pub mod grid;

pub use attributes::{keys, AttrValue, Attributes};
pub use bbox::BoundingBox;
pub use crs::{CrsCode, CrsDefinition, CrsParseError, Ellipsoid};
pub use grid::{
    Axis, DataVariable, DatasetEncoding, GridShapeError, RasterDataset, RasterGrid, TimeCoord,
    VariableEncoding, SPATIAL_REF_VAR,
};
