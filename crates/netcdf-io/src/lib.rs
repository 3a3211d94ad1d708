//! NetCDF I/O for land-cover classification rasters.
//!
//! This crate wraps the `netcdf` library (libnetcdf + HDF5) for the three
//! things the pipeline needs:
//!
//! - reading one time slice of a classification variable with its
//!   coordinates and attributes (`read_raster_slice`)
//! - writing a rebuilt dataset as compressed NetCDF-4 (`write_raster_dataset`)
//! - inspecting a file header without reading data (`inspect`)
//!
//! # System requirements
//!
//! `libnetcdf-dev` and `libhdf5-dev` must be installed.

pub mod error;
pub mod native;
pub mod reader;
pub mod writer;

pub use error::{NetCdfError, NetCdfResult};
pub use native::silence_hdf5_errors;
pub use reader::{inspect, read_coordinate, read_raster_slice, FileSummary, RasterSlice, VariableSummary};
pub use writer::write_raster_dataset;
