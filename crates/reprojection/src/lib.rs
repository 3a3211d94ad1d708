//! Land-cover raster reprojection pipeline.
//!
//! Takes a directory of NetCDF land-cover classification archives in a
//! geographic CRS and writes each one, reprojected to a projected CRS
//! (EPSG:3035 by default), as a self-describing NetCDF-4 file.
//!
//! # Architecture
//!
//! ```text
//! BatchDriver::run()
//!      │
//!      ├─► for each input file (sorted)
//!      │         │
//!      │         ├─► load_dataset      (time slice 0, coordinates, attributes)
//!      │         ├─► normalize_crs     (assert source CRS, drop _FillValue)
//!      │         ├─► reproject         (nearest / mode, nodata sentinel)
//!      │         ├─► rebuild_dataset   (time axis, spatial_ref, provenance)
//!      │         └─► write_dataset     (temp file + rename)
//!      │
//!      ├─► RunSummary (succeeded / failed, logged)
//!      │
//!      └─► verify_output on one output
//! ```
//!
//! A failing file never stops the batch; its error is logged and recorded
//! in the summary.
//!
//! # Example
//!
//! ```ignore
//! use reprojection::{BatchDriver, PipelineConfig};
//!
//! let driver = BatchDriver::new(PipelineConfig::from_env())?;
//! let summary = driver.run()?;
//! println!("{} written, {} failed", summary.succeeded_count(), summary.failed_count());
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod loader;
pub mod normalize;
pub mod rebuild;
pub mod reproject;
pub mod verify;
pub mod writer;

pub use batch::{BatchDriver, FileOutcome, RunSummary};
pub use config::{PipelineConfig, ResamplingMethod};
pub use error::{PipelineError, Result};
pub use loader::{load_dataset, LoadedDataset, TIME_INDEX};
pub use normalize::normalize_crs;
pub use rebuild::{format_resolution, history_entry, rebuild_dataset, RebuildOptions};
pub use reproject::{reproject, select_nodata, ReprojectedGrid, MAX_OUTPUT_PIXELS};
pub use verify::{verify_output, VerificationReport};
pub use writer::write_dataset;
