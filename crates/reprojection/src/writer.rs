//! Writer stage: persists a rebuilt dataset.

use std::fs;
use std::path::Path;

use landcover_common::{DatasetEncoding, RasterDataset};

use crate::error::{PipelineError, Result};

/// Write `dataset` to `path` with the given encoding.
///
/// Missing parent directories are created. The file appears at `path`
/// only once it is complete.
pub fn write_dataset(
    dataset: &RasterDataset,
    encoding: &DatasetEncoding,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let write_err = |message: String| PipelineError::write(path.display().to_string(), message);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
    }
    netcdf_io::write_raster_dataset(dataset, encoding, path).map_err(|e| write_err(e.to_string()))
}
