//! Dataset loader: one time-sliced classification grid per file.

use std::path::Path;

use landcover_common::{Attributes, RasterGrid};
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Time index selected from three-dimensional variables.
pub const TIME_INDEX: usize = 0;

/// A loaded input: the 2-D grid plus the file's global attributes.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub grid: RasterGrid,
    pub global_attrs: Attributes,
}

/// Open `path` and extract `variable` at the first time step.
///
/// No file handle outlives the call.
pub fn load_dataset(path: impl AsRef<Path>, variable: &str) -> Result<LoadedDataset> {
    let path = path.as_ref();
    let slice = netcdf_io::read_raster_slice(path, variable, TIME_INDEX)
        .map_err(|e| PipelineError::unreadable(path.display().to_string(), e.to_string()))?;

    debug!(
        path = %path.display(),
        variable = %variable,
        width = slice.grid.width,
        height = slice.grid.height,
        has_time = slice.grid.time.is_some(),
        "Loaded dataset"
    );

    Ok(LoadedDataset {
        grid: slice.grid,
        global_attrs: slice.global_attrs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{temp_test_dir, write_corrupt_file, write_short_class_file, LandCoverFixture};

    #[test]
    fn test_load_fixture() {
        let dir = temp_test_dir();
        let path = dir.path().join("in.nc");
        LandCoverFixture::new(5, 4).write(&path).unwrap();

        let loaded = load_dataset(&path, "lccs_class").unwrap();
        assert_eq!(loaded.grid.width, 5);
        assert_eq!(loaded.grid.height, 4);
        assert!(loaded.grid.crs.is_none());
        assert!(loaded.global_attrs.contains("history"));
    }

    #[test]
    fn test_corrupt_input_is_unreadable() {
        let dir = temp_test_dir();
        let path = dir.path().join("bad.nc");
        write_corrupt_file(&path).unwrap();

        let err = load_dataset(&path, "lccs_class").unwrap_err();
        assert_eq!(err.stage(), "load");
    }

    #[test]
    fn test_missing_variable_is_unreadable() {
        let dir = temp_test_dir();
        let path = dir.path().join("in.nc");
        LandCoverFixture::new(2, 2).write(&path).unwrap();

        let err = load_dataset(&path, "no_such_var").unwrap_err();
        assert!(matches!(err, PipelineError::UnreadableInput { .. }));
    }

    #[test]
    fn test_out_of_range_codes_are_unreadable() {
        let dir = temp_test_dir();
        let path = dir.path().join("wide.nc");
        write_short_class_file(&path, "lccs_class", 2, 1, &[10, 300]).unwrap();

        let err = load_dataset(&path, "lccs_class").unwrap_err();
        assert!(matches!(err, PipelineError::UnreadableInput { .. }));
    }
}
