//! CRS normalizer.
//!
//! Land-cover archives often describe their CRS loosely (or not at all). The
//! normalizer asserts the configured source CRS so the reprojector never has
//! to guess, and drops the on-disk `_FillValue` so it is not mistaken for the
//! output nodata sentinel.

use landcover_common::{keys, CrsCode, RasterGrid};
use tracing::debug;

/// Attach `source_crs` to the grid, replacing any previous assertion.
///
/// Pixel data is untouched. Calling this twice has the same effect as once.
pub fn normalize_crs(grid: &mut RasterGrid, source_crs: CrsCode) {
    if let Some(previous) = grid.crs {
        if previous != source_crs {
            debug!(
                variable = %grid.variable,
                previous = %previous,
                asserted = %source_crs,
                "Overriding CRS"
            );
        }
    }
    grid.crs = Some(source_crs);

    if let Some(fill) = grid.attrs.remove(keys::FILL_VALUE) {
        debug!(variable = %grid.variable, fill_value = %fill, "Dropped source _FillValue");
    }
}
