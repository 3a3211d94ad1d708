//! Metadata rebuilder: turns a reprojected grid into a self-describing dataset.

use landcover_common::{
    keys, Attributes, CrsCode, DataVariable, DatasetEncoding, RasterDataset, TimeCoord,
    VariableEncoding, SPATIAL_REF_VAR,
};
use tracing::debug;

use crate::config::ResamplingMethod;
use crate::error::{PipelineError, Result};
use crate::reproject::ReprojectedGrid;

/// Output settings the rebuilder records in the dataset.
#[derive(Debug, Clone, Copy)]
pub struct RebuildOptions {
    pub resolution: f64,
    pub resampling: ResamplingMethod,
    pub compression_level: u8,
}

/// `spatial_resolution` label, e.g. `300m` or `0.0025deg`.
pub fn format_resolution(resolution: f64, crs: CrsCode) -> String {
    format!("{}{}", resolution, crs.unit_suffix())
}

/// History entry recorded for a reprojection.
pub fn history_entry(crs: CrsCode, resampling: ResamplingMethod) -> String {
    format!("Reprojected to {} with {} resampling", crs, resampling)
}

fn axis_attributes(crs: CrsCode, is_x: bool) -> Attributes {
    let mut attrs = Attributes::new();
    if crs.is_geographic() {
        if is_x {
            attrs.insert(keys::STANDARD_NAME, "longitude");
            attrs.insert(keys::LONG_NAME, "longitude");
            attrs.insert(keys::UNITS, "degrees_east");
            attrs.insert(keys::AXIS, "X");
        } else {
            attrs.insert(keys::STANDARD_NAME, "latitude");
            attrs.insert(keys::LONG_NAME, "latitude");
            attrs.insert(keys::UNITS, "degrees_north");
            attrs.insert(keys::AXIS, "Y");
        }
    } else if is_x {
        attrs.insert(keys::STANDARD_NAME, "projection_x_coordinate");
        attrs.insert(keys::LONG_NAME, "x coordinate of projection");
        attrs.insert(keys::UNITS, "m");
        attrs.insert(keys::AXIS, "X");
    } else {
        attrs.insert(keys::STANDARD_NAME, "projection_y_coordinate");
        attrs.insert(keys::LONG_NAME, "y coordinate of projection");
        attrs.insert(keys::UNITS, "m");
        attrs.insert(keys::AXIS, "Y");
    }
    attrs
}

/// Build the output dataset and its encoding.
///
/// Variable and dataset attributes are carried over from the input. The
/// stale `_FillValue` and `grid_mapping` are dropped, `grid_mapping` is
/// pointed at the new `spatial_ref` companion, and the provenance keys
/// (`spatial_ref`, `spatial_resolution`, `history`) are recomputed.
pub fn rebuild_dataset(
    reprojected: ReprojectedGrid,
    global_attrs: &Attributes,
    options: RebuildOptions,
) -> Result<(RasterDataset, DatasetEncoding)> {
    let ReprojectedGrid { grid, nodata } = reprojected;
    let crs = grid
        .crs
        .ok_or_else(|| PipelineError::crs("reprojected grid carries no CRS"))?;

    let time = grid.time.unwrap_or_else(|| TimeCoord {
        name: "time".to_string(),
        value: 0.0,
        attrs: Attributes::new(),
    });

    let mut var_attrs = grid.attrs;
    var_attrs.remove(keys::FILL_VALUE);
    var_attrs.remove(keys::GRID_MAPPING);
    var_attrs.insert(keys::GRID_MAPPING, SPATIAL_REF_VAR);

    let mut globals = global_attrs.clone();
    globals.insert(keys::SPATIAL_REF, crs.to_string());
    globals.insert(
        keys::SPATIAL_RESOLUTION,
        format_resolution(options.resolution, crs),
    );
    let entry = history_entry(crs, options.resampling);
    // Separator is written even when there is no previous history
    let history = format!("{}; {}", globals.text(keys::HISTORY).unwrap_or_default(), entry);
    globals.insert(keys::HISTORY, history);

    let mut x = grid.x;
    x.attrs = axis_attributes(crs, true);
    let mut y = grid.y;
    y.attrs = axis_attributes(crs, false);

    debug!(
        variable = %grid.variable,
        crs = %crs,
        nodata,
        "Rebuilt dataset metadata"
    );

    let dataset = RasterDataset {
        variable: DataVariable {
            name: grid.variable,
            data: grid.data,
            width: grid.width,
            height: grid.height,
            attrs: var_attrs,
        },
        x,
        y,
        time,
        spatial_ref: crs.cf_attributes(),
        global_attrs: globals,
    };

    let encoding = DatasetEncoding {
        variable: VariableEncoding {
            deflate_level: Some(options.compression_level),
            fill_value: Some(nodata),
        },
        spatial_ref: VariableEncoding {
            deflate_level: Some(options.compression_level),
            fill_value: None,
        },
    };

    Ok((dataset, encoding))
}
