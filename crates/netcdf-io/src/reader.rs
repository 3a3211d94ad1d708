//! Reading classification rasters and file headers.

use std::path::Path;

use landcover_common::{Attributes, Axis, RasterGrid, TimeCoord};
use tracing::{debug, info};

use crate::error::{NetCdfError, NetCdfResult};
use crate::native::{global_attributes, read_f64_values, silence_hdf5_errors, variable_attributes};

/// One 2-D slice of a classification variable plus the file's global attributes.
#[derive(Debug, Clone)]
pub struct RasterSlice {
    pub grid: RasterGrid,
    pub global_attrs: Attributes,
}

/// Summary of a variable in a file header.
#[derive(Debug, Clone)]
pub struct VariableSummary {
    pub name: String,
    pub dimensions: Vec<String>,
    pub attrs: Attributes,
}

/// Header-level view of a NetCDF file (no data arrays are read).
#[derive(Debug, Clone)]
pub struct FileSummary {
    pub dimensions: Vec<(String, usize)>,
    pub variables: Vec<VariableSummary>,
    pub global_attrs: Attributes,
}

impl FileSummary {
    pub fn variable(&self, name: &str) -> Option<&VariableSummary> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn dimension_len(&self, name: &str) -> Option<usize> {
        self.dimensions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, len)| *len)
    }
}

fn open(path: &Path) -> NetCdfResult<netcdf::File> {
    silence_hdf5_errors();
    netcdf::open(path).map_err(|e| NetCdfError::Open {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Read the coordinate values of a dimension.
///
/// Falls back to index coordinates (0, 1, 2, ...) when the file has no
/// coordinate variable for the dimension.
fn read_axis(file: &netcdf::File, dim_name: &str, len: usize) -> NetCdfResult<Axis> {
    match file.variable(dim_name) {
        Some(var) => {
            let values = read_f64_values(&var)?;
            if values.len() != len {
                return Err(NetCdfError::InvalidFormat(format!(
                    "Coordinate '{}' has {} values but dimension length is {}",
                    dim_name,
                    values.len(),
                    len
                )));
            }
            Ok(Axis {
                name: dim_name.to_string(),
                values,
                attrs: variable_attributes(&var),
            })
        }
        None => {
            debug!(dimension = %dim_name, "No coordinate variable, using index coordinates");
            Ok(Axis::new(dim_name, (0..len).map(|i| i as f64).collect()))
        }
    }
}

fn read_time(file: &netcdf::File, dim_name: &str, index: usize) -> NetCdfResult<TimeCoord> {
    let (value, attrs) = match file.variable(dim_name) {
        Some(var) => {
            let values = read_f64_values(&var)?;
            let value = values.get(index).copied().ok_or_else(|| {
                NetCdfError::InvalidFormat(format!(
                    "Time coordinate '{}' has no index {}",
                    dim_name, index
                ))
            })?;
            (value, variable_attributes(&var))
        }
        None => (index as f64, Attributes::new()),
    };
    Ok(TimeCoord {
        name: dim_name.to_string(),
        value,
        attrs,
    })
}

/// Read classification codes, converting from whatever integer width is stored.
///
/// Codes must fit in `0..=255`; a wider value is an error, never truncated.
fn read_codes(var: &netcdf::Variable, time_index: Option<usize>) -> NetCdfResult<Vec<u8>> {
    let bytes = match time_index {
        Some(t) => var.get_values::<u8, _>((t, .., ..)),
        None => var.get_values::<u8, _>(..),
    };
    let first = match bytes {
        Ok(values) => return Ok(values),
        Err(first) => first,
    };

    let wide = match time_index {
        Some(t) => var.get_values::<i32, _>((t, .., ..)),
        None => var.get_values::<i32, _>(..),
    }
    .map_err(|_| {
        NetCdfError::InvalidFormat(format!(
            "Failed to read '{}' as integer codes: {}",
            var.name(),
            first
        ))
    })?;

    wide.into_iter()
        .map(|v| {
            u8::try_from(v).map_err(|_| {
                NetCdfError::InvalidFormat(format!(
                    "Variable '{}' holds class code {} outside 0..=255",
                    var.name(),
                    v
                ))
            })
        })
        .collect()
}

/// Read one time slice of a classification variable.
///
/// Three-dimensional variables are taken as `(time, y, x)` and sliced at
/// `time_index`; two-dimensional variables as `(y, x)` with no time
/// coordinate. The file is closed before returning.
pub fn read_raster_slice(
    path: impl AsRef<Path>,
    variable: &str,
    time_index: usize,
) -> NetCdfResult<RasterSlice> {
    let path = path.as_ref();
    let file = open(path)?;

    let var = file
        .variable(variable)
        .ok_or_else(|| NetCdfError::MissingData(format!("variable '{}'", variable)))?;

    let dims: Vec<(String, usize)> = var
        .dimensions()
        .iter()
        .map(|d| (d.name(), d.len()))
        .collect();

    let (time, y_dim, x_dim) = match dims.as_slice() {
        [(t_name, t_len), y, x] => {
            if time_index >= *t_len {
                return Err(NetCdfError::InvalidFormat(format!(
                    "Time index {} out of range for dimension '{}' of length {}",
                    time_index, t_name, t_len
                )));
            }
            (Some(read_time(&file, t_name, time_index)?), y.clone(), x.clone())
        }
        [y, x] => (None, y.clone(), x.clone()),
        other => {
            return Err(NetCdfError::InvalidFormat(format!(
                "Variable '{}' has {} dimensions, expected 2 or 3",
                variable,
                other.len()
            )))
        }
    };

    if y_dim.1 == 0 || x_dim.1 == 0 {
        return Err(NetCdfError::InvalidFormat(format!(
            "Variable '{}' is empty ({}x{})",
            variable, x_dim.1, y_dim.1
        )));
    }

    let data = read_codes(&var, time.as_ref().map(|_| time_index))?;
    let x = read_axis(&file, &x_dim.0, x_dim.1)?;
    let y = read_axis(&file, &y_dim.0, y_dim.1)?;

    let mut grid = RasterGrid::new(variable, data, x, y)
        .map_err(|e| NetCdfError::InvalidFormat(e.to_string()))?;
    grid.time = time;
    grid.attrs = variable_attributes(&var);

    info!(
        path = %path.display(),
        variable = %variable,
        width = grid.width,
        height = grid.height,
        "Read raster slice"
    );

    Ok(RasterSlice {
        grid,
        global_attrs: global_attributes(&file),
    })
}

/// Read all values of a 1-D coordinate variable.
pub fn read_coordinate(path: impl AsRef<Path>, name: &str) -> NetCdfResult<Vec<f64>> {
    let file = open(path.as_ref())?;
    let var = file
        .variable(name)
        .ok_or_else(|| NetCdfError::MissingData(format!("variable '{}'", name)))?;
    read_f64_values(&var)
}

/// Read dimensions, variable names and attributes without touching data.
pub fn inspect(path: impl AsRef<Path>) -> NetCdfResult<FileSummary> {
    let file = open(path.as_ref())?;

    let dimensions = file.dimensions().map(|d| (d.name(), d.len())).collect();
    let variables = file
        .variables()
        .map(|var| VariableSummary {
            name: var.name(),
            dimensions: var.dimensions().iter().map(|d| d.name()).collect(),
            attrs: variable_attributes(&var),
        })
        .collect();

    Ok(FileSummary {
        dimensions,
        variables,
        global_attrs: global_attributes(&file),
    })
}
