//! Writing self-describing classification datasets as NetCDF-4.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use landcover_common::{
    keys, AttrValue, Attributes, Axis, DatasetEncoding, RasterDataset, VariableEncoding,
    SPATIAL_REF_VAR,
};
use tracing::{debug, info, warn};

use crate::error::{NetCdfError, NetCdfResult};
use crate::native::{silence_hdf5_errors, to_nc_ubyte_value, to_nc_value};

fn write_err(context: &'static str) -> impl Fn(netcdf::Error) -> NetCdfError {
    move |e| NetCdfError::Write(format!("{}: {}", context, e))
}

/// Sibling path the dataset is written to before being renamed into place.
///
/// Uses process ID and a counter so concurrent writers never collide.
fn temp_sibling(path: &Path) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.nc".to_string());
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{}.{}.{}.part", file_name, std::process::id(), count))
}

fn check_shape(dataset: &RasterDataset) -> NetCdfResult<()> {
    let var = &dataset.variable;
    if dataset.x.len() != var.width || dataset.y.len() != var.height {
        return Err(NetCdfError::InvalidFormat(format!(
            "Axes {}x{} do not match variable '{}' shape {}x{}",
            dataset.x.len(),
            dataset.y.len(),
            var.name,
            var.width,
            var.height
        )));
    }
    if var.data.len() != var.width * var.height {
        return Err(NetCdfError::InvalidFormat(format!(
            "Variable '{}' has {} values, expected {}",
            var.name,
            var.data.len(),
            var.width * var.height
        )));
    }
    Ok(())
}

fn put_attributes_with(
    var: &mut netcdf::VariableMut,
    attrs: &Attributes,
    convert: impl Fn(&str, &AttrValue) -> netcdf::AttributeValue,
) -> NetCdfResult<()> {
    for (name, value) in attrs.iter() {
        // The fill value is part of the encoding, written with the variable's own type
        if name == keys::FILL_VALUE {
            debug!(variable = %var.name(), "Dropping _FillValue attribute in favour of encoding");
            continue;
        }
        var.put_attribute(name, convert(name, value))
            .map_err(write_err("writing variable attribute"))?;
    }
    Ok(())
}

fn put_variable_attributes(var: &mut netcdf::VariableMut, attrs: &Attributes) -> NetCdfResult<()> {
    put_attributes_with(var, attrs, |_, value| to_nc_value(value))
}

/// Value-describing attributes (`flag_values`, `valid_*`) take the class
/// variable's NC_UBYTE type.
fn put_class_attributes(var: &mut netcdf::VariableMut, attrs: &Attributes) -> NetCdfResult<()> {
    put_attributes_with(var, attrs, |name, value| {
        if keys::DATA_TYPED.iter().any(|key| *key == name) {
            to_nc_ubyte_value(value)
        } else {
            to_nc_value(value)
        }
    })
}

fn put_axis(file: &mut netcdf::FileMut, axis: &Axis) -> NetCdfResult<()> {
    let mut var = file
        .add_variable::<f64>(&axis.name, &[axis.name.as_str()])
        .map_err(write_err("defining coordinate variable"))?;
    put_variable_attributes(&mut var, &axis.attrs)?;
    var.put_values(&axis.values, ..)
        .map_err(write_err("writing coordinate values"))?;
    Ok(())
}

fn apply_encoding(var: &mut netcdf::VariableMut, encoding: &VariableEncoding) -> NetCdfResult<()> {
    if let Some(level) = encoding.deflate_level {
        var.set_compression(i32::from(level), false)
            .map_err(write_err("enabling deflate"))?;
    }
    if let Some(fill) = encoding.fill_value {
        var.set_fill_value(fill)
            .map_err(write_err("setting fill value"))?;
    }
    Ok(())
}

fn write_to(dataset: &RasterDataset, encoding: &DatasetEncoding, path: &Path) -> NetCdfResult<()> {
    let mut file = netcdf::create_with(path, netcdf::Options::NETCDF4)
        .map_err(write_err("creating file"))?;

    let time_dim = dataset.time.name.as_str();
    let y_dim = dataset.y.name.as_str();
    let x_dim = dataset.x.name.as_str();

    file.add_dimension(time_dim, 1)
        .map_err(write_err("adding time dimension"))?;
    file.add_dimension(y_dim, dataset.y.len())
        .map_err(write_err("adding y dimension"))?;
    file.add_dimension(x_dim, dataset.x.len())
        .map_err(write_err("adding x dimension"))?;

    {
        let mut time = file
            .add_variable::<f64>(time_dim, &[time_dim])
            .map_err(write_err("defining time variable"))?;
        put_variable_attributes(&mut time, &dataset.time.attrs)?;
        time.put_values(&[dataset.time.value], ..)
            .map_err(write_err("writing time value"))?;
    }

    put_axis(&mut file, &dataset.y)?;
    put_axis(&mut file, &dataset.x)?;

    {
        let class = &dataset.variable;
        let mut var = file
            .add_variable::<u8>(&class.name, &[time_dim, y_dim, x_dim])
            .map_err(write_err("defining class variable"))?;
        apply_encoding(&mut var, &encoding.variable)?;
        put_class_attributes(&mut var, &class.attrs)?;
        var.put_values(&class.data, (0, .., ..))
            .map_err(write_err("writing class data"))?;
    }

    {
        let scalar: [&str; 0] = [];
        let mut crs = file
            .add_variable::<i32>(SPATIAL_REF_VAR, &scalar)
            .map_err(write_err("defining spatial_ref variable"))?;
        // Scalar variables are stored contiguous, so only the fill value applies
        if encoding.spatial_ref.deflate_level.is_some() {
            debug!("Skipping deflate for scalar spatial_ref variable");
        }
        if let Some(fill) = encoding.spatial_ref.fill_value {
            crs.set_fill_value(i32::from(fill))
                .map_err(write_err("setting spatial_ref fill value"))?;
        }
        put_variable_attributes(&mut crs, &dataset.spatial_ref)?;
        crs.put_value(0i32, ..)
            .map_err(write_err("writing spatial_ref value"))?;
    }

    for (name, value) in dataset.global_attrs.iter() {
        file.add_attribute(name, to_nc_value(value))
            .map_err(write_err("writing global attribute"))?;
    }

    Ok(())
}

/// Write a dataset to `path` as NetCDF-4.
///
/// Layout: dimensions `time(1)`, `y`, `x`; f64 coordinate variables; the
/// class variable as NC_UBYTE `(time, y, x)` with the requested deflate
/// level and fill value; a scalar NC_INT `spatial_ref` variable carrying the
/// CRS attributes; then the global attributes.
///
/// The file is written to a hidden sibling and renamed into place, so a
/// failed write never leaves a partial file at `path`.
pub fn write_raster_dataset(
    dataset: &RasterDataset,
    encoding: &DatasetEncoding,
    path: impl AsRef<Path>,
) -> NetCdfResult<()> {
    let path = path.as_ref();
    check_shape(dataset)?;
    silence_hdf5_errors();

    let temp = temp_sibling(path);
    if let Err(e) = write_to(dataset, encoding, &temp) {
        if temp.exists() {
            if let Err(cleanup) = std::fs::remove_file(&temp) {
                warn!(path = %temp.display(), error = %cleanup, "Failed to remove partial output");
            }
        }
        return Err(e);
    }

    std::fs::rename(&temp, path)?;

    info!(
        path = %path.display(),
        variable = %dataset.variable.name,
        width = dataset.variable.width,
        height = dataset.variable.height,
        deflate = ?encoding.variable.deflate_level,
        fill_value = ?encoding.variable.fill_value,
        "Wrote dataset"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_sibling_is_hidden_and_unique() {
        let target = Path::new("/data/out/reprojected_3035_x.nc");
        let a = temp_sibling(target);
        let b = temp_sibling(target);

        assert_eq!(a.parent(), target.parent());
        assert_ne!(a, b);
        let name = a.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".reprojected_3035_x.nc."));
        assert!(name.ends_with(".part"));
    }
}
