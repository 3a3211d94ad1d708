//! Glue between the netcdf library and the pipeline's attribute model.
//!
//! The netcdf library types attributes by their on-disk NC type. The pipeline
//! works with `AttrValue`, which only distinguishes text, integers and
//! floats; conversion happens here in both directions.

use std::sync::Once;

use landcover_common::{AttrValue, Attributes};
use netcdf::AttributeValue;
use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This creates confusing log spam like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// This function disables that output by calling H5Eset_auto2 with null handlers.
/// It only needs to be called once per process, but is safe to call multiple times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Convert a netcdf attribute value into the pipeline's model.
///
/// Returns `None` for types the pipeline has no use for (e.g. string arrays).
pub fn from_nc_value(value: AttributeValue) -> Option<AttrValue> {
    let ints = |v: Vec<i64>| {
        if v.len() == 1 {
            AttrValue::Int(v[0])
        } else {
            AttrValue::Ints(v)
        }
    };
    let floats = |v: Vec<f64>| {
        if v.len() == 1 {
            AttrValue::Float(v[0])
        } else {
            AttrValue::Floats(v)
        }
    };

    let converted = match value {
        AttributeValue::Str(s) => AttrValue::Text(s),
        AttributeValue::Uchar(v) => AttrValue::Int(v.into()),
        AttributeValue::Schar(v) => AttrValue::Int(v.into()),
        AttributeValue::Ushort(v) => AttrValue::Int(v.into()),
        AttributeValue::Short(v) => AttrValue::Int(v.into()),
        AttributeValue::Uint(v) => AttrValue::Int(v.into()),
        AttributeValue::Int(v) => AttrValue::Int(v.into()),
        AttributeValue::Longlong(v) => AttrValue::Int(v),
        AttributeValue::Ulonglong(v) => AttrValue::Int(i64::try_from(v).ok()?),
        AttributeValue::Float(v) => AttrValue::Float(v.into()),
        AttributeValue::Double(v) => AttrValue::Float(v),
        AttributeValue::Uchars(v) => ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Schars(v) => ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Ushorts(v) => ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Shorts(v) => ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Uints(v) => ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Ints(v) => ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Longlongs(v) => ints(v),
        AttributeValue::Floats(v) => floats(v.into_iter().map(f64::from).collect()),
        AttributeValue::Doubles(v) => floats(v),
        _ => return None,
    };
    Some(converted)
}

/// Convert a pipeline attribute value for writing.
///
/// Integers are stored as NC_INT when they fit, NC_INT64 otherwise.
pub fn to_nc_value(value: &AttrValue) -> AttributeValue {
    match value {
        AttrValue::Text(s) => AttributeValue::Str(s.clone()),
        AttrValue::Int(v) => match i32::try_from(*v) {
            Ok(small) => AttributeValue::Int(small),
            Err(_) => AttributeValue::Longlong(*v),
        },
        AttrValue::Ints(v) => {
            let small: Result<Vec<i32>, _> = v.iter().map(|x| i32::try_from(*x)).collect();
            match small {
                Ok(small) => AttributeValue::Ints(small),
                Err(_) => AttributeValue::Longlongs(v.clone()),
            }
        }
        AttrValue::Float(v) => AttributeValue::Double(*v),
        AttrValue::Floats(v) => AttributeValue::Doubles(v.clone()),
    }
}

/// Convert an attribute that describes NC_UBYTE data values.
///
/// Integers in `0..=255` are stored as NC_UBYTE so they match the variable's
/// type; anything else falls back to [`to_nc_value`].
pub fn to_nc_ubyte_value(value: &AttrValue) -> AttributeValue {
    match value {
        AttrValue::Int(v) => match u8::try_from(*v) {
            Ok(byte) => AttributeValue::Uchar(byte),
            Err(_) => to_nc_value(value),
        },
        AttrValue::Ints(v) => {
            let bytes: Result<Vec<u8>, _> = v.iter().map(|x| u8::try_from(*x)).collect();
            match bytes {
                Ok(bytes) => AttributeValue::Uchars(bytes),
                Err(_) => to_nc_value(value),
            }
        }
        other => to_nc_value(other),
    }
}

/// Collect a variable's attributes in file order.
pub fn variable_attributes(var: &netcdf::Variable) -> Attributes {
    collect_attributes(var.attributes(), var.name().as_str())
}

/// Collect a file's global attributes in file order.
pub fn global_attributes(file: &netcdf::File) -> Attributes {
    collect_attributes(file.attributes(), "<global>")
}

fn collect_attributes<'a>(
    attrs: impl Iterator<Item = netcdf::Attribute<'a>>,
    owner: &str,
) -> Attributes {
    let mut out = Attributes::new();
    for attr in attrs {
        let name = attr.name().to_string();
        match attr.value().ok().and_then(from_nc_value) {
            Some(value) => {
                out.insert(name, value);
            }
            None => debug!(owner = %owner, attribute = %name, "Skipping unsupported attribute type"),
        }
    }
    out
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
pub fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Read a numeric 1-D variable as f64, whatever its stored float width.
pub fn read_f64_values(var: &netcdf::Variable) -> NetCdfResult<Vec<f64>> {
    match var.get_values::<f64, _>(..) {
        Ok(values) => Ok(values),
        Err(first) => var
            .get_values::<f32, _>(..)
            .map(|values| values.into_iter().map(f64::from).collect())
            .map_err(|_| {
                NetCdfError::InvalidFormat(format!(
                    "Failed to read '{}' as floating point: {}",
                    var.name(),
                    first
                ))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_nc_value_collapses_single_element_lists() {
        assert_eq!(
            from_nc_value(AttributeValue::Uchars(vec![7])),
            Some(AttrValue::Int(7))
        );
        assert_eq!(
            from_nc_value(AttributeValue::Uchars(vec![0, 10, 20])),
            Some(AttrValue::Ints(vec![0, 10, 20]))
        );
        assert_eq!(
            from_nc_value(AttributeValue::Str("ESA CCI".into())),
            Some(AttrValue::Text("ESA CCI".into()))
        );
    }

    #[test]
    fn test_to_nc_value_int_width() {
        assert!(matches!(to_nc_value(&AttrValue::Int(5)), AttributeValue::Int(5)));
        assert!(matches!(
            to_nc_value(&AttrValue::Int(1 << 40)),
            AttributeValue::Longlong(_)
        ));
        assert!(matches!(
            to_nc_value(&AttrValue::Ints(vec![0, 255])),
            AttributeValue::Ints(_)
        ));
    }

    #[test]
    fn test_to_nc_ubyte_value_keeps_byte_range() {
        assert!(matches!(
            to_nc_ubyte_value(&AttrValue::Ints(vec![0, 10, 220])),
            AttributeValue::Uchars(ref v) if v == &[0, 10, 220]
        ));
        assert!(matches!(
            to_nc_ubyte_value(&AttrValue::Int(255)),
            AttributeValue::Uchar(255)
        ));
        // Out of range stays wide rather than truncating
        assert!(matches!(
            to_nc_ubyte_value(&AttrValue::Ints(vec![0, 300])),
            AttributeValue::Ints(_)
        ));
        assert!(matches!(
            to_nc_ubyte_value(&AttrValue::Text("x".into())),
            AttributeValue::Str(_)
        ));
    }
}
