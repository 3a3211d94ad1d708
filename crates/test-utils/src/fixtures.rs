//! Synthetic land-cover NetCDF files for tests.
//!
//! `LandCoverFixture` writes files shaped like the ESA CCI / C3S land-cover
//! products: a `time x lat x lon` NC_UBYTE `lccs_class` variable with
//! `flag_values`, `_FillValue` and descending latitudes.

use std::path::Path;

use crate::generators::{create_striped_classes, regular_axis, ESA_CCI_FLAG_VALUES};

/// Filename following the ESA CCI land-cover convention.
pub fn esa_cci_filename(year: u16) -> String {
    format!("ESACCI-LC-L4-LCCS-Map-300m-P1Y-{}-v2.0.7cds.nc", year)
}

/// Filename following the C3S land-cover convention.
pub fn c3s_filename(year: u16) -> String {
    format!("C3S-LC-L4-LCCS-Map-300m-P1Y-{}-v2.1.1.nc", year)
}

/// Writes a file with a `.nc` name that no NetCDF library can open.
pub fn write_corrupt_file(path: impl AsRef<Path>) -> std::io::Result<()> {
    std::fs::write(path, b"CDF? definitely not a NetCDF header\n\x00\x01\x02")
}

/// Writes a 2-D `lat x lon` class variable stored as NC_SHORT.
///
/// Some products store classes in a wider integer type than the codes need.
pub fn write_short_class_file(
    path: impl AsRef<Path>,
    variable: &str,
    width: usize,
    height: usize,
    data: &[i16],
) -> Result<(), netcdf::Error> {
    assert_eq!(data.len(), width * height, "data does not match its shape");

    let mut file = netcdf::create_with(path.as_ref(), netcdf::Options::NETCDF4)?;
    file.add_dimension("lat", height)?;
    file.add_dimension("lon", width)?;
    {
        let mut lat = file.add_variable::<f64>("lat", &["lat"])?;
        lat.put_values(&regular_axis(50.0, -0.01, height), ..)?;
    }
    {
        let mut lon = file.add_variable::<f64>("lon", &["lon"])?;
        lon.put_values(&regular_axis(5.0, 0.01, width), ..)?;
    }
    let mut var = file.add_variable::<i16>(variable, &["lat", "lon"])?;
    var.put_values(data, (.., ..))?;
    Ok(())
}

/// Builder for a synthetic land-cover file.
#[derive(Debug, Clone)]
pub struct LandCoverFixture {
    pub variable: String,
    pub width: usize,
    pub height: usize,
    /// Longitude of the first column's center
    pub lon_start: f64,
    /// Latitude of the first row's center (rows run north to south)
    pub lat_start: f64,
    /// Pixel size in degrees
    pub step: f64,
    pub data: Vec<u8>,
    pub flag_values: Option<Vec<u8>>,
    pub fill_value: Option<u8>,
    pub with_time: bool,
    /// Days since 1970-01-01
    pub time_value: f64,
    pub grid_mapping: Option<String>,
    pub history: Option<String>,
}

impl LandCoverFixture {
    /// A `width x height` grid over central Europe with four striped classes.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            variable: "lccs_class".to_string(),
            width,
            height,
            lon_start: 5.0,
            lat_start: 50.0,
            step: 0.01,
            data: create_striped_classes(width, height, &[10, 30, 190, 210], 3),
            flag_values: Some(ESA_CCI_FLAG_VALUES.to_vec()),
            fill_value: Some(0),
            with_time: true,
            time_value: 9131.0,
            grid_mapping: Some("crs".to_string()),
            history: Some("amorgos-4,0, lccs-1.0".to_string()),
        }
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    pub fn with_origin(mut self, lon_start: f64, lat_start: f64) -> Self {
        self.lon_start = lon_start;
        self.lat_start = lat_start;
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    pub fn with_flag_values(mut self, flag_values: Option<Vec<u8>>) -> Self {
        self.flag_values = flag_values;
        self
    }

    pub fn with_fill_value(mut self, fill_value: Option<u8>) -> Self {
        self.fill_value = fill_value;
        self
    }

    pub fn without_time(mut self) -> Self {
        self.with_time = false;
        self
    }

    pub fn with_variable(mut self, name: &str) -> Self {
        self.variable = name.to_string();
        self
    }

    pub fn lons(&self) -> Vec<f64> {
        regular_axis(self.lon_start, self.step, self.width)
    }

    pub fn lats(&self) -> Vec<f64> {
        regular_axis(self.lat_start, -self.step, self.height)
    }

    /// Write the fixture as NetCDF-4.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), netcdf::Error> {
        assert_eq!(
            self.data.len(),
            self.width * self.height,
            "fixture data does not match its shape"
        );

        let mut file = netcdf::create_with(path.as_ref(), netcdf::Options::NETCDF4)?;
        file.add_attribute("title", "Synthetic land cover map")?;
        file.add_attribute("project", "Climate Change Initiative - European Space Agency")?;
        if let Some(history) = &self.history {
            file.add_attribute("history", history.as_str())?;
        }
        file.add_attribute("spatial_resolution", "300m")?;

        if self.with_time {
            file.add_dimension("time", 1)?;
        }
        file.add_dimension("lat", self.height)?;
        file.add_dimension("lon", self.width)?;

        if self.with_time {
            let mut time = file.add_variable::<f64>("time", &["time"])?;
            time.put_attribute("standard_name", "time")?;
            time.put_attribute("units", "days since 1970-01-01 00:00:00")?;
            time.put_values(&[self.time_value], ..)?;
        }

        {
            let mut lat = file.add_variable::<f64>("lat", &["lat"])?;
            lat.put_attribute("standard_name", "latitude")?;
            lat.put_attribute("units", "degrees_north")?;
            lat.put_values(&self.lats(), ..)?;
        }
        {
            let mut lon = file.add_variable::<f64>("lon", &["lon"])?;
            lon.put_attribute("standard_name", "longitude")?;
            lon.put_attribute("units", "degrees_east")?;
            lon.put_values(&self.lons(), ..)?;
        }

        let dims: Vec<&str> = if self.with_time {
            vec!["time", "lat", "lon"]
        } else {
            vec!["lat", "lon"]
        };
        let mut var = file.add_variable::<u8>(&self.variable, &dims)?;
        if let Some(fill) = self.fill_value {
            var.set_fill_value(fill)?;
        }
        var.put_attribute("long_name", "Land cover class defined in LCCS")?;
        var.put_attribute("standard_name", "land_cover_lccs")?;
        if let Some(flags) = &self.flag_values {
            var.put_attribute("flag_values", flags.clone())?;
        }
        if let Some(mapping) = &self.grid_mapping {
            var.put_attribute("grid_mapping", mapping.as_str())?;
        }
        if self.with_time {
            var.put_values(&self.data, (0, .., ..))?;
        } else {
            var.put_values(&self.data, (.., ..))?;
        }
        Ok(())
    }
}
