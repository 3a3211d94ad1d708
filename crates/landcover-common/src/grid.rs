//! In-memory raster grids and the output dataset model.

use std::collections::BTreeSet;

use crate::attributes::Attributes;
use crate::bbox::BoundingBox;
use crate::crs::CrsCode;

/// Name of the scalar companion variable that carries the CRS description.
pub const SPATIAL_REF_VAR: &str = "spatial_ref";

/// A 1-D coordinate axis of pixel-center values.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub name: String,
    pub values: Vec<f64>,
    pub attrs: Attributes,
}

impl Axis {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
            attrs: Attributes::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Signed step between consecutive samples, from the first and last value.
    ///
    /// Returns `None` for axes with fewer than two samples.
    pub fn spacing(&self) -> Option<f64> {
        let n = self.values.len();
        if n < 2 {
            return None;
        }
        Some((self.values[n - 1] - self.values[0]) / (n - 1) as f64)
    }

    /// The first `n` values (fewer if the axis is shorter).
    pub fn head(&self, n: usize) -> &[f64] {
        &self.values[..n.min(self.values.len())]
    }
}

/// The single time value selected from a time dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeCoord {
    pub name: String,
    pub value: f64,
    pub attrs: Attributes,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridShapeError {
    #[error("Data length {actual} does not match {width}x{height} grid")]
    DataLength {
        width: usize,
        height: usize,
        actual: usize,
    },
    #[error("Axis '{name}' has {actual} values, expected {expected}")]
    AxisLength {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// A 2-D classification raster, row-major with row 0 at `y.values[0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    pub variable: String,
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub x: Axis,
    pub y: Axis,
    pub time: Option<TimeCoord>,
    pub attrs: Attributes,
    pub crs: Option<CrsCode>,
}

impl RasterGrid {
    /// Build a grid, checking that data and axes agree on the shape.
    pub fn new(
        variable: impl Into<String>,
        data: Vec<u8>,
        x: Axis,
        y: Axis,
    ) -> Result<Self, GridShapeError> {
        let width = x.len();
        let height = y.len();
        if data.len() != width * height {
            return Err(GridShapeError::DataLength {
                width,
                height,
                actual: data.len(),
            });
        }
        Ok(Self {
            variable: variable.into(),
            data,
            width,
            height,
            x,
            y,
            time: None,
            attrs: Attributes::new(),
            crs: None,
        })
    }

    /// Check the shape invariant on a grid assembled by hand.
    pub fn check_shape(&self) -> Result<(), GridShapeError> {
        if self.x.len() != self.width {
            return Err(GridShapeError::AxisLength {
                name: self.x.name.clone(),
                expected: self.width,
                actual: self.x.len(),
            });
        }
        if self.y.len() != self.height {
            return Err(GridShapeError::AxisLength {
                name: self.y.name.clone(),
                expected: self.height,
                actual: self.y.len(),
            });
        }
        if self.data.len() != self.width * self.height {
            return Err(GridShapeError::DataLength {
                width: self.width,
                height: self.height,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Value at (col, row), if in range.
    pub fn get(&self, col: usize, row: usize) -> Option<u8> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    /// Distinct class codes present in the grid.
    pub fn class_codes(&self) -> BTreeSet<u8> {
        self.data.iter().copied().collect()
    }

    /// Extent of the pixel centers.
    pub fn center_bounds(&self) -> Option<BoundingBox> {
        let mut bbox = BoundingBox::empty();
        for &x in &self.x.values {
            for &y in [self.y.values.first(), self.y.values.last()].into_iter().flatten() {
                bbox.include(x, y);
            }
        }
        bbox.is_valid().then_some(bbox)
    }
}

/// A named data variable laid out as `time(1), y, x`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataVariable {
    pub name: String,
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub attrs: Attributes,
}

/// A self-describing output dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterDataset {
    pub variable: DataVariable,
    pub x: Axis,
    pub y: Axis,
    pub time: TimeCoord,
    /// Attributes of the scalar `spatial_ref` companion variable.
    pub spatial_ref: Attributes,
    pub global_attrs: Attributes,
}

/// Storage options for one variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VariableEncoding {
    /// Deflate level 1-9, `None` for uncompressed.
    pub deflate_level: Option<u8>,
    pub fill_value: Option<u8>,
}

/// Storage options for a whole dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DatasetEncoding {
    pub variable: VariableEncoding,
    pub spatial_ref: VariableEncoding,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid() -> RasterGrid {
        RasterGrid::new(
            "lccs_class",
            vec![10, 10, 20, 30, 30, 10],
            Axis::new("lon", vec![0.0, 1.0, 2.0]),
            Axis::new("lat", vec![51.0, 50.0]),
        )
        .unwrap()
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = RasterGrid::new(
            "v",
            vec![0; 5],
            Axis::new("x", vec![0.0, 1.0, 2.0]),
            Axis::new("y", vec![0.0, 1.0]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            GridShapeError::DataLength {
                width: 3,
                height: 2,
                actual: 5
            }
        );
    }

    #[test]
    fn test_get_and_codes() {
        let grid = sample_grid();
        assert_eq!(grid.get(2, 0), Some(20));
        assert_eq!(grid.get(0, 1), Some(30));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.class_codes().into_iter().collect::<Vec<_>>(), vec![10, 20, 30]);
    }

    #[test]
    fn test_axis_spacing() {
        let grid = sample_grid();
        assert_eq!(grid.x.spacing(), Some(1.0));
        assert_eq!(grid.y.spacing(), Some(-1.0));
        assert_eq!(Axis::new("t", vec![5.0]).spacing(), None);
        assert_eq!(grid.x.head(5), &[0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_center_bounds() {
        let bbox = sample_grid().center_bounds().unwrap();
        assert_eq!(bbox, BoundingBox::new(0.0, 50.0, 2.0, 51.0));
    }

    #[test]
    fn test_check_shape_axis() {
        let mut grid = sample_grid();
        grid.x.values.pop();
        assert!(matches!(grid.check_shape(), Err(GridShapeError::AxisLength { .. })));
    }
}
