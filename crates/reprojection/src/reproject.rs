//! Reprojection of classification grids between coordinate systems.
//!
//! Output grids are regular in the target CRS: the source extent is
//! transformed by densified edge sampling, snapped to whole pixels of the
//! requested resolution, and each output pixel pulls its value from the
//! source grid through the inverse transform. Only label-preserving
//! resampling is offered, so the output contains no class code that was not
//! already in the input (plus the nodata sentinel).

use landcover_common::{keys, Attributes, Axis, BoundingBox, CrsCode, RasterGrid};
use projection::{CrsTransformer, DEFAULT_DENSIFY_POINTS};
use tracing::{debug, info};

use crate::config::ResamplingMethod;
use crate::error::{PipelineError, Result};

/// Largest output grid the reprojector will allocate.
pub const MAX_OUTPUT_PIXELS: usize = 1 << 31;

/// Relative tolerance for coordinate spacing to count as uniform.
const SPACING_TOLERANCE: f64 = 1e-3;

/// A reprojected grid and the sentinel used for pixels with no source data.
#[derive(Debug, Clone)]
pub struct ReprojectedGrid {
    pub grid: RasterGrid,
    pub nodata: u8,
}

/// Pick the nodata sentinel for a classification variable.
///
/// 255 when the declared classes include 0 (so 0 is a real class, or at
/// least a declared one), otherwise 0. Missing `flag_values` also gives 0.
pub fn select_nodata(attrs: &Attributes) -> u8 {
    let declares_zero = attrs
        .get(keys::FLAG_VALUES)
        .and_then(|v| v.as_i64_list())
        .map(|flags| flags.contains(&0))
        .unwrap_or(false);
    if declares_zero {
        255
    } else {
        0
    }
}

/// Affine description of a regular source grid, from pixel centers.
#[derive(Debug, Clone, Copy)]
struct SourceGeometry {
    x0: f64,
    dx: f64,
    y0: f64,
    dy: f64,
    width: usize,
    height: usize,
}

impl SourceGeometry {
    fn from_grid(grid: &RasterGrid) -> Result<Self> {
        let dx = axis_spacing(&grid.x)?;
        let dy = axis_spacing(&grid.y)?;
        let (dx, dy) = match (dx, dy) {
            (Some(dx), Some(dy)) => (dx, dy),
            // Single-sample axes borrow the other axis' pixel size
            (Some(dx), None) => (dx, -dx.abs()),
            (None, Some(dy)) => (dy.abs(), dy),
            (None, None) => {
                return Err(PipelineError::transform(
                    "cannot infer pixel size from a 1x1 grid",
                ))
            }
        };
        Ok(Self {
            x0: grid.x.values[0],
            dx,
            y0: grid.y.values[0],
            dy,
            width: grid.width,
            height: grid.height,
        })
    }

    /// Extent of the pixel edges.
    fn bounds(&self) -> BoundingBox {
        let x_last = self.x0 + self.dx * (self.width - 1) as f64;
        let y_last = self.y0 + self.dy * (self.height - 1) as f64;
        let half_x = self.dx.abs() / 2.0;
        let half_y = self.dy.abs() / 2.0;
        BoundingBox::new(
            self.x0.min(x_last) - half_x,
            self.y0.min(y_last) - half_y,
            self.x0.max(x_last) + half_x,
            self.y0.max(y_last) + half_y,
        )
    }

    /// Source (col, row) holding the point, rounding to the nearest center.
    fn index_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let col = ((x - self.x0) / self.dx).round();
        let row = ((y - self.y0) / self.dy).round();
        if !col.is_finite() || !row.is_finite() || col < 0.0 || row < 0.0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        (col < self.width && row < self.height).then_some((col, row))
    }
}

/// Signed, uniform spacing of an axis; `None` for single-sample axes.
fn axis_spacing(axis: &Axis) -> Result<Option<f64>> {
    let Some(step) = axis.spacing() else {
        return Ok(None);
    };
    if !step.is_finite() || step == 0.0 {
        return Err(PipelineError::transform(format!(
            "axis '{}' has degenerate spacing {}",
            axis.name, step
        )));
    }
    let irregular = axis
        .values
        .windows(2)
        .any(|w| ((w[1] - w[0]) - step).abs() > SPACING_TOLERANCE * step.abs());
    if irregular {
        return Err(PipelineError::transform(format!(
            "axis '{}' is not regularly spaced",
            axis.name
        )));
    }
    Ok(Some(step))
}

/// Number of whole pixels of size `res` needed to cover `extent`.
fn pixel_count(extent: f64, res: f64) -> usize {
    // Guard against 10.000000001 becoming 11 pixels
    let n = (extent / res - 1e-9).ceil();
    if n < 1.0 {
        1
    } else {
        n as usize
    }
}

fn target_axes(target: CrsCode) -> (&'static str, &'static str) {
    if target.is_geographic() {
        ("lon", "lat")
    } else {
        ("x", "y")
    }
}

/// Sub-pixel sample offsets used by mode resampling, in pixel units.
const MODE_OFFSETS: [f64; 3] = [-1.0 / 3.0, 0.0, 1.0 / 3.0];

/// Reproject `grid` to `target` at `resolution` (target CRS units).
pub fn reproject(
    grid: &RasterGrid,
    target: CrsCode,
    resolution: f64,
    method: ResamplingMethod,
) -> Result<ReprojectedGrid> {
    let source = grid
        .crs
        .ok_or_else(|| PipelineError::crs("grid has no CRS attached; normalize it first"))?;

    if grid.is_empty() {
        return Err(PipelineError::transform("cannot reproject an empty grid"));
    }
    grid.check_shape()
        .map_err(|e| PipelineError::transform(e.to_string()))?;
    if !resolution.is_finite() || resolution <= 0.0 {
        return Err(PipelineError::transform(format!(
            "resolution must be positive, got {}",
            resolution
        )));
    }

    let nodata = select_nodata(&grid.attrs);
    let geometry = SourceGeometry::from_grid(grid)?;
    let transformer = CrsTransformer::new(source, target);

    let src_bounds = geometry.bounds();
    let dst_bounds = transformer.transform_bounds(&src_bounds, DEFAULT_DENSIFY_POINTS)?;

    let width = pixel_count(dst_bounds.width(), resolution);
    let height = pixel_count(dst_bounds.height(), resolution);
    if width.saturating_mul(height) > MAX_OUTPUT_PIXELS {
        return Err(PipelineError::transform(format!(
            "output grid {}x{} at resolution {} exceeds {} pixels",
            width, height, resolution, MAX_OUTPUT_PIXELS
        )));
    }

    debug!(
        source = %source,
        target = %target,
        src_bounds = ?src_bounds,
        dst_bounds = ?dst_bounds,
        width,
        height,
        "Computed output grid"
    );

    let xs: Vec<f64> = (0..width)
        .map(|i| dst_bounds.min_x + (i as f64 + 0.5) * resolution)
        .collect();
    let ys: Vec<f64> = (0..height)
        .map(|j| dst_bounds.max_y - (j as f64 + 0.5) * resolution)
        .collect();

    let sample = |x: f64, y: f64| -> Option<u8> {
        let (sx, sy) = transformer.inverse(x, y).ok()?;
        let (col, row) = geometry.index_of(sx, sy)?;
        grid.get(col, row)
    };

    let mut data = vec![nodata; width * height];
    let mut filled = 0usize;
    for (row, &y) in ys.iter().enumerate() {
        for (col, &x) in xs.iter().enumerate() {
            let value = match method {
                ResamplingMethod::Nearest => sample(x, y),
                ResamplingMethod::Mode => {
                    let mut counts = [0u32; 256];
                    let mut any = false;
                    for oy in MODE_OFFSETS {
                        for ox in MODE_OFFSETS {
                            if let Some(v) = sample(x + ox * resolution, y + oy * resolution) {
                                counts[v as usize] += 1;
                                any = true;
                            }
                        }
                    }
                    // max_by_key keeps the last maximum, so scan codes high to low
                    any.then(|| {
                        (0..=255u8)
                            .rev()
                            .max_by_key(|&code| counts[code as usize])
                            .unwrap_or(nodata)
                    })
                }
            };
            if let Some(v) = value {
                data[row * width + col] = v;
                filled += 1;
            }
        }
    }

    let (x_name, y_name) = target_axes(target);
    let mut out = RasterGrid::new(
        grid.variable.clone(),
        data,
        Axis::new(x_name, xs),
        Axis::new(y_name, ys),
    )
    .map_err(|e| PipelineError::transform(e.to_string()))?;
    out.time = grid.time.clone();
    out.attrs = grid.attrs.clone();
    out.crs = Some(target);

    info!(
        variable = %grid.variable,
        source = %source,
        target = %target,
        resampling = %method,
        width,
        height,
        filled,
        nodata,
        "Reprojected grid"
    );

    Ok(ReprojectedGrid { grid: out, nodata })
}

#[cfg(test)]
mod tests {
    use super::*;
    use landcover_common::AttrValue;
    use test_utils::{assert_approx_eq, create_striped_classes, regular_axis};

    fn geographic_grid(width: usize, height: usize, data: Vec<u8>, step: f64) -> RasterGrid {
        let mut grid = RasterGrid::new(
            "lccs_class",
            data,
            Axis::new("lon", regular_axis(5.0, step, width)),
            Axis::new("lat", regular_axis(50.0, -step, height)),
        )
        .unwrap();
        grid.crs = Some(CrsCode::Epsg4326);
        grid
    }

    #[test]
    fn test_select_nodata() {
        let mut attrs = Attributes::new();
        assert_eq!(select_nodata(&attrs), 0);

        attrs.insert(keys::FLAG_VALUES, vec![10i64, 20, 30]);
        assert_eq!(select_nodata(&attrs), 0);

        attrs.insert(keys::FLAG_VALUES, vec![0i64, 10, 20]);
        assert_eq!(select_nodata(&attrs), 255);

        attrs.insert(keys::FLAG_VALUES, AttrValue::Text("0 10 20".into()));
        assert_eq!(select_nodata(&attrs), 255);
    }

    #[test]
    fn test_requires_crs() {
        let mut grid = geographic_grid(2, 2, vec![1, 2, 3, 4], 0.01);
        grid.crs = None;
        let err = reproject(&grid, CrsCode::Epsg3035, 300.0, ResamplingMethod::Nearest).unwrap_err();
        assert!(matches!(err, PipelineError::Crs(_)));
    }

    #[test]
    fn test_rejects_bad_resolution() {
        let grid = geographic_grid(2, 2, vec![1, 2, 3, 4], 0.01);
        for res in [0.0, -300.0, f64::INFINITY] {
            let err = reproject(&grid, CrsCode::Epsg3035, res, ResamplingMethod::Nearest).unwrap_err();
            assert!(matches!(err, PipelineError::Transform(_)));
        }
    }

    #[test]
    fn test_identity_reprojection_keeps_pixels() {
        let data: Vec<u8> = (0..12).collect();
        let grid = geographic_grid(4, 3, data.clone(), 0.5);

        let out = reproject(&grid, CrsCode::Epsg4326, 0.5, ResamplingMethod::Nearest).unwrap();
        assert_eq!((out.grid.width, out.grid.height), (4, 3));
        assert_eq!(out.grid.data, data);
        assert_eq!(out.grid.x.values, grid.x.values);
        assert_eq!(out.grid.y.values, grid.y.values);
    }

    #[test]
    fn test_laea_output_geometry_and_codes() {
        let (w, h) = (40, 30);
        let codes = [10u8, 30, 190, 210];
        let mut grid = geographic_grid(w, h, create_striped_classes(w, h, &codes, 5), 0.01);
        grid.attrs.insert(keys::FLAG_VALUES, vec![0i64, 10, 30, 190, 210]);

        let out = reproject(&grid, CrsCode::Epsg3035, 300.0, ResamplingMethod::Nearest).unwrap();

        assert_eq!(out.nodata, 255);
        assert_eq!(out.grid.crs, Some(CrsCode::Epsg3035));
        assert_eq!(out.grid.x.name, "x");
        assert_approx_eq!(out.grid.x.spacing().unwrap(), 300.0, 1e-6);
        assert_approx_eq!(out.grid.y.spacing().unwrap(), -300.0, 1e-6);

        let allowed: std::collections::BTreeSet<u8> =
            codes.iter().copied().chain(std::iter::once(255)).collect();
        assert!(out.grid.class_codes().is_subset(&allowed));
        // Most of the footprint is covered
        let filled = out.grid.data.iter().filter(|&&v| v != 255).count();
        assert!(filled * 2 > out.grid.data.len());
    }

    #[test]
    fn test_mode_prefers_majority_and_smallest_on_tie() {
        // 0.3 deg pixels resampled to 0.9 deg: each output pixel sees a 3x3 block
        let data = vec![
            7, 7, 9, 4, 4, 5, //
            7, 9, 9, 4, 5, 5, //
            7, 9, 9, 6, 6, 6, //
        ];
        let grid = geographic_grid(6, 3, data, 0.3);

        let out = reproject(&grid, CrsCode::Epsg4326, 0.9, ResamplingMethod::Mode).unwrap();
        assert_eq!((out.grid.width, out.grid.height), (2, 1));
        // Left block: five 9s beat four 7s. Right block: 4, 5 and 6 tie at three each.
        assert_eq!(out.grid.data, vec![9, 4]);
    }

    #[test]
    fn test_single_row_borrows_column_spacing() {
        let grid = geographic_grid(4, 1, vec![1, 2, 3, 4], 0.5);
        let out = reproject(&grid, CrsCode::Epsg4326, 0.5, ResamplingMethod::Nearest).unwrap();
        assert_eq!((out.grid.width, out.grid.height), (4, 1));
        assert_eq!(out.grid.data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_irregular_axis_rejected() {
        let mut grid = geographic_grid(3, 2, vec![1; 6], 0.5);
        grid.x.values = vec![0.0, 0.5, 2.0];
        let err = reproject(&grid, CrsCode::Epsg3035, 300.0, ResamplingMethod::Nearest).unwrap_err();
        assert!(matches!(err, PipelineError::Transform(_)));
    }

    #[test]
    fn test_pixel_count() {
        assert_eq!(pixel_count(3000.0, 300.0), 10);
        assert_eq!(pixel_count(3000.0000001, 300.0), 10);
        assert_eq!(pixel_count(3001.0, 300.0), 11);
        assert_eq!(pixel_count(0.0, 300.0), 1);
    }
}
