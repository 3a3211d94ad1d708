//! Import step: links yearly land-cover files into the raster catalog.

use std::path::{Path, PathBuf};

use chrono::Utc;
use landcover_common::{keys, CrsCode, SPATIAL_REF_VAR};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::catalog::{raster_name, CatalogEntry, RasterCatalog};
use crate::error::{Result, StatsError};
use crate::naming::ConventionRegistry;

/// What an import run did with each file.
#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    /// `(year, raster name)` of linked files.
    pub imported: Vec<(u16, String)>,
    /// Files no naming convention recognized.
    pub skipped: Vec<PathBuf>,
    /// Recognized files that could not be linked.
    pub failed: Vec<(PathBuf, String)>,
}

fn netcdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| StatsError::read(dir.display().to_string(), e.to_string()))?;
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_file() && name.ends_with(".nc") && !name.ends_with(".aux.xml") {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Read the header of `path` into a catalog entry.
fn link_raster(
    path: &Path,
    variable: &str,
    year: u16,
    convention: &str,
) -> std::result::Result<CatalogEntry, String> {
    let summary = netcdf_io::inspect(path).map_err(|e| e.to_string())?;
    let var = summary
        .variable(variable)
        .ok_or_else(|| format!("variable '{}' not found", variable))?;

    let dims = &var.dimensions;
    if dims.len() < 2 {
        return Err(format!("variable '{}' is not a grid", variable));
    }
    let (y_dim, x_dim) = (&dims[dims.len() - 2], &dims[dims.len() - 1]);
    let width = summary.dimension_len(x_dim).unwrap_or(0);
    let height = summary.dimension_len(y_dim).unwrap_or(0);

    let companion = var.attrs.text(keys::GRID_MAPPING).unwrap_or(SPATIAL_REF_VAR);
    let crs = summary
        .variable(companion)
        .and_then(|v| v.attrs.text(keys::CRS_WKT))
        .and_then(CrsCode::from_wkt)
        .or_else(|| {
            summary
                .global_attrs
                .text(keys::SPATIAL_REF)
                .and_then(|s| CrsCode::parse(s).ok())
        });

    let resolution = netcdf_io::read_coordinate(path, x_dim)
        .ok()
        .filter(|xs| xs.len() > 1)
        .map(|xs| ((xs[xs.len() - 1] - xs[0]) / (xs.len() - 1) as f64).abs());

    Ok(CatalogEntry {
        raster_name: raster_name(year),
        year,
        source: path.to_path_buf(),
        convention: convention.to_string(),
        variable: variable.to_string(),
        width,
        height,
        crs,
        resolution,
        imported_at: Utc::now(),
    })
}

/// Link every recognized `.nc` file in `dir` into `catalog` and save it.
///
/// Files are visited in name order. Unrecognized names are skipped and a
/// file that fails to link is recorded; neither stops the import. A year
/// imported again replaces its earlier entry.
pub fn import_directory(
    dir: impl AsRef<Path>,
    registry: &ConventionRegistry,
    catalog: &mut RasterCatalog,
    variable: &str,
) -> Result<ImportSummary> {
    let dir = dir.as_ref();
    let mut summary = ImportSummary::default();

    for path in netcdf_files(dir)? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (convention, year) = match registry.recognize(&name) {
            Some(found) => found,
            None => {
                warn!(file = %name, "Skipping file with unknown naming convention");
                summary.skipped.push(path);
                continue;
            }
        };

        match link_raster(&path, variable, year, convention) {
            Ok(entry) => {
                info!(file = %name, raster = %entry.raster_name, "Linked raster");
                summary.imported.push((year, entry.raster_name.clone()));
                catalog.insert(entry);
            }
            Err(e) => {
                error!(file = %name, error = %e, "Failed to link raster");
                summary.failed.push((path, e));
            }
        }
    }

    catalog.save()?;

    info!(
        imported = summary.imported.len(),
        skipped = summary.skipped.len(),
        failed = summary.failed.len(),
        catalog = %catalog.path().display(),
        "Import finished"
    );
    if summary.failed.is_empty() {
        info!("All recognized files imported successfully");
    } else {
        for (path, e) in &summary.failed {
            warn!(file = %path.display(), error = %e, "File was not imported");
        }
    }

    Ok(summary)
}
