//! Post-run verification of a written output.

use std::path::{Path, PathBuf};

use landcover_common::{keys, CrsCode, SPATIAL_REF_VAR};
use netcdf_io::FileSummary;
use tracing::{info, warn};

/// Number of leading coordinate values reported per axis.
const HEAD_LEN: usize = 5;

/// What the verifier found in one output file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationReport {
    pub path: PathBuf,
    /// CRS recovered from the file's metadata.
    pub crs: Option<CrsCode>,
    /// `grid_mapping` attribute of the class variable.
    pub grid_mapping: Option<String>,
    pub x_head: Vec<f64>,
    pub y_head: Vec<f64>,
    pub has_spatial_ref: bool,
    pub spatial_ref_keys: Vec<String>,
    /// Set when the file could not be inspected.
    pub error: Option<String>,
}

impl VerificationReport {
    /// True when the file is georeferenced the way the writer lays it out.
    pub fn is_consistent(&self) -> bool {
        self.error.is_none()
            && self.crs.is_some()
            && self.has_spatial_ref
            && self.grid_mapping.as_deref() == Some(SPATIAL_REF_VAR)
            && !self.x_head.is_empty()
            && !self.y_head.is_empty()
    }
}

fn recover_crs(summary: &FileSummary, companion: &str) -> Option<CrsCode> {
    if let Some(var) = summary.variable(companion) {
        if let Some(crs) = var.attrs.text(keys::CRS_WKT).and_then(CrsCode::from_wkt) {
            return Some(crs);
        }
        if let Some(crs) = var
            .attrs
            .text(keys::SPATIAL_REF)
            .and_then(|s| CrsCode::from_wkt(s).or_else(|| CrsCode::parse(s).ok()))
        {
            return Some(crs);
        }
    }
    summary
        .global_attrs
        .text(keys::SPATIAL_REF)
        .and_then(|s| CrsCode::parse(s).ok())
}

/// Re-open `path` and report its georeferencing.
///
/// Never fails: problems are recorded in the report's `error` field.
pub fn verify_output(path: impl AsRef<Path>, variable: &str) -> VerificationReport {
    let path = path.as_ref();
    let mut report = VerificationReport {
        path: path.to_path_buf(),
        ..Default::default()
    };

    let summary = match netcdf_io::inspect(path) {
        Ok(summary) => summary,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Verification could not open output");
            report.error = Some(e.to_string());
            return report;
        }
    };

    let class_var = match summary.variable(variable) {
        Some(var) => var,
        None => {
            report.error = Some(format!("variable '{}' not found", variable));
            return report;
        }
    };
    report.grid_mapping = class_var.attrs.text(keys::GRID_MAPPING).map(str::to_string);

    let companion = report.grid_mapping.as_deref().unwrap_or(SPATIAL_REF_VAR);
    if let Some(var) = summary.variable(companion) {
        report.has_spatial_ref = true;
        report.spatial_ref_keys = var.attrs.keys().map(str::to_string).collect();
    }
    report.crs = recover_crs(&summary, companion);

    let dims = &class_var.dimensions;
    if dims.len() >= 2 {
        let y_name = &dims[dims.len() - 2];
        let x_name = &dims[dims.len() - 1];
        match (
            netcdf_io::read_coordinate(path, x_name),
            netcdf_io::read_coordinate(path, y_name),
        ) {
            (Ok(xs), Ok(ys)) => {
                report.x_head = xs.into_iter().take(HEAD_LEN).collect();
                report.y_head = ys.into_iter().take(HEAD_LEN).collect();
            }
            (Err(e), _) | (_, Err(e)) => report.error = Some(e.to_string()),
        }
    } else {
        report.error = Some(format!(
            "variable '{}' has {} dimensions",
            variable,
            dims.len()
        ));
    }

    info!(
        path = %path.display(),
        crs = ?report.crs.map(|c| c.to_string()),
        grid_mapping = ?report.grid_mapping,
        x_head = ?report.x_head,
        y_head = ?report.y_head,
        has_spatial_ref = report.has_spatial_ref,
        spatial_ref_attrs = report.spatial_ref_keys.len(),
        consistent = report.is_consistent(),
        "Verified output"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{temp_test_dir, write_corrupt_file, LandCoverFixture};

    #[test]
    fn test_unreadable_file_is_reported() {
        let dir = temp_test_dir();
        let path = dir.path().join("out.nc");
        write_corrupt_file(&path).unwrap();

        let report = verify_output(&path, "lccs_class");
        assert!(report.error.is_some());
        assert!(!report.is_consistent());
    }

    #[test]
    fn test_input_without_companion_is_inconsistent() {
        let dir = temp_test_dir();
        let path = dir.path().join("in.nc");
        LandCoverFixture::new(6, 3).write(&path).unwrap();

        let report = verify_output(&path, "lccs_class");
        assert!(report.error.is_none());
        assert_eq!(report.grid_mapping.as_deref(), Some("crs"));
        assert!(!report.has_spatial_ref);
        assert_eq!(report.x_head.len(), 5);
        assert_eq!(report.y_head.len(), 3);
        assert!(!report.is_consistent());
    }

    #[test]
    fn test_missing_variable() {
        let dir = temp_test_dir();
        let path = dir.path().join("in.nc");
        LandCoverFixture::new(2, 2).write(&path).unwrap();

        let report = verify_output(&path, "other");
        assert!(report.error.unwrap().contains("other"));
    }
}
