//! Per-year class statistics.
//!
//! Each catalog raster is reduced to a `code count` report (one line per
//! class, nodata excluded), which is parsed back into counts and turned
//! into area and share rows. Reports use the same line format as GRASS
//! `r.stats -cn`, so externally produced reports parse the same way.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use landcover_common::{keys, RasterGrid};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::catalog::{CatalogEntry, RasterCatalog};
use crate::chart::{render_stacked_area_chart, DEFAULT_CHART_SIZE};
use crate::error::{Result, StatsError};

/// Combined table written after all years.
pub const COMPLETE_STATS_FILE: &str = "complete_stats.csv";

/// Chart written after all years.
pub const CHART_FILE: &str = "trends.png";

/// Pixel count of one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassCount {
    pub code: u8,
    pub count: u64,
}

/// A report line that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIssue {
    pub year: u16,
    /// 1-based line number.
    pub line: usize,
    pub text: String,
    pub message: String,
}

/// One row of the statistics tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearStatRow {
    pub year: u16,
    pub code: u8,
    pub count: u64,
    pub area_km2: f64,
    pub pct: f64,
}

/// `code count` lines for every class in `grid`, skipping `nodata`.
pub fn count_report(grid: &RasterGrid, nodata: Option<u8>) -> String {
    let mut counts: BTreeMap<u8, u64> = BTreeMap::new();
    for &code in &grid.data {
        if Some(code) != nodata {
            *counts.entry(code).or_default() += 1;
        }
    }
    counts
        .iter()
        .map(|(code, count)| format!("{} {}\n", code, count))
        .collect()
}

/// Read the raster behind `entry` and produce its class count report.
///
/// The nodata sentinel is the variable's `_FillValue`.
pub fn class_count_report(entry: &CatalogEntry) -> Result<String> {
    let slice = netcdf_io::read_raster_slice(&entry.source, &entry.variable, 0)
        .map_err(|e| StatsError::read(entry.source.display().to_string(), e.to_string()))?;
    let nodata = slice
        .grid
        .attrs
        .get(keys::FILL_VALUE)
        .and_then(|v| v.as_f64())
        .filter(|v| (0.0..=255.0).contains(v))
        .map(|v| v as u8);
    Ok(count_report(&slice.grid, nodata))
}

fn parse_line(line: &str) -> std::result::Result<ClassCount, String> {
    let mut fields = line.split_whitespace();
    let (code, count) = match (fields.next(), fields.next(), fields.next()) {
        (Some(code), Some(count), None) => (code, count),
        _ => return Err("expected two fields".to_string()),
    };
    let code = code
        .parse::<u8>()
        .map_err(|e| format!("invalid class code '{}': {}", code, e))?;
    let count = count
        .parse::<u64>()
        .map_err(|e| format!("invalid count '{}': {}", count, e))?;
    Ok(ClassCount { code, count })
}

/// Parse a `code count` report. Bad lines are reported, not fatal.
pub fn parse_class_counts(year: u16, text: &str) -> (Vec<ClassCount>, Vec<ParseIssue>) {
    let mut counts = Vec::new();
    let mut issues = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(count) => counts.push(count),
            Err(message) => {
                warn!(year, line = i + 1, text = %line, error = %message, "Skipping class count line");
                issues.push(ParseIssue {
                    year,
                    line: i + 1,
                    text: line.to_string(),
                    message,
                });
            }
        }
    }

    (counts, issues)
}

/// Area and share rows for one year.
///
/// `resolution` is the pixel size in metres, so one pixel covers
/// `resolution² / 1e6` km². Shares are of the counted (non-nodata) pixels.
pub fn year_statistics(year: u16, counts: &[ClassCount], resolution: f64) -> Vec<YearStatRow> {
    let total: u64 = counts.iter().map(|c| c.count).sum();
    if total == 0 {
        return Vec::new();
    }
    let pixel_km2 = resolution * resolution / 1e6;
    counts
        .iter()
        .map(|c| YearStatRow {
            year,
            code: c.code,
            count: c.count,
            area_km2: c.count as f64 * pixel_km2,
            pct: c.count as f64 / total as f64 * 100.0,
        })
        .collect()
}

fn write_rows(path: &Path, rows: &[YearStatRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Outcome of a statistics run over the whole catalog.
#[derive(Debug, Clone, Default)]
pub struct StatisticsRun {
    /// Years with statistics, ascending.
    pub years: Vec<u16>,
    pub rows: Vec<YearStatRow>,
    pub issues: Vec<ParseIssue>,
    pub failed_years: Vec<(u16, String)>,
    /// Written chart, if any year produced rows.
    pub chart: Option<PathBuf>,
}

impl StatisticsRun {
    /// Compute statistics for every catalog year and write the tables and chart.
    ///
    /// Writes `{year}.csv` per year and `complete_stats.csv` plus `trends.png`
    /// across years. A year that fails is logged and left out.
    pub fn run(catalog: &RasterCatalog, out_dir: impl AsRef<Path>) -> Result<Self> {
        let out_dir = out_dir.as_ref();
        fs::create_dir_all(out_dir)?;

        let mut run = Self::default();
        for entry in catalog.entries() {
            match run.process_year(entry, out_dir) {
                Ok(rows) if rows.is_empty() => {
                    warn!(year = entry.year, "No classified pixels");
                }
                Ok(rows) => {
                    run.years.push(entry.year);
                    run.rows.extend(rows);
                }
                Err(e) => {
                    error!(year = entry.year, error = %e, "Failed to compute statistics");
                    run.failed_years.push((entry.year, e.to_string()));
                }
            }
        }

        if run.rows.is_empty() {
            warn!(catalog = %catalog.path().display(), "No valid data was processed");
            return Ok(run);
        }

        write_rows(&out_dir.join(COMPLETE_STATS_FILE), &run.rows)?;

        let (width, height) = DEFAULT_CHART_SIZE;
        let png = render_stacked_area_chart(&run.rows, width, height)?;
        let chart = out_dir.join(CHART_FILE);
        fs::write(&chart, png)?;
        run.chart = Some(chart);

        info!(
            years = run.years.len(),
            rows = run.rows.len(),
            failed = run.failed_years.len(),
            parse_issues = run.issues.len(),
            out_dir = %out_dir.display(),
            "Statistics finished"
        );
        Ok(run)
    }

    fn process_year(&mut self, entry: &CatalogEntry, out_dir: &Path) -> Result<Vec<YearStatRow>> {
        let resolution = entry.resolution.ok_or_else(|| {
            StatsError::read(
                entry.source.display().to_string(),
                "pixel size unknown (no x coordinate spacing)",
            )
        })?;
        if entry.crs.map(|c| c.is_geographic()).unwrap_or(false) {
            warn!(
                year = entry.year,
                resolution,
                "Raster is geographic; area_km2 assumes a resolution in metres"
            );
        }

        let report = class_count_report(entry)?;
        let (counts, issues) = parse_class_counts(entry.year, &report);
        self.issues.extend(issues);

        let rows = year_statistics(entry.year, &counts, resolution);
        if !rows.is_empty() {
            write_rows(&out_dir.join(format!("{}.csv", entry.year)), &rows)?;
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landcover_common::Axis;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_count_report_excludes_nodata() {
        let grid = RasterGrid::new(
            "lccs_class",
            vec![10, 255, 30, 10, 255, 210],
            Axis::new("x", vec![0.0, 1.0, 2.0]),
            Axis::new("y", vec![1.0, 0.0]),
        )
        .unwrap();
        assert_eq!(count_report(&grid, Some(255)), "10 2\n30 1\n210 1\n");
        assert_eq!(count_report(&grid, None), "10 2\n30 1\n210 1\n255 2\n");
    }

    #[test]
    fn test_parse_tolerates_bad_lines() {
        let text = "10 400\n\n* 12\n30 abc\n190 100 7\n  210   500  \n";
        let (counts, issues) = parse_class_counts(2001, text);

        assert_eq!(
            counts,
            vec![
                ClassCount { code: 10, count: 400 },
                ClassCount { code: 210, count: 500 },
            ]
        );
        assert_eq!(issues.len(), 3);
        assert_eq!(issues[0].line, 3);
        assert_eq!(issues[0].text, "* 12");
        assert!(issues.iter().all(|i| i.year == 2001));
    }

    #[test]
    fn test_year_statistics() {
        let counts = [
            ClassCount { code: 10, count: 300 },
            ClassCount { code: 30, count: 100 },
        ];
        let rows = year_statistics(1995, &counts, 300.0);

        assert_eq!(rows.len(), 2);
        assert_approx_eq!(rows[0].area_km2, 27.0, 1e-9);
        assert_approx_eq!(rows[0].pct, 75.0, 1e-9);
        assert_approx_eq!(rows[1].area_km2, 9.0, 1e-9);
        assert_approx_eq!(rows[1].pct, 25.0, 1e-9);
    }

    #[test]
    fn test_year_statistics_empty() {
        assert!(year_statistics(1995, &[], 300.0).is_empty());
    }
}
