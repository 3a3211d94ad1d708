//! Catalog import and land-cover change statistics.
//!
//! Runs after reprojection:
//!
//! 1. [`import_directory`] links yearly archives into a JSON
//!    [`RasterCatalog`] as `landcover_{year}`, using pluggable
//!    [`NamingConvention`]s to find the year in each file name.
//! 2. [`StatisticsRun::run`] counts pixels per class for every catalog year,
//!    writes `{year}.csv` and `complete_stats.csv`, and renders a stacked
//!    area chart of class shares to `trends.png`.

pub mod catalog;
pub mod chart;
pub mod error;
pub mod import;
pub mod naming;
pub mod png;
pub mod stats;

pub use catalog::{raster_name, CatalogEntry, RasterCatalog};
pub use chart::{class_color, render_stacked_area_chart, DEFAULT_CHART_SIZE};
pub use error::{Result, StatsError};
pub use import::{import_directory, ImportSummary};
pub use naming::{C3sConvention, ConventionRegistry, EsaCciConvention, NamingConvention};
pub use stats::{
    class_count_report, count_report, parse_class_counts, year_statistics, ClassCount,
    ParseIssue, StatisticsRun, YearStatRow, CHART_FILE, COMPLETE_STATS_FILE,
};
