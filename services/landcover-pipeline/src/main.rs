//! Land-cover pipeline command line.
//!
//! Reprojects yearly land-cover archives, links them into a raster catalog
//! and computes per-year class statistics with a trend chart.

mod config_loader;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use landcover_common::CrsCode;
use landcover_stats::{import_directory, ConventionRegistry, RasterCatalog, StatisticsRun};
use reprojection::{BatchDriver, ResamplingMethod};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config_loader::{load_config, AppConfig};

#[derive(Parser, Debug)]
#[command(name = "landcover-pipeline")]
#[command(about = "Reproject land-cover archives and compute class statistics")]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true, env = "LC_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reproject every input file
    Reproject {
        #[arg(long)]
        input_dir: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Target CRS, e.g. EPSG:3035
        #[arg(long)]
        target_crs: Option<String>,
        /// Output pixel size in target CRS units
        #[arg(long)]
        resolution: Option<f64>,
        /// nearest or mode
        #[arg(long)]
        resampling: Option<String>,
    },
    /// Link reprojected files into the raster catalog
    Import {
        /// Directory to import (default: the reprojection output)
        #[arg(long)]
        dir: Option<PathBuf>,
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Compute class statistics and the trend chart from the catalog
    Stats {
        #[arg(long)]
        catalog: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Reproject, import and compute statistics in one go
    Run,
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json)?;
    netcdf_io::silence_hdf5_errors();

    let mut config = load_config(args.config.as_deref())?;
    info!(
        config = ?args.config,
        input_dir = %config.pipeline.input_dir.display(),
        output_dir = %config.pipeline.output_dir.display(),
        "Loaded configuration"
    );

    match args.command {
        Command::Reproject {
            input_dir,
            output_dir,
            target_crs,
            resolution,
            resampling,
        } => {
            if let Some(dir) = input_dir {
                config.pipeline.input_dir = dir;
            }
            if let Some(dir) = output_dir {
                config.pipeline.output_dir = dir;
            }
            if let Some(crs) = target_crs {
                config.pipeline.target_crs = CrsCode::parse(&crs)?;
            }
            if let Some(res) = resolution {
                config.pipeline.target_resolution = res;
            }
            if let Some(method) = resampling {
                config.pipeline.resampling = method
                    .parse::<ResamplingMethod>()
                    .map_err(anyhow::Error::msg)?;
            }
            config.validate()?;
            reproject(&config)
        }
        Command::Import { dir, catalog } => {
            if let Some(dir) = dir {
                config.import.input_dir = Some(dir);
            }
            if let Some(catalog) = catalog {
                config.import.catalog_path = catalog;
            }
            import(&config)
        }
        Command::Stats {
            catalog,
            output_dir,
        } => {
            if let Some(catalog) = catalog {
                config.import.catalog_path = catalog;
            }
            if let Some(dir) = output_dir {
                config.stats.output_dir = dir;
            }
            stats(&config)
        }
        Command::Run => {
            reproject(&config)?;
            import(&config)?;
            stats(&config)
        }
    }
}

fn reproject(config: &AppConfig) -> Result<()> {
    let driver = BatchDriver::new(config.pipeline.clone())?;
    let summary = driver.run().context("Reprojection batch failed")?;

    if let Some(report) = &summary.verification {
        if !report.is_consistent() {
            warn!(path = %report.path.display(), "Verified output is not fully georeferenced");
        }
    }
    println!(
        "reprojected {} file(s), {} failed",
        summary.succeeded_count(),
        summary.failed_count()
    );
    Ok(())
}

fn import(config: &AppConfig) -> Result<()> {
    let mut catalog = RasterCatalog::open(&config.import.catalog_path)
        .with_context(|| format!("Failed to open catalog {:?}", config.import.catalog_path))?;
    let summary = import_directory(
        config.import_dir(),
        &ConventionRegistry::default(),
        &mut catalog,
        &config.pipeline.variable,
    )
    .with_context(|| format!("Failed to import {:?}", config.import_dir()))?;

    println!(
        "imported {} raster(s), {} skipped, {} failed",
        summary.imported.len(),
        summary.skipped.len(),
        summary.failed.len()
    );
    Ok(())
}

fn stats(config: &AppConfig) -> Result<()> {
    let catalog = RasterCatalog::open(&config.import.catalog_path)
        .with_context(|| format!("Failed to open catalog {:?}", config.import.catalog_path))?;
    let run = StatisticsRun::run(&catalog, &config.stats.output_dir)
        .context("Statistics run failed")?;

    println!(
        "statistics for {} year(s), {} failed",
        run.years.len(),
        run.failed_years.len()
    );
    Ok(())
}
