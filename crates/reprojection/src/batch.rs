//! Batch driver: runs the pipeline over every input file in a directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, instrument, warn};
use walkdir::WalkDir;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::loader::load_dataset;
use crate::normalize::normalize_crs;
use crate::rebuild::{rebuild_dataset, RebuildOptions};
use crate::reproject::reproject;
use crate::verify::{verify_output, VerificationReport};
use crate::writer::write_dataset;

/// Prefix shared by every output file name.
const OUTPUT_PREFIX: &str = "reprojected_";

/// Result of processing one input file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Succeeded { input: PathBuf, output: PathBuf },
    Failed { input: PathBuf, error: PipelineError },
}

impl FileOutcome {
    pub fn input(&self) -> &Path {
        match self {
            Self::Succeeded { input, .. } | Self::Failed { input, .. } => input,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Outcomes of one batch run, in processing order.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<FileOutcome>,
    pub verification: Option<VerificationReport>,
}

impl RunSummary {
    /// `(input, output)` pairs of the files that were written.
    pub fn succeeded(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.outcomes.iter().filter_map(|o| match o {
            FileOutcome::Succeeded { input, output } => Some((input.as_path(), output.as_path())),
            FileOutcome::Failed { .. } => None,
        })
    }

    /// `(input, error)` pairs of the files that failed.
    pub fn failed(&self) -> impl Iterator<Item = (&Path, &PipelineError)> {
        self.outcomes.iter().filter_map(|o| match o {
            FileOutcome::Failed { input, error } => Some((input.as_path(), error)),
            FileOutcome::Succeeded { .. } => None,
        })
    }

    pub fn succeeded_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(FileOutcome::is_success)
    }
}

fn is_candidate(name: &str, suffix: &str) -> bool {
    !name.starts_with('.') && !name.ends_with(".aux.xml") && name.ends_with(suffix)
}

/// Files in `dir` (not recursive) whose names end with `suffix`, sorted by name.
fn list_files(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            PipelineError::Config(format!("cannot list {}: {}", dir.display(), e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if is_candidate(&name, suffix) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Sequential driver for the load → normalize → reproject → rebuild → write chain.
#[derive(Debug, Clone)]
pub struct BatchDriver {
    config: PipelineConfig,
}

impl BatchDriver {
    /// Create a driver, rejecting an invalid configuration up front.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate().map_err(PipelineError::Config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Input files the run would process, in processing order.
    pub fn discover_inputs(&self) -> Result<Vec<PathBuf>> {
        if !self.config.input_dir.is_dir() {
            return Err(PipelineError::Config(format!(
                "input directory {} does not exist",
                self.config.input_dir.display()
            )));
        }
        list_files(&self.config.input_dir, &self.config.input_suffix)
    }

    /// Output path for `input`.
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.config
            .output_dir
            .join(self.config.output_file_name(&name))
    }

    /// Run every stage for one file and return the written path.
    #[instrument(skip(self), fields(file = %input.display()))]
    pub fn process_file(&self, input: &Path) -> Result<PathBuf> {
        let loaded = load_dataset(input, &self.config.variable)?;
        let mut grid = loaded.grid;

        normalize_crs(&mut grid, self.config.source_crs);

        let reprojected = reproject(
            &grid,
            self.config.target_crs,
            self.config.target_resolution,
            self.config.resampling,
        )?;

        let (dataset, encoding) = rebuild_dataset(
            reprojected,
            &loaded.global_attrs,
            RebuildOptions {
                resolution: self.config.target_resolution,
                resampling: self.config.resampling,
                compression_level: self.config.compression_level,
            },
        )?;

        let output = self.output_path(input);
        write_dataset(&dataset, &encoding, &output)?;

        info!(output = %output.display(), "Wrote reprojected file");
        Ok(output)
    }

    /// Process every input, then verify one output.
    ///
    /// A failing file is logged and recorded; it never stops the run.
    pub fn run(&self) -> Result<RunSummary> {
        let inputs = self.discover_inputs()?;
        fs::create_dir_all(&self.config.output_dir).map_err(|e| {
            PipelineError::write(self.config.output_dir.display().to_string(), e.to_string())
        })?;

        info!(
            input_dir = %self.config.input_dir.display(),
            output_dir = %self.config.output_dir.display(),
            files = inputs.len(),
            source_crs = %self.config.source_crs,
            target_crs = %self.config.target_crs,
            resolution = self.config.target_resolution,
            resampling = %self.config.resampling,
            "Starting reprojection batch"
        );

        let mut summary = RunSummary::default();
        for input in inputs {
            let outcome = match self.process_file(&input) {
                Ok(output) => FileOutcome::Succeeded { input, output },
                Err(e) => {
                    error!(
                        file = %input.display(),
                        stage = e.stage(),
                        error = %e,
                        "Failed to process file"
                    );
                    FileOutcome::Failed { input, error: e }
                }
            };
            summary.outcomes.push(outcome);
        }

        self.log_summary(&summary);
        summary.verification = self.verify_sample(&summary);
        Ok(summary)
    }

    fn log_summary(&self, summary: &RunSummary) {
        info!(
            succeeded = summary.succeeded_count(),
            failed = summary.failed_count(),
            "Reprojection batch finished"
        );
        if summary.all_succeeded() {
            info!("All files processed successfully");
        } else {
            for (input, error) in summary.failed() {
                warn!(file = %input.display(), error = %error, "File was not reprojected");
            }
        }
    }

    /// Verify the first output of this run, or else any earlier output.
    fn verify_sample(&self, summary: &RunSummary) -> Option<VerificationReport> {
        let sample = match summary.succeeded().next() {
            Some((_, output)) => Some(output.to_path_buf()),
            None => list_files(&self.config.output_dir, &self.config.input_suffix)
                .ok()
                .and_then(|files| {
                    files.into_iter().find(|p| {
                        p.file_name()
                            .map(|n| n.to_string_lossy().starts_with(OUTPUT_PREFIX))
                            .unwrap_or(false)
                    })
                }),
        };

        match sample {
            Some(path) => Some(verify_output(&path, &self.config.variable)),
            None => {
                warn!(
                    output_dir = %self.config.output_dir.display(),
                    "No output available to verify"
                );
                None
            }
        }
    }
}
