//! Configuration for the reprojection pipeline.

use std::path::PathBuf;

use landcover_common::CrsCode;
use serde::{Deserialize, Serialize};

/// Configuration for one batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory scanned for input files.
    pub input_dir: PathBuf,

    /// Directory outputs are written to (created if missing).
    pub output_dir: PathBuf,

    /// Name of the classification variable.
    pub variable: String,

    /// CRS asserted for inputs before any geometric operation.
    pub source_crs: CrsCode,

    /// CRS outputs are reprojected to.
    pub target_crs: CrsCode,

    /// Output pixel size in target CRS units.
    pub target_resolution: f64,

    /// Resampling rule.
    pub resampling: ResamplingMethod,

    /// Deflate level for the class variable (1-9).
    pub compression_level: u8,

    /// Input file name suffix.
    pub input_suffix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/raw"),
            output_dir: PathBuf::from("data/reprojected"),
            variable: "lccs_class".to_string(),
            source_crs: CrsCode::Epsg4326,
            target_crs: CrsCode::Epsg3035,
            target_resolution: 300.0,
            resampling: ResamplingMethod::Nearest,
            compression_level: 5,
            input_suffix: ".nc".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparseable variables keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from `LC_*` environment variables.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("LC_INPUT_DIR") {
            self.input_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("LC_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("LC_VARIABLE") {
            self.variable = val;
        }

        if let Ok(val) = std::env::var("LC_SOURCE_CRS") {
            if let Ok(crs) = CrsCode::parse(&val) {
                self.source_crs = crs;
            }
        }

        if let Ok(val) = std::env::var("LC_TARGET_CRS") {
            if let Ok(crs) = CrsCode::parse(&val) {
                self.target_crs = crs;
            }
        }

        if let Ok(val) = std::env::var("LC_TARGET_RESOLUTION") {
            if let Ok(res) = val.parse() {
                self.target_resolution = res;
            }
        }

        if let Ok(val) = std::env::var("LC_RESAMPLING") {
            if let Ok(method) = val.parse() {
                self.resampling = method;
            }
        }

        if let Ok(val) = std::env::var("LC_COMPRESSION_LEVEL") {
            if let Ok(level) = val.parse() {
                self.compression_level = level;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.variable.trim().is_empty() {
            return Err("variable must not be empty".to_string());
        }

        if !self.target_resolution.is_finite() || self.target_resolution <= 0.0 {
            return Err(format!(
                "target_resolution must be a positive number, got {}",
                self.target_resolution
            ));
        }

        if self.compression_level == 0 || self.compression_level > 9 {
            return Err("compression_level must be 1-9".to_string());
        }

        if self.input_suffix.is_empty() {
            return Err("input_suffix must not be empty".to_string());
        }

        if self.input_dir == self.output_dir {
            return Err("input_dir and output_dir must differ".to_string());
        }

        Ok(())
    }

    /// File name of the output written for `input_name`.
    pub fn output_file_name(&self, input_name: &str) -> String {
        format!("reprojected_{}_{}", self.target_crs.epsg(), input_name)
    }
}

/// Resampling rule for categorical rasters.
///
/// Both rules copy existing class codes; neither interpolates, so no new
/// codes can appear in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResamplingMethod {
    /// Value of the source pixel containing the output pixel center.
    #[default]
    Nearest,
    /// Most frequent value among a 3x3 sub-pixel sample (ties to the smallest code).
    Mode,
}

impl ResamplingMethod {
    /// Get the method name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Mode => "mode",
        }
    }
}

impl std::str::FromStr for ResamplingMethod {
    type Err = String;

    /// Parse from string (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nearest" | "near" => Ok(Self::Nearest),
            "mode" | "majority" => Ok(Self::Mode),
            "bilinear" | "cubic" | "average" => Err(format!(
                "resampling '{}' interpolates values and would invent class codes",
                s
            )),
            other => Err(format!("unknown resampling method '{}'", other)),
        }
    }
}

impl std::fmt::Display for ResamplingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.target_crs, CrsCode::Epsg3035);
        assert_eq!(config.target_resolution, 300.0);
        assert_eq!(config.compression_level, 5);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.target_resolution = 0.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.compression_level = 10;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.output_dir = config.input_dir.clone();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.target_resolution = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_file_name() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.output_file_name("ESACCI-LC-L4-LCCS-Map-300m-P1Y-1995-v2.0.7cds.nc"),
            "reprojected_3035_ESACCI-LC-L4-LCCS-Map-300m-P1Y-1995-v2.0.7cds.nc"
        );
    }

    #[test]
    fn test_resampling_parse() {
        assert_eq!("Nearest".parse::<ResamplingMethod>(), Ok(ResamplingMethod::Nearest));
        assert_eq!("mode".parse::<ResamplingMethod>(), Ok(ResamplingMethod::Mode));
        assert!("bilinear".parse::<ResamplingMethod>().is_err());
        assert!("lanczos".parse::<ResamplingMethod>().is_err());
    }

    #[test]
    fn test_from_env_overrides() {
        std::env::set_var("LC_TARGET_RESOLUTION", "100");
        std::env::set_var("LC_RESAMPLING", "mode");
        std::env::set_var("LC_TARGET_CRS", "EPSG:3857");
        let config = PipelineConfig::from_env();
        std::env::remove_var("LC_TARGET_RESOLUTION");
        std::env::remove_var("LC_RESAMPLING");
        std::env::remove_var("LC_TARGET_CRS");

        assert_eq!(config.target_resolution, 100.0);
        assert_eq!(config.resampling, ResamplingMethod::Mode);
        assert_eq!(config.target_crs, CrsCode::Epsg3857);
    }
}
