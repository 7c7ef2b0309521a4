//! Pipeline configuration management.
//!
//! One serializable structure holds every parameter of an analysis run so
//! experiments can be reproduced from a file instead of literals in code.
//!
//! # Features
//!
//! - **Unified Configuration**: data, OFI, returns and plot settings in one struct
//! - **Serialization**: Save/load configurations to TOML or JSON
//! - **Validation**: Ensure configurations are valid before use
//!
//! # Example
//!
//! ```ignore
//! use ofi_analysis::config::PipelineConfig;
//!
//! let config = PipelineConfig::default();
//! config.save_toml("experiment_config.toml")?;
//!
//! let loaded = PipelineConfig::load_toml("experiment_config.toml")?;
//! let pipeline = Pipeline::from_config(loaded)?;
//! ```
//!
//! # File Layout
//!
//! ```toml
//! [data]
//! path = "data/BTC_1min.csv"
//! validate = true
//!
//! [ofi]
//! max_levels = 5
//! method = "sum"
//!
//! [returns]
//! horizon = 1
//!
//! [plot]
//! enabled = true
//! width = 72
//! height = 20
//! ```

use crate::error::{OfiError, Result};
use crate::features::AggregationMethod;
use crate::visualization::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use std::fs;
use std::path::{Path, PathBuf};

/// Default input file.
pub const DEFAULT_DATA_PATH: &str = "data/BTC_1min.csv";

/// Unified pipeline configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PipelineConfig {
    /// Input data configuration
    pub data: DataConfig,

    /// OFI computation and aggregation
    pub ofi: OfiConfig,

    /// Forward return target
    pub returns: ReturnConfig,

    /// Terminal chart
    #[serde(default)]
    pub plot: PlotConfig,

    /// Experiment metadata (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExperimentMetadata>,
}

/// Input data configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DataConfig {
    /// CSV file with book snapshots
    pub path: PathBuf,

    /// Number of book levels to require from the file.
    ///
    /// `None` discovers every complete level in the header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levels: Option<usize>,

    /// Run data-quality checks after loading
    #[serde(default = "default_true")]
    pub validate: bool,
}

/// OFI computation configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OfiConfig {
    /// Number of levels used, starting at level 0
    pub max_levels: usize,

    /// Aggregation across levels
    #[serde(default)]
    pub method: AggregationMethod,

    /// With `method = "PCA"`, fit on an expanding window instead of the full
    /// sample. Rows before this count are 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanding_min_periods: Option<usize>,
}

/// Forward return configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReturnConfig {
    /// Horizon in rows
    pub horizon: usize,
}

/// Terminal chart configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlotConfig {
    /// Render the chart after the regression
    pub enabled: bool,

    /// Chart width in characters
    pub width: usize,

    /// Chart height in characters
    pub height: usize,
}

/// Experiment metadata for tracking and reproducibility.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExperimentMetadata {
    /// Experiment name
    pub name: String,

    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Creation timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Version or git commit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Custom tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            ofi: OfiConfig::default(),
            returns: ReturnConfig::default(),
            plot: PlotConfig::default(),
            metadata: None,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATA_PATH),
            levels: None,
            validate: true,
        }
    }
}

impl Default for OfiConfig {
    fn default() -> Self {
        Self {
            max_levels: 5,
            method: AggregationMethod::Sum,
            expanding_min_periods: None,
        }
    }
}

impl Default for ReturnConfig {
    fn default() -> Self {
        Self { horizon: 1 }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set experiment metadata.
    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the input file.
    pub fn with_data_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data.path = path.into();
        self
    }

    /// Set OFI configuration.
    pub fn with_ofi(mut self, config: OfiConfig) -> Self {
        self.ofi = config;
        self
    }

    /// Set the return horizon.
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.returns.horizon = horizon;
        self
    }

    /// Set plot configuration.
    pub fn with_plot(mut self, config: PlotConfig) -> Self {
        self.plot = config;
        self
    }

    /// Validate the configuration.
    ///
    /// Returns Ok(()) if valid, Err(msg) otherwise.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.data.validate()?;
        self.ofi.validate()?;
        self.returns.validate()?;
        self.plot.validate()?;

        if let Some(levels) = self.data.levels {
            if self.ofi.max_levels > levels {
                return Err(format!(
                    "ofi.max_levels ({}) exceeds data.levels ({})",
                    self.ofi.max_levels, levels
                ));
            }
        }

        Ok(())
    }

    /// Save configuration to TOML file.
    ///
    /// # Example
    ///
    /// ```ignore
    /// config.save_toml("configs/experiment1.toml")?;
    /// ```
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Load and validate configuration from TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// `Config` for malformed TOML, `InvalidParameter` for an unknown
    /// `ofi.method` or values that do not validate.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(contents)?;
        if let Some(method) = table
            .get("ofi")
            .and_then(|ofi| ofi.get("method"))
            .and_then(toml::Value::as_str)
        {
            method.parse::<AggregationMethod>()?;
        }

        let config: PipelineConfig = toml::Value::Table(table).try_into()?;
        config.validate().map_err(OfiError::InvalidParameter)?;
        Ok(config)
    }

    /// Save configuration to JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Load and validate configuration from JSON file.
    ///
    /// Errors are classified as in [`PipelineConfig::from_toml_str`].
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&contents)?;
        if let Some(method) = value
            .get("ofi")
            .and_then(|ofi| ofi.get("method"))
            .and_then(serde_json::Value::as_str)
        {
            method.parse::<AggregationMethod>()?;
        }

        let config: PipelineConfig = serde_json::from_value(value)?;
        config.validate().map_err(OfiError::InvalidParameter)?;
        Ok(config)
    }
}

impl DataConfig {
    /// Validate data configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.path.as_os_str().is_empty() {
            return Err("data.path must not be empty".to_string());
        }
        if self.levels == Some(0) {
            return Err("data.levels must be >= 1".to_string());
        }
        Ok(())
    }
}

impl OfiConfig {
    /// Validate OFI configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_levels == 0 {
            return Err("ofi.max_levels must be >= 1".to_string());
        }
        if let Some(min_periods) = self.expanding_min_periods {
            if self.method != AggregationMethod::Pca {
                return Err(format!(
                    "ofi.expanding_min_periods only applies to method = \"PCA\", got \"{}\"",
                    self.method
                ));
            }
            if min_periods < 2 {
                return Err("ofi.expanding_min_periods must be >= 2".to_string());
            }
        }
        Ok(())
    }
}

impl ReturnConfig {
    /// Validate return configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.horizon == 0 {
            return Err("returns.horizon must be >= 1".to_string());
        }
        Ok(())
    }
}

impl PlotConfig {
    /// Validate plot configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.width < 10 || self.height < 5 {
            return Err(format!(
                "plot size {}x{} is below the 10x5 minimum",
                self.width, self.height
            ));
        }
        Ok(())
    }
}
