//! Fluent builder for pipeline configuration.
//!
//! # Quick Start
//!
//! ```ignore
//! use ofi_analysis::PipelineBuilder;
//!
//! // Defaults: data/BTC_1min.csv, 5 levels, sum, horizon 1
//! let pipeline = PipelineBuilder::new().build()?;
//! let output = pipeline.run()?;
//! println!("{}", output.regression);
//! ```
//!
//! # Common Configurations
//!
//! ## Averaged OFI over three levels
//!
//! ```ignore
//! let pipeline = PipelineBuilder::new()
//!     .data_path("data/ETH_1min.csv")
//!     .max_levels(3)
//!     .method(AggregationMethod::Avg)
//!     .horizon(5)
//!     .build()?;
//! ```
//!
//! ## Causal PCA
//!
//! ```ignore
//! let pipeline = PipelineBuilder::new()
//!     .expanding_pca(100)
//!     .without_plot()
//!     .build()?;
//! ```

use crate::config::{
    DataConfig, ExperimentMetadata, OfiConfig, PipelineConfig, PlotConfig, ReturnConfig,
};
use crate::error::{OfiError, Result};
use crate::features::AggregationMethod;
use crate::pipeline::Pipeline;
use std::path::PathBuf;

/// Fluent builder for creating pipelines.
///
/// Configuration is validated once, in [`build_config`](Self::build_config).
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    data: DataConfig,
    ofi: OfiConfig,
    returns: ReturnConfig,
    plot: PlotConfig,
    metadata: Option<ExperimentMetadata>,
}

impl PipelineBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: PipelineConfig) -> Self {
        Self {
            data: config.data,
            ofi: config.ofi,
            returns: config.returns,
            plot: config.plot,
            metadata: config.metadata,
        }
    }

    // =========================================================================
    // Data
    // =========================================================================

    /// Set the input CSV file.
    pub fn data_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data.path = path.into();
        self
    }

    /// Require exactly this many book levels in the input.
    pub fn data_levels(mut self, levels: usize) -> Self {
        self.data.levels = Some(levels);
        self
    }

    /// Skip data-quality checks after loading.
    pub fn skip_validation(mut self) -> Self {
        self.data.validate = false;
        self
    }

    // =========================================================================
    // OFI
    // =========================================================================

    /// Number of levels used for OFI.
    pub fn max_levels(mut self, levels: usize) -> Self {
        self.ofi.max_levels = levels;
        self
    }

    /// Aggregation method across levels.
    pub fn method(mut self, method: AggregationMethod) -> Self {
        self.ofi.method = method;
        self
    }

    /// Use PCA fitted on an expanding window, starting after `min_periods` rows.
    pub fn expanding_pca(mut self, min_periods: usize) -> Self {
        self.ofi.method = AggregationMethod::Pca;
        self.ofi.expanding_min_periods = Some(min_periods);
        self
    }

    // =========================================================================
    // Returns / Plot
    // =========================================================================

    /// Forward return horizon in rows.
    pub fn horizon(mut self, horizon: usize) -> Self {
        self.returns.horizon = horizon;
        self
    }

    /// Chart size in characters.
    pub fn plot_size(mut self, width: usize, height: usize) -> Self {
        self.plot.width = width;
        self.plot.height = height;
        self
    }

    /// Do not render the chart.
    pub fn without_plot(mut self) -> Self {
        self.plot.enabled = false;
        self
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Set experiment metadata for tracking and reproducibility.
    pub fn experiment(mut self, name: &str, description: &str) -> Self {
        self.metadata = Some(ExperimentMetadata {
            name: name.to_string(),
            description: Some(description.to_string()),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            version: None,
            tags: None,
        });
        self
    }

    /// Set experiment metadata with full control.
    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Build and validate the configuration.
    pub fn build_config(self) -> std::result::Result<PipelineConfig, String> {
        let config = PipelineConfig {
            data: self.data,
            ofi: self.ofi,
            returns: self.returns,
            plot: self.plot,
            metadata: self.metadata,
        };
        config.validate()?;
        Ok(config)
    }

    /// Build a ready-to-use [`Pipeline`].
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the configuration is invalid.
    pub fn build(self) -> Result<Pipeline> {
        let config = self.build_config().map_err(OfiError::InvalidParameter)?;
        Pipeline::from_config(config)
    }

    /// Get a summary of the current configuration.
    pub fn summary(&self) -> String {
        let method_desc = match (self.ofi.method, self.ofi.expanding_min_periods) {
            (AggregationMethod::Pca, Some(min)) => format!("PCA (expanding, min_periods={min})"),
            (method, _) => method.to_string(),
        };

        format!(
            "PipelineBuilder Summary:\n\
             - Data: {}\n\
             - OFI levels: {}\n\
             - Aggregation: {}\n\
             - Horizon: {}\n\
             - Plot: {}",
            self.data.path.display(),
            self.ofi.max_levels,
            method_desc,
            self.returns.horizon,
            if self.plot.enabled {
                format!("{}x{}", self.plot.width, self.plot.height)
            } else {
                "disabled".to_string()
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default() {
        let config = PipelineBuilder::new().build_config().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_builder_chaining() {
        let config = PipelineBuilder::new()
            .data_path("book.csv")
            .data_levels(10)
            .max_levels(3)
            .method(AggregationMethod::Avg)
            .horizon(5)
            .plot_size(40, 10)
            .build_config()
            .unwrap();

        assert_eq!(config.data.path, PathBuf::from("book.csv"));
        assert_eq!(config.data.levels, Some(10));
        assert_eq!(config.ofi.max_levels, 3);
        assert_eq!(config.ofi.method, AggregationMethod::Avg);
        assert_eq!(config.returns.horizon, 5);
        assert_eq!((config.plot.width, config.plot.height), (40, 10));
    }

    #[test]
    fn test_builder_expanding_pca() {
        let config = PipelineBuilder::new().expanding_pca(50).build_config().unwrap();
        assert_eq!(config.ofi.method, AggregationMethod::Pca);
        assert_eq!(config.ofi.expanding_min_periods, Some(50));
    }

    #[test]
    fn test_builder_experiment() {
        let config = PipelineBuilder::new()
            .experiment("btc_sum", "Sum of five levels")
            .build_config()
            .unwrap();
        let metadata = config.metadata.unwrap();
        assert_eq!(metadata.name, "btc_sum");
        assert!(metadata.created_at.is_some());
    }

    #[test]
    fn test_builder_invalid_config() {
        assert!(PipelineBuilder::new().horizon(0).build_config().is_err());
        assert!(PipelineBuilder::new().max_levels(0).build_config().is_err());
        assert!(PipelineBuilder::new()
            .data_levels(2)
            .max_levels(5)
            .build_config()
            .is_err());

        let err = PipelineBuilder::new().horizon(0).build().unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn test_builder_summary() {
        let summary = PipelineBuilder::new().expanding_pca(20).without_plot().summary();
        assert!(summary.contains("PCA (expanding, min_periods=20)"));
        assert!(summary.contains("Plot: disabled"));
    }

    #[test]
    fn test_builder_from_config_roundtrip() {
        let config = PipelineConfig::default().with_horizon(3);
        let rebuilt = PipelineBuilder::from_config(config.clone())
            .build_config()
            .unwrap();
        assert_eq!(rebuilt, config);
    }
}
