//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```ignore
//! use ofi_analysis::prelude::*;
//!
//! let pipeline = PipelineBuilder::new().max_levels(5).build()?;
//! let output = pipeline.run()?;
//! println!("{}", output.regression);
//! ```
//!
//! # What's Included
//!
//! ## Core Pipeline
//! - [`Pipeline`], [`PipelineBuilder`], [`PipelineConfig`], [`PipelineOutput`]
//!
//! ## Data
//! - [`BookTable`], [`BookSnapshot`], [`LevelQuote`], [`Side`]
//! - [`load_and_preprocess_data`], [`BookLoader`]
//!
//! ## OFI
//! - [`compute_multi_level_ofi`], [`integrate_multi_level_ofi`]
//! - [`AggregationMethod`], [`PcaProjection`], [`expanding_pca_ofi`]
//!
//! ## Analysis
//! - [`compute_short_term_returns`], [`run_regression_ofi_vs_returns`]
//! - [`RegressionReport`], [`visualize_ofi_vs_returns`]
//!
//! ## Errors
//! - [`OfiError`], [`Result`]

pub use crate::book::{BookSnapshot, BookTable, LevelQuote, Side};
pub use crate::builder::PipelineBuilder;
pub use crate::config::PipelineConfig;
pub use crate::error::{OfiError, Result};
pub use crate::features::{
    aggregate_with_projection, compute_multi_level_ofi, expanding_pca_ofi,
    integrate_multi_level_ofi, AggregationMethod, PcaProjection, OFI_AGGREGATED_COLUMN,
};
pub use crate::labeling::{compute_short_term_returns, future_return_column};
pub use crate::loader::{load_and_preprocess_data, BookLoader};
pub use crate::pipeline::{Pipeline, PipelineOutput};
pub use crate::regression::{run_regression_ofi_vs_returns, RegressionReport};
pub use crate::visualization::visualize_ofi_vs_returns;
