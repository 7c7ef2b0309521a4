//! OFI Analysis
//!
//! Multi-level order flow imbalance (OFI) and its predictive power for
//! short-horizon returns, computed from limit order book snapshots.
//!
//! # Overview
//!
//! Each book level is encoded in the input as a distance from the midpoint
//! and a notional size. The crate reconstructs per-level prices and sizes,
//! computes the OFI of every level between consecutive snapshots, combines
//! the levels into one signal and regresses forward returns on it.
//!
//! - **Aggregation**: sum, average, or first principal component
//! - **Causal PCA**: fit on a training window or an expanding window
//! - **Reporting**: OLS coefficient, intercept and R², terminal scatter plot
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        OFI Analysis                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  loader/        - CSV reading, cleaning, chronological sort     │
//! │  book/          - Columnar snapshot table                       │
//! │  features/      - Per-level OFI, aggregation, PCA               │
//! │  labeling/      - Forward returns                               │
//! │  regression/    - Univariate OLS and report                     │
//! │  visualization/ - Terminal scatter plot                         │
//! │  validation/    - Non-fatal data-quality checks                 │
//! │  config/        - TOML/JSON experiment configuration            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use ofi_analysis::prelude::*;
//!
//! let table = load_and_preprocess_data("data/BTC_1min.csv")?;
//! let table = compute_multi_level_ofi(table, 5)?;
//! let table = integrate_multi_level_ofi(table, 5, AggregationMethod::Sum)?;
//! let table = compute_short_term_returns(table, 1)?;
//!
//! let report = run_regression_ofi_vs_returns(&table, 1)?;
//! println!("{report}");
//! ```

pub mod book;
pub mod builder;
pub mod config;
pub mod error;
pub mod features;
pub mod labeling;
pub mod loader;
pub mod logging;
pub mod pipeline;
pub mod prelude;
pub mod regression;
pub mod validation;
pub mod visualization;

// Re-exports - Errors
pub use error::{OfiError, Result};

// Re-exports - Data
pub use book::{BookSnapshot, BookTable, LevelQuote, Side};
pub use loader::{load_and_preprocess_data, BookLoader, LoaderStats};

// Re-exports - Config
pub use builder::PipelineBuilder;
pub use config::{
    DataConfig, ExperimentMetadata, OfiConfig, PipelineConfig, PlotConfig, ReturnConfig,
};

// Re-exports - Features
pub use features::{
    aggregate_with_projection, compute_level_ofi, compute_multi_level_ofi, expanding_pca_ofi,
    integrate_multi_level_ofi, reconstruct_price, reconstruct_size, AggregationMethod,
    PcaProjection,
};

// Re-exports - Returns / Regression
pub use labeling::{compute_short_term_returns, future_return_column, ReturnStats};
pub use regression::{fit_ols, run_regression_ofi_vs_returns, OlsFit, RegressionReport};

// Re-exports - Visualization
pub use visualization::{visualize_ofi_vs_returns, ScatterPlot};

// Re-exports - Validation
pub use validation::{
    validate_timestamps, BookValidator, ValidationConfig, ValidationLevel, ValidationResult,
};

// Re-exports - Pipeline
pub use pipeline::{Pipeline, PipelineOutput};
