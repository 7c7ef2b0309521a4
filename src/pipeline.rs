//! End-to-end OFI analysis pipeline.
//!
//! Connects every stage in a strict linear order:
//!
//! ```text
//! CSV ─→ BookLoader ─→ BookTable ─→ compute_multi_level_ofi ─→ OFI_level_i
//!                          │                                        │
//!                    BookValidator                 integrate_multi_level_ofi / expanding_pca_ofi
//!                                                                   │
//!                                                            OFI_aggregated
//!                                                                   │
//!                                                    compute_short_term_returns ─→ future_ret_h
//!                                                                   │
//!                                                    run_regression_ofi_vs_returns
//! ```
//!
//! Each stage takes the table by value and returns it with new columns, so
//! no stage observes a half-built table.
//!
//! # Example
//!
//! ```ignore
//! use ofi_analysis::prelude::*;
//!
//! let pipeline = Pipeline::from_config(PipelineConfig::default())?;
//! let output = pipeline.run()?;
//! println!("{}", output.regression);
//!
//! // In-memory tables skip the loader
//! let output = pipeline.process_table(table)?;
//! ```
//!
//! # Output Structure
//!
//! | Field | Type | Description |
//! |-------|------|-------------|
//! | `table` | `BookTable` | Input rows plus OFI, aggregate and return columns |
//! | `regression` | `RegressionReport` | Coefficient, intercept, R² |
//! | `rows_loaded` | `usize` | Rows entering the OFI stage |
//! | `rows_dropped` | `usize` | Incomplete rows removed by the loader |
//! | `rows_analyzed` | `usize` | Rows with a defined forward return |
//! | `return_stats` | `ReturnStats` | Distribution of the target |
//! | `validation` | `Option<ValidationResult>` | Data-quality report, if enabled |

use crate::book::BookTable;
use crate::config::PipelineConfig;
use crate::error::{OfiError, Result};
use crate::features::{
    compute_multi_level_ofi, expanding_pca_ofi, integrate_multi_level_ofi, AggregationMethod,
    OFI_AGGREGATED_COLUMN,
};
use crate::labeling::{compute_short_term_returns, future_return_column, ReturnStats};
use crate::loader::BookLoader;
use crate::regression::{run_regression_ofi_vs_returns, RegressionReport};
use crate::validation::{BookValidator, ValidationResult};
use crate::visualization::{ofi_vs_returns_plot, ScatterPlot};

/// Output from one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Analyzed table with every derived column
    pub table: BookTable,

    /// Regression of forward returns on aggregated OFI
    pub regression: RegressionReport,

    /// Rows entering the OFI stage
    pub rows_loaded: usize,

    /// Rows dropped by the loader for missing fields
    pub rows_dropped: usize,

    /// Rows left after dropping the last `horizon` rows
    pub rows_analyzed: usize,

    /// Summary of the forward-return column
    pub return_stats: ReturnStats,

    /// Data-quality report (None when validation is disabled)
    pub validation: Option<ValidationResult>,
}

impl PipelineOutput {
    /// Aggregated OFI column of the analyzed table.
    pub fn aggregated_ofi(&self) -> &[f64] {
        self.table.column(OFI_AGGREGATED_COLUMN).unwrap_or(&[])
    }

    /// Forward-return column of the analyzed table.
    pub fn future_returns(&self) -> &[f64] {
        self.table
            .column(&future_return_column(self.regression.horizon))
            .unwrap_or(&[])
    }
}

/// Main pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create pipeline from configuration.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the configuration does not validate.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate().map_err(OfiError::InvalidParameter)?;
        Ok(Self { config })
    }

    /// Get the pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the configured file and analyze it.
    ///
    /// Level columns are required up to `data.levels`, or `ofi.max_levels`
    /// when that is unset, so a file missing them fails with `DataFormat`.
    pub fn run(&self) -> Result<PipelineOutput> {
        let levels = self.config.data.levels.unwrap_or(self.config.ofi.max_levels);
        let (table, stats) = BookLoader::new(&self.config.data.path)
            .levels(Some(levels))
            .load_with_stats()?;

        let mut output = self.process_table(table)?;
        output.rows_dropped = stats.rows_dropped;
        Ok(output)
    }

    /// Analyze an in-memory table.
    pub fn process_table(&self, table: BookTable) -> Result<PipelineOutput> {
        let _span = tracing::info_span!(
            "pipeline",
            max_levels = self.config.ofi.max_levels,
            method = %self.config.ofi.method,
            horizon = self.config.returns.horizon
        )
        .entered();

        let rows_loaded = table.len();
        let validator = BookValidator::new();

        let mut validation = self
            .config
            .data
            .validate
            .then(|| validator.validate_book(&table));

        let table = compute_multi_level_ofi(table, self.config.ofi.max_levels)?;
        let table = self.aggregate(table)?;

        if let (Some(report), Some(values)) =
            (validation.as_mut(), table.column(OFI_AGGREGATED_COLUMN))
        {
            report.merge(validator.validate_values(OFI_AGGREGATED_COLUMN, values));
        }
        if let Some(report) = &validation {
            report.log();
        }

        let horizon = self.config.returns.horizon;
        let table = compute_short_term_returns(table, horizon)?;
        let return_stats = table
            .column(&future_return_column(horizon))
            .map(ReturnStats::from_returns)
            .unwrap_or_default();

        let regression = run_regression_ofi_vs_returns(&table, horizon)?;

        Ok(PipelineOutput {
            rows_analyzed: table.len(),
            table,
            regression,
            rows_loaded,
            rows_dropped: 0,
            return_stats,
            validation,
        })
    }

    fn aggregate(&self, table: BookTable) -> Result<BookTable> {
        let ofi = &self.config.ofi;
        match (ofi.method, ofi.expanding_min_periods) {
            (AggregationMethod::Pca, Some(min_periods)) => {
                expanding_pca_ofi(table, ofi.max_levels, min_periods)
            }
            (method, _) => integrate_multi_level_ofi(table, ofi.max_levels, method),
        }
    }

    /// Chart of an output's OFI against forward returns, sized per config.
    ///
    /// Returns `None` when plotting is disabled.
    pub fn plot(&self, output: &PipelineOutput) -> Result<Option<ScatterPlot>> {
        if !self.config.plot.enabled {
            return Ok(None);
        }
        let plot = ofi_vs_returns_plot(
            &output.table,
            output.regression.horizon,
            Some(&output.regression.fit),
        )?
        .with_size(self.config.plot.width, self.config.plot.height);
        Ok(Some(plot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{BookSnapshot, LevelQuote};
    use crate::builder::PipelineBuilder;
    use chrono::{Duration, TimeZone, Utc};

    fn synthetic_table(rows: usize) -> BookTable {
        let t0 = Utc.with_ymd_and_hms(2021, 4, 7, 11, 0, 0).unwrap();
        let snaps = (0..rows)
            .map(|r| {
                let mid = 100.0 + (r as f64 * 0.7).sin();
                let mut snap = BookSnapshot::new(t0 + Duration::minutes(r as i64), mid);
                for level in 0..3 {
                    let d = 0.5 * (level as f64 + 1.0) + ((r + level) % 4) as f64 * 0.05;
                    let size = 1.0 + ((r * 3 + level) % 5) as f64;
                    snap = snap.with_level(LevelQuote::new(-d, size), LevelQuote::new(d, size));
                }
                snap
            })
            .collect();
        BookTable::from_snapshots(snaps).unwrap()
    }

    #[test]
    fn test_process_table_columns_and_rows() {
        let pipeline = PipelineBuilder::new().max_levels(3).horizon(2).build().unwrap();
        let output = pipeline.process_table(synthetic_table(40)).unwrap();

        assert_eq!(output.rows_loaded, 40);
        assert_eq!(output.rows_analyzed, 38);
        assert_eq!(output.table.len(), 38);
        for name in ["OFI_level_0", "OFI_level_1", "OFI_level_2", "OFI_aggregated", "future_ret_2"] {
            assert!(output.table.has_column(name), "missing {name}");
        }
        assert_eq!(output.aggregated_ofi().len(), 38);
        assert_eq!(output.future_returns().len(), 38);
        assert_eq!(output.regression.fit.n_samples, 38);
        assert_eq!(output.return_stats.total, 38);
        assert!(output.validation.is_some());
    }

    #[test]
    fn test_expanding_pca_path() {
        let pipeline = PipelineBuilder::new()
            .max_levels(3)
            .expanding_pca(10)
            .skip_validation()
            .build()
            .unwrap();
        let output = pipeline.process_table(synthetic_table(30)).unwrap();
        assert!(output.aggregated_ofi()[..10].iter().all(|&v| v == 0.0));
        assert!(output.validation.is_none());
    }

    #[test]
    fn test_too_many_levels_is_invalid_parameter() {
        let pipeline = PipelineBuilder::new().max_levels(5).build().unwrap();
        let err = pipeline.process_table(synthetic_table(10)).unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn test_horizon_too_large() {
        let pipeline = PipelineBuilder::new().max_levels(1).horizon(10).build().unwrap();
        let err = pipeline.process_table(synthetic_table(10)).unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn test_plot_respects_config() {
        let table = synthetic_table(20);

        let pipeline = PipelineBuilder::new().max_levels(2).plot_size(30, 8).build().unwrap();
        let output = pipeline.process_table(table.clone()).unwrap();
        let plot = pipeline.plot(&output).unwrap().unwrap();
        assert_eq!(plot.len(), 19);

        let pipeline = PipelineBuilder::new().max_levels(2).without_plot().build().unwrap();
        let output = pipeline.process_table(table).unwrap();
        assert!(pipeline.plot(&output).unwrap().is_none());
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let err = Pipeline::from_config(PipelineConfig::default().with_horizon(0)).unwrap_err();
        assert!(err.is_invalid_parameter());
    }
}
