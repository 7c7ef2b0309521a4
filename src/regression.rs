//! Univariate OLS of forward returns on aggregated OFI.
//!
//! Fits `y = intercept + slope × x` by ordinary least squares and reports the
//! coefficient of determination:
//!
//! ```text
//! slope     = Σ(x - x̄)(y - ȳ) / Σ(x - x̄)²
//! intercept = ȳ - slope × x̄
//! R²        = 1 - SS_res / SS_tot
//! ```
//!
//! The fit is purely descriptive: no train/test split, no regularization and
//! no significance tests.
//!
//! # Degenerate Samples
//!
//! | Case | slope | intercept | R² |
//! |------|-------|-----------|----|
//! | `var(x) = 0` | 0 | `ȳ` | NaN |
//! | `var(y) = 0`, `var(x) > 0` | 0 | `ȳ` | NaN |
//!
//! NaN is the sentinel for an undefined R²; the fit never divides by zero.

use crate::book::BookTable;
use crate::error::{OfiError, Result};
use crate::features::aggregation::OFI_AGGREGATED_COLUMN;
use crate::labeling::future_return_column;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of a univariate least-squares fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OlsFit {
    /// Slope (coefficient on x)
    pub slope: f64,

    /// Intercept
    pub intercept: f64,

    /// Coefficient of determination (NaN when undefined)
    pub r_squared: f64,

    /// Number of (x, y) pairs used
    pub n_samples: usize,
}

impl OlsFit {
    /// Predicted y for `x`.
    #[inline]
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// Whether R² is defined for this sample.
    pub fn has_r_squared(&self) -> bool {
        !self.r_squared.is_nan()
    }
}

/// Fit `y = intercept + slope × x` by ordinary least squares.
///
/// # Errors
///
/// `InvalidParameter` if the slices differ in length or are empty.
pub fn fit_ols(x: &[f64], y: &[f64]) -> Result<OlsFit> {
    if x.len() != y.len() {
        return Err(OfiError::invalid_parameter(format!(
            "x has {} values but y has {}",
            x.len(),
            y.len()
        )));
    }
    if x.is_empty() {
        return Err(OfiError::invalid_parameter(
            "cannot fit a regression on an empty sample",
        ));
    }

    let x = ArrayView1::from(x);
    let y = ArrayView1::from(y);
    let n = x.len();

    let x_mean = x.sum() / n as f64;
    let y_mean = y.sum() / n as f64;

    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let dx = xi - x_mean;
        let dy = yi - y_mean;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    if sxx == 0.0 {
        return Ok(OlsFit {
            slope: 0.0,
            intercept: y_mean,
            r_squared: f64::NAN,
            n_samples: n,
        });
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;

    let r_squared = if syy == 0.0 {
        f64::NAN
    } else {
        let ss_res: f64 = x
            .iter()
            .zip(y.iter())
            .map(|(&xi, &yi)| (yi - (intercept + slope * xi)).powi(2))
            .sum();
        1.0 - ss_res / syy
    };

    Ok(OlsFit {
        slope,
        intercept,
        r_squared,
        n_samples: n,
    })
}

/// Regression of `future_ret_<horizon>` on `OFI_aggregated`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    /// Return horizon in rows
    pub horizon: usize,

    /// Fitted model
    pub fit: OlsFit,

    /// Rows skipped because x or y was not finite
    pub skipped_rows: usize,
}

impl RegressionReport {
    /// Coefficient on aggregated OFI.
    pub fn coefficient(&self) -> f64 {
        self.fit.slope
    }

    /// Intercept of the fit.
    pub fn intercept(&self) -> f64 {
        self.fit.intercept
    }

    /// R² of the fit (NaN when undefined).
    pub fn r_squared(&self) -> f64 {
        self.fit.r_squared
    }
}

impl fmt::Display for RegressionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Regression results for horizon={}:", self.horizon)?;
        writeln!(f, "  Coefficient: {:.6}", self.fit.slope)?;
        writeln!(f, "  Intercept: {:.6}", self.fit.intercept)?;
        write!(f, "  R^2: {:.6}", self.fit.r_squared)
    }
}

/// Finite `(OFI_aggregated, future_ret_<horizon>)` pairs of a table.
///
/// Returns the pairs and the number of rows skipped.
pub(crate) fn regression_pairs(
    table: &BookTable,
    horizon: usize,
) -> Result<(Vec<f64>, Vec<f64>, usize)> {
    let y_name = future_return_column(horizon);
    let x = table.column(OFI_AGGREGATED_COLUMN).ok_or_else(|| {
        OfiError::data_format(format!("missing column '{OFI_AGGREGATED_COLUMN}'"))
    })?;
    let y = table
        .column(&y_name)
        .ok_or_else(|| OfiError::data_format(format!("missing column '{y_name}'")))?;

    let mut xs = Vec::with_capacity(x.len());
    let mut ys = Vec::with_capacity(y.len());
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        if xi.is_finite() && yi.is_finite() {
            xs.push(xi);
            ys.push(yi);
        }
    }
    let skipped = x.len() - xs.len();
    Ok((xs, ys, skipped))
}

/// Regress `future_ret_<horizon>` on `OFI_aggregated`.
///
/// Rows where either value is not finite are left out of the fit and counted
/// in [`RegressionReport::skipped_rows`].
///
/// # Errors
///
/// - `DataFormat` if either column is missing
/// - `InvalidParameter` if no finite rows remain
pub fn run_regression_ofi_vs_returns(table: &BookTable, horizon: usize) -> Result<RegressionReport> {
    let _span = tracing::info_span!("regression", horizon).entered();

    let (x, y, skipped_rows) = regression_pairs(table, horizon)?;
    if skipped_rows > 0 {
        tracing::warn!(skipped_rows, "left non-finite rows out of the regression");
    }

    let fit = fit_ols(&x, &y)?;
    if !fit.has_r_squared() {
        tracing::warn!(n_samples = fit.n_samples, "R^2 undefined: zero variance in OFI or returns");
    }

    tracing::info!(
        coefficient = fit.slope,
        intercept = fit.intercept,
        r_squared = fit.r_squared,
        n_samples = fit.n_samples,
        "fitted OFI regression"
    );

    Ok(RegressionReport {
        horizon,
        fit,
        skipped_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::BookSnapshot;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_exact_linear_fit() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y: Vec<f64> = x.iter().map(|v| 0.5 + 2.0 * v).collect();
        let fit = fit_ols(&x, &y).unwrap();

        assert!((fit.slope - 2.0).abs() < 1e-10);
        assert!((fit.intercept - 0.5).abs() < 1e-10);
        assert!((fit.r_squared - 1.0).abs() < 1e-10);
        assert_eq!(fit.n_samples, 5);
        assert!((fit.predict(10.0) - 20.5).abs() < 1e-10);
    }

    #[test]
    fn test_noisy_fit_r_squared_in_range() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = [1.1, 1.9, 3.2, 3.8, 5.3, 5.9];
        let fit = fit_ols(&x, &y).unwrap();
        assert!(fit.slope > 0.9 && fit.slope < 1.1);
        assert!(fit.r_squared > 0.9 && fit.r_squared <= 1.0);
    }

    #[test]
    fn test_constant_x_gives_nan_r_squared() {
        let fit = fit_ols(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert!((fit.intercept - 2.0).abs() < 1e-12);
        assert!(fit.r_squared.is_nan());
        assert!(!fit.has_r_squared());
    }

    #[test]
    fn test_constant_y_gives_nan_r_squared() {
        let fit = fit_ols(&[1.0, 2.0, 3.0], &[4.0, 4.0, 4.0]).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert!((fit.intercept - 4.0).abs() < 1e-12);
        assert!(fit.r_squared.is_nan());
    }

    #[test]
    fn test_invalid_samples() {
        assert!(fit_ols(&[], &[]).unwrap_err().is_invalid_parameter());
        assert!(fit_ols(&[1.0], &[1.0, 2.0]).unwrap_err().is_invalid_parameter());
    }

    #[test]
    fn test_report_display_format() {
        let report = RegressionReport {
            horizon: 1,
            fit: OlsFit {
                slope: 0.25,
                intercept: -0.001,
                r_squared: 0.5,
                n_samples: 10,
            },
            skipped_rows: 0,
        };
        assert_eq!(
            report.to_string(),
            "Regression results for horizon=1:\n  Coefficient: 0.250000\n  Intercept: -0.001000\n  R^2: 0.500000"
        );
    }

    #[test]
    fn test_run_regression_requires_columns() {
        let t0 = Utc.with_ymd_and_hms(2021, 4, 7, 11, 0, 0).unwrap();
        let snaps = (0..3)
            .map(|i| BookSnapshot::new(t0 + Duration::minutes(i), 100.0))
            .collect();
        let table = BookTable::from_snapshots(snaps).unwrap();
        assert!(run_regression_ofi_vs_returns(&table, 1)
            .unwrap_err()
            .is_data_format());

        let table = table.with_column(OFI_AGGREGATED_COLUMN, vec![1.0, 2.0, 3.0]).unwrap();
        assert!(run_regression_ofi_vs_returns(&table, 1)
            .unwrap_err()
            .is_data_format());

        let table = table
            .with_column("future_ret_1", vec![0.1, f64::INFINITY, 0.3])
            .unwrap();
        let report = run_regression_ofi_vs_returns(&table, 1).unwrap();
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(report.fit.n_samples, 2);
        assert!((report.coefficient() - 0.1).abs() < 1e-10);
    }
}
