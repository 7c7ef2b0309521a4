//! Aggregation of per-level OFI into a single signal.
//!
//! | Method | Output per row | Causal |
//! |--------|----------------|--------|
//! | `sum` | `Σ_i OFI_i(t)` | yes |
//! | `avg` | `mean_i OFI_i(t)` | yes |
//! | `PCA` | projection on the first principal component of the full sample | **no** |
//!
//! The `PCA` method fits on every row of the table, including rows after the
//! one being projected. Use [`aggregate_with_projection`] with a projection
//! fitted on a training window, or [`expanding_pca_ofi`], when the signal has
//! to be free of look-ahead.

use crate::book::BookTable;
use crate::error::{OfiError, Result};
use crate::features::ofi::{check_max_levels, ofi_matrix};
use crate::features::pca::PcaProjection;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the aggregated OFI column.
pub const OFI_AGGREGATED_COLUMN: &str = "OFI_aggregated";

/// How per-level OFI values are combined into one value per row.
///
/// Deserialization goes through [`FromStr`], so config files accept the same
/// spellings as the command line and reject the same ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum AggregationMethod {
    /// Row-wise sum across levels
    #[default]
    #[serde(rename = "sum")]
    Sum,

    /// Row-wise mean across levels
    #[serde(rename = "avg")]
    Avg,

    /// Projection on the first principal component (full-sample fit)
    #[serde(rename = "PCA")]
    Pca,
}

impl AggregationMethod {
    /// Canonical name (`sum`, `avg`, `PCA`).
    pub fn name(&self) -> &'static str {
        match self {
            AggregationMethod::Sum => "sum",
            AggregationMethod::Avg => "avg",
            AggregationMethod::Pca => "PCA",
        }
    }

    /// Whether each output row depends only on that row's levels.
    pub fn is_causal(&self) -> bool {
        !matches!(self, AggregationMethod::Pca)
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for AggregationMethod {
    type Err = OfiError;

    /// Parse `sum`, `avg` or `PCA` (case-insensitive). Any other value is
    /// rejected; there is no fallback.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(AggregationMethod::Sum),
            "avg" => Ok(AggregationMethod::Avg),
            "pca" => Ok(AggregationMethod::Pca),
            _ => Err(OfiError::invalid_parameter(format!(
                "unknown aggregation method '{s}': choose from ['PCA', 'sum', 'avg']"
            ))),
        }
    }
}

impl TryFrom<String> for AggregationMethod {
    type Error = OfiError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Aggregate a `[rows, levels]` OFI matrix with `method`.
pub fn aggregate_levels(matrix: &Array2<f64>, method: AggregationMethod) -> Result<Array1<f64>> {
    if matrix.ncols() == 0 {
        return Err(OfiError::invalid_parameter(
            "cannot aggregate a matrix with no levels",
        ));
    }

    match method {
        AggregationMethod::Sum => Ok(matrix.sum_axis(Axis(1))),
        AggregationMethod::Avg => Ok(matrix.sum_axis(Axis(1)) / matrix.ncols() as f64),
        AggregationMethod::Pca => {
            if matrix.nrows() == 0 {
                return Ok(Array1::zeros(0));
            }
            let (projection, scores) = PcaProjection::fit_transform(matrix)?;
            tracing::warn!(
                rows = projection.n_samples(),
                explained_variance_ratio = projection.explained_variance_ratio(),
                "PCA aggregation fitted on the full sample; values carry look-ahead"
            );
            Ok(scores)
        }
    }
}

/// Append `OFI_aggregated` built from `OFI_level_0 .. OFI_level_{max_levels-1}`.
///
/// # Errors
///
/// - `InvalidParameter` if `max_levels` is 0
/// - `DataFormat` if an `OFI_level_i` column is missing
pub fn integrate_multi_level_ofi(
    table: BookTable,
    max_levels: usize,
    method: AggregationMethod,
) -> Result<BookTable> {
    let _span = tracing::info_span!("integrate_ofi", max_levels, method = %method).entered();

    let matrix = ofi_matrix(&table, max_levels)?;
    let aggregated = aggregate_levels(&matrix, method)?;

    tracing::info!(rows = table.len(), "aggregated multi-level OFI");
    table.with_column(OFI_AGGREGATED_COLUMN, aggregated.to_vec())
}

/// Append `OFI_aggregated` using a projection fitted elsewhere.
///
/// Fit the projection on a training window (for example with
/// [`PcaProjection::fit`] on an earlier table's [`ofi_matrix`]) and apply it
/// here to keep the signal free of look-ahead.
pub fn aggregate_with_projection(
    table: BookTable,
    max_levels: usize,
    projection: &PcaProjection,
) -> Result<BookTable> {
    let matrix = ofi_matrix(&table, max_levels)?;
    let scores = projection.transform(&matrix)?;
    table.with_column(OFI_AGGREGATED_COLUMN, scores.to_vec())
}

/// Append a causal PCA aggregate fitted on an expanding window.
///
/// Row `t` is projected with a component fitted on rows `[0, t)` only. Rows
/// before `min_periods` are 0. Successive components are sign-aligned with
/// the previous fit so the series does not flip between rows.
///
/// # Errors
///
/// `InvalidParameter` if `min_periods < 2` or `max_levels` is out of range.
pub fn expanding_pca_ofi(
    table: BookTable,
    max_levels: usize,
    min_periods: usize,
) -> Result<BookTable> {
    if min_periods < 2 {
        return Err(OfiError::invalid_parameter(
            "expanding PCA needs min_periods >= 2",
        ));
    }
    check_max_levels(&table, max_levels)?;

    let _span = tracing::info_span!("expanding_pca", max_levels, min_periods).entered();

    let matrix = ofi_matrix(&table, max_levels)?;
    let n = matrix.nrows();

    let mut sum = Array1::<f64>::zeros(max_levels);
    let mut outer_sum = Array2::<f64>::zeros((max_levels, max_levels));
    let mut previous: Option<Array1<f64>> = None;
    let mut scores = Vec::with_capacity(n);

    for (t, row) in matrix.rows().into_iter().enumerate() {
        if t >= min_periods {
            let mut projection = PcaProjection::from_moments(&sum, &outer_sum, t)?;
            if let Some(prev) = &previous {
                projection = projection.aligned_with(prev);
            }
            let centered = &row - projection.mean();
            scores.push(centered.dot(projection.component()));
            previous = Some(projection.component().clone());
        } else {
            scores.push(0.0);
        }

        // Row t joins the window only after it has been scored
        sum += &row;
        for i in 0..max_levels {
            for j in 0..max_levels {
                outer_sum[[i, j]] += row[i] * row[j];
            }
        }
    }

    tracing::info!(rows = n, "computed expanding-window PCA OFI");
    table.with_column(OFI_AGGREGATED_COLUMN, scores)
}
