//! Forward midpoint returns.

use crate::book::BookTable;
use crate::error::{OfiError, Result};

/// Name of the forward-return column for `horizon`, e.g. `future_ret_1`.
pub fn future_return_column(horizon: usize) -> String {
    format!("future_ret_{horizon}")
}

fn check_horizon(horizon: usize, rows: usize) -> Result<()> {
    if horizon < 1 {
        return Err(OfiError::invalid_parameter("horizon must be >= 1"));
    }
    if horizon >= rows {
        return Err(OfiError::invalid_parameter(format!(
            "horizon {horizon} leaves no rows: table has {rows} rows"
        )));
    }
    Ok(())
}

/// Forward percentage change of a price series.
///
/// Returns `n - horizon` values where value `t` is
/// `prices[t + horizon] / prices[t] - 1`.
///
/// # Errors
///
/// `InvalidParameter` if `horizon < 1` or `horizon >= prices.len()`.
pub fn forward_returns(prices: &[f64], horizon: usize) -> Result<Vec<f64>> {
    check_horizon(horizon, prices.len())?;

    Ok(prices
        .iter()
        .zip(prices[horizon..].iter())
        .map(|(&now, &future)| future / now - 1.0)
        .collect())
}

/// Append `future_ret_<horizon>` and drop the last `horizon` rows.
///
/// Every other column is truncated with the table so rows stay aligned.
/// Non-finite returns (a zero midpoint) are kept and logged as a warning.
///
/// # Errors
///
/// `InvalidParameter` if `horizon < 1` or `horizon >= table.len()`.
pub fn compute_short_term_returns(table: BookTable, horizon: usize) -> Result<BookTable> {
    let returns = forward_returns(table.midpoint(), horizon)?;

    let non_finite = returns.iter().filter(|r| !r.is_finite()).count();
    if non_finite > 0 {
        tracing::warn!(horizon, non_finite, "forward returns contain non-finite values");
    }

    let kept = returns.len();
    tracing::info!(horizon, rows = kept, dropped = horizon, "computed forward returns");

    table
        .truncate(kept)
        .with_column(future_return_column(horizon), returns)
}
