//! Multi-Level Order Flow Imbalance
//!
//! Implements the multi-level OFI of "Cross-impact of order flow imbalance in
//! equity markets" (Cont, Cucuringu & Zhang, 2023) for book snapshots that
//! encode each level as a distance from the midpoint plus a notional size.
//!
//! # Reconstruction
//!
//! ```text
//! price(t, i, s) = midpoint(t) + distance_i_s(t)
//! size(t, i, s)  = notional_i_s(t)
//! ```
//!
//! Bid distances are normally negative and ask distances positive, but the
//! reconstruction is side-agnostic and does not check signs.
//!
//! # Per-level OFI
//!
//! For level `i` and row `t` (row `t-1` is its predecessor in time order):
//!
//! ```text
//! OFI_i(t) = (P^b_i(t) - P^b_i(t-1)) × (V^b_i(t) + V^b_i(t-1)) / 2
//!          - (P^a_i(t) - P^a_i(t-1)) × (V^a_i(t) + V^a_i(t-1)) / 2
//! ```
//!
//! The price change is weighted by the average size across the two
//! snapshots. A rising bid or a falling ask both push OFI up. Row 0 has no
//! predecessor and is defined as 0.
//!
//! # Example
//!
//! ```ignore
//! use ofi_analysis::features::ofi::compute_multi_level_ofi;
//!
//! let table = compute_multi_level_ofi(table, 5)?;
//! let level0 = table.column("OFI_level_0").unwrap();
//! ```

use crate::book::{BookTable, Side};
use crate::error::{OfiError, Result};
use ndarray::Array2;

/// Name of the OFI column for `level`, e.g. `OFI_level_0`.
pub fn ofi_level_column(level: usize) -> String {
    format!("OFI_level_{level}")
}

fn check_level(table: &BookTable, level: usize) -> Result<()> {
    if level >= table.levels() {
        return Err(OfiError::invalid_parameter(format!(
            "level {} out of range: table has {} levels",
            level,
            table.levels()
        )));
    }
    Ok(())
}

/// Reconstruct the absolute price series for `level` on `side`.
///
/// `price = midpoint + distance`.
pub fn reconstruct_price(table: &BookTable, level: usize, side: Side) -> Result<Vec<f64>> {
    check_level(table, level)?;
    let distance = table
        .distance(level, side)
        .ok_or_else(|| OfiError::data_format(side.distance_column(level)))?;

    Ok(table
        .midpoint()
        .iter()
        .zip(distance.iter())
        .map(|(&mid, &dist)| mid + dist)
        .collect())
}

/// Reconstruct the size series for `level` on `side`.
///
/// The notional is used as the size without unit conversion.
pub fn reconstruct_size(table: &BookTable, level: usize, side: Side) -> Result<Vec<f64>> {
    check_level(table, level)?;
    table
        .notional(level, side)
        .map(<[f64]>::to_vec)
        .ok_or_else(|| OfiError::data_format(side.notional_column(level)))
}

/// OFI contribution of one transition at one level.
///
/// Arguments are `(previous, current)` pairs for bid price, bid size, ask
/// price and ask size.
#[inline]
pub fn level_ofi(
    bid_price: (f64, f64),
    bid_size: (f64, f64),
    ask_price: (f64, f64),
    ask_size: (f64, f64),
) -> f64 {
    let bid_term = (bid_price.1 - bid_price.0) * (bid_size.1 + bid_size.0) / 2.0;
    let ask_term = (ask_price.1 - ask_price.0) * (ask_size.1 + ask_size.0) / 2.0;
    bid_term - ask_term
}

/// Compute the OFI series for a single level.
///
/// Returns one value per row; row 0 is 0. A NaN produced by non-finite
/// inputs is replaced by 0.
pub fn compute_level_ofi(table: &BookTable, level: usize) -> Result<Vec<f64>> {
    let bid_price = reconstruct_price(table, level, Side::Bid)?;
    let ask_price = reconstruct_price(table, level, Side::Ask)?;
    let bid_size = reconstruct_size(table, level, Side::Bid)?;
    let ask_size = reconstruct_size(table, level, Side::Ask)?;

    let n = table.len();
    let mut ofi = Vec::with_capacity(n);
    if n == 0 {
        return Ok(ofi);
    }

    ofi.push(0.0);
    let mut nan_count = 0usize;
    for t in 1..n {
        let value = level_ofi(
            (bid_price[t - 1], bid_price[t]),
            (bid_size[t - 1], bid_size[t]),
            (ask_price[t - 1], ask_price[t]),
            (ask_size[t - 1], ask_size[t]),
        );
        if value.is_nan() {
            nan_count += 1;
            ofi.push(0.0);
        } else {
            ofi.push(value);
        }
    }

    if nan_count > 0 {
        tracing::debug!(level, nan_count, "replaced NaN OFI values with 0");
    }

    Ok(ofi)
}

/// Append `OFI_level_0 .. OFI_level_{max_levels-1}` to the table.
///
/// # Errors
///
/// `InvalidParameter` if `max_levels` is 0 or exceeds the table's levels.
pub fn compute_multi_level_ofi(table: BookTable, max_levels: usize) -> Result<BookTable> {
    check_max_levels(&table, max_levels)?;

    let _span = tracing::info_span!("multi_level_ofi", max_levels).entered();

    let mut table = table;
    for level in 0..max_levels {
        let ofi = compute_level_ofi(&table, level)?;
        table = table.with_column(ofi_level_column(level), ofi)?;
    }

    tracing::info!(rows = table.len(), levels = max_levels, "computed multi-level OFI");
    Ok(table)
}

pub(crate) fn check_max_levels(table: &BookTable, max_levels: usize) -> Result<()> {
    if max_levels == 0 {
        return Err(OfiError::invalid_parameter("max_levels must be >= 1"));
    }
    if max_levels > table.levels() {
        return Err(OfiError::invalid_parameter(format!(
            "max_levels = {} but table has only {} levels",
            max_levels,
            table.levels()
        )));
    }
    Ok(())
}

/// Collect the per-level OFI columns into a `[rows, max_levels]` matrix.
///
/// # Errors
///
/// `InvalidParameter` if `max_levels` is 0, `DataFormat` if an
/// `OFI_level_i` column is missing.
pub fn ofi_matrix(table: &BookTable, max_levels: usize) -> Result<Array2<f64>> {
    if max_levels == 0 {
        return Err(OfiError::invalid_parameter("max_levels must be >= 1"));
    }

    let n = table.len();
    let mut matrix = Array2::zeros((n, max_levels));
    for level in 0..max_levels {
        let name = ofi_level_column(level);
        let column = table.column(&name).ok_or_else(|| {
            OfiError::data_format(format!(
                "missing column '{name}': run compute_multi_level_ofi first"
            ))
        })?;
        for (row, &value) in column.iter().enumerate() {
            matrix[[row, level]] = value;
        }
    }

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{BookSnapshot, LevelQuote};
    use chrono::{Duration, TimeZone, Utc};

    /// Build a one-level table from (midpoint, bid dist, bid size, ask dist, ask size) rows.
    fn one_level_table(rows: &[(f64, f64, f64, f64, f64)]) -> BookTable {
        let t0 = Utc.with_ymd_and_hms(2021, 4, 7, 11, 0, 0).unwrap();
        let snaps = rows
            .iter()
            .enumerate()
            .map(|(i, &(mid, bd, bs, ad, asz))| {
                BookSnapshot::new(t0 + Duration::minutes(i as i64), mid)
                    .with_level(LevelQuote::new(bd, bs), LevelQuote::new(ad, asz))
            })
            .collect();
        BookTable::from_snapshots(snaps).unwrap()
    }

    #[test]
    fn test_reconstruct_price_and_size() {
        let table = one_level_table(&[(100.0, -0.5, 3.0, 0.5, 4.0), (101.0, -1.0, 5.0, 2.0, 6.0)]);

        assert_eq!(
            reconstruct_price(&table, 0, Side::Bid).unwrap(),
            vec![99.5, 100.0]
        );
        assert_eq!(
            reconstruct_price(&table, 0, Side::Ask).unwrap(),
            vec![100.5, 103.0]
        );
        assert_eq!(reconstruct_size(&table, 0, Side::Bid).unwrap(), vec![3.0, 5.0]);
        assert!(reconstruct_price(&table, 1, Side::Bid)
            .unwrap_err()
            .is_invalid_parameter());
    }

    #[test]
    fn test_first_row_is_zero() {
        let table = one_level_table(&[(100.0, -0.5, 3.0, 0.5, 4.0), (101.0, -1.0, 5.0, 2.0, 6.0)]);
        let ofi = compute_level_ofi(&table, 0).unwrap();
        assert_eq!(ofi[0], 0.0);
    }

    #[test]
    fn test_bid_rise_is_positive() {
        // Bid price 99.5 -> 100.5 with sizes 2 and 4; ask unchanged
        let table = one_level_table(&[(100.0, -0.5, 2.0, 0.5, 1.0), (101.0, -0.5, 4.0, -0.5, 1.0)]);
        let ofi = compute_level_ofi(&table, 0).unwrap();
        // bid: 1.0 * 3.0 = 3.0; ask: 0.0 * 1.0 = 0.0
        assert!((ofi[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_ask_drop_is_positive() {
        // Ask price 100.5 -> 100.0 with sizes 2 and 2; bid unchanged
        let table = one_level_table(&[(100.0, -0.5, 1.0, 0.5, 2.0), (100.0, -0.5, 1.0, 0.0, 2.0)]);
        let ofi = compute_level_ofi(&table, 0).unwrap();
        // ask: (-0.5) * 2.0 = -1.0, subtracted => +1.0
        assert!((ofi[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_size_change_without_price_change_is_zero() {
        let table = one_level_table(&[(100.0, -0.5, 1.0, 0.5, 2.0), (100.0, -0.5, 9.0, 0.5, 7.0)]);
        let ofi = compute_level_ofi(&table, 0).unwrap();
        assert_eq!(ofi, vec![0.0, 0.0]);
    }

    #[test]
    fn test_nan_input_becomes_zero() {
        let table = one_level_table(&[(100.0, -0.5, 1.0, 0.5, 2.0), (f64::NAN, -0.5, 1.0, 0.5, 2.0)]);
        let ofi = compute_level_ofi(&table, 0).unwrap();
        assert_eq!(ofi, vec![0.0, 0.0]);
    }

    #[test]
    fn test_multi_level_columns_added() {
        let t0 = Utc.with_ymd_and_hms(2021, 4, 7, 11, 0, 0).unwrap();
        let snaps = (0..4)
            .map(|i| {
                let mut snap = BookSnapshot::new(t0 + Duration::minutes(i), 100.0 + i as f64);
                for level in 0..3 {
                    let d = 0.5 * (level as f64 + 1.0);
                    snap = snap.with_level(LevelQuote::new(-d, 1.0), LevelQuote::new(d, 1.0));
                }
                snap
            })
            .collect();
        let table = BookTable::from_snapshots(snaps).unwrap();

        let table = compute_multi_level_ofi(table, 2).unwrap();
        assert!(table.has_column("OFI_level_0"));
        assert!(table.has_column("OFI_level_1"));
        assert!(!table.has_column("OFI_level_2"));

        let m = ofi_matrix(&table, 2).unwrap();
        assert_eq!(m.dim(), (4, 2));
        assert!(ofi_matrix(&table, 3).unwrap_err().is_data_format());
    }

    #[test]
    fn test_max_levels_out_of_range() {
        let table = one_level_table(&[(100.0, -0.5, 1.0, 0.5, 2.0)]);
        assert!(compute_multi_level_ofi(table.clone(), 0)
            .unwrap_err()
            .is_invalid_parameter());
        assert!(compute_multi_level_ofi(table, 2)
            .unwrap_err()
            .is_invalid_parameter());
    }

    #[test]
    fn test_empty_table() {
        let table = BookTable::from_snapshots(Vec::new()).unwrap();
        assert!(compute_level_ofi(&table, 0).unwrap_err().is_invalid_parameter());
    }
}
