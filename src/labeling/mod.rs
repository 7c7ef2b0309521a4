//! Forward return targets for OFI regressions.
//!
//! The regression target is the simple percentage change of the midpoint
//! over a horizon of `h` rows:
//!
//! ```text
//! future_ret_h(t) = midpoint(t + h) / midpoint(t) - 1
//! ```
//!
//! The last `h` rows have no future midpoint and are dropped from the table,
//! so every remaining row has a defined target.
//!
//! # Example
//!
//! ```ignore
//! use ofi_analysis::labeling::{compute_short_term_returns, future_return_column};
//!
//! let table = compute_short_term_returns(table, 1)?;
//! let returns = table.column(&future_return_column(1)).unwrap();
//! ```

pub mod returns;

pub use returns::{compute_short_term_returns, forward_returns, future_return_column};

// ============================================================================
// Return Statistics
// ============================================================================

/// Summary statistics of a forward-return column.
///
/// Non-finite returns (a zero midpoint produces `inf`) are counted but kept
/// out of the moments.
///
/// # Example
///
/// ```
/// use ofi_analysis::labeling::ReturnStats;
///
/// let stats = ReturnStats::from_returns(&[0.01, -0.01, 0.02]);
/// assert_eq!(stats.total, 3);
/// assert!((stats.max_return - 0.02).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStats {
    /// Number of returns, including non-finite ones
    pub total: usize,

    /// Number of non-finite returns
    pub non_finite: usize,

    /// Returns greater than zero
    pub up_count: usize,

    /// Returns less than zero
    pub down_count: usize,

    /// Mean of the finite returns
    pub mean_return: f64,

    /// Sample standard deviation of the finite returns
    pub std_return: f64,

    /// Smallest finite return
    pub min_return: f64,

    /// Largest finite return
    pub max_return: f64,
}

impl ReturnStats {
    /// Compute statistics over a slice of returns.
    pub fn from_returns(returns: &[f64]) -> Self {
        let finite: Vec<f64> = returns.iter().copied().filter(|r| r.is_finite()).collect();
        let mut stats = Self {
            total: returns.len(),
            non_finite: returns.len() - finite.len(),
            ..Self::default()
        };

        if finite.is_empty() {
            return stats;
        }

        let n = finite.len() as f64;
        stats.mean_return = finite.iter().sum::<f64>() / n;
        stats.std_return = if finite.len() > 1 {
            let ss: f64 = finite.iter().map(|r| (r - stats.mean_return).powi(2)).sum();
            (ss / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        stats.min_return = finite.iter().copied().fold(f64::INFINITY, f64::min);
        stats.max_return = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        stats.up_count = finite.iter().filter(|&&r| r > 0.0).count();
        stats.down_count = finite.iter().filter(|&&r| r < 0.0).count();
        stats
    }

    /// Returns that are exactly zero.
    pub fn flat_count(&self) -> usize {
        self.total - self.non_finite - self.up_count - self.down_count
    }
}

impl Default for ReturnStats {
    fn default() -> Self {
        Self {
            total: 0,
            non_finite: 0,
            up_count: 0,
            down_count: 0,
            mean_return: 0.0,
            std_return: 0.0,
            min_return: 0.0,
            max_return: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_stats_basic() {
        let stats = ReturnStats::from_returns(&[0.01, -0.02, 0.0, 0.03]);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.up_count, 2);
        assert_eq!(stats.down_count, 1);
        assert_eq!(stats.flat_count(), 1);
        assert!((stats.mean_return - 0.005).abs() < 1e-12);
        assert!((stats.min_return + 0.02).abs() < 1e-12);
        assert!((stats.max_return - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_return_stats_skips_non_finite() {
        let stats = ReturnStats::from_returns(&[f64::INFINITY, 0.01, f64::NAN]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.non_finite, 2);
        assert!((stats.mean_return - 0.01).abs() < 1e-12);
        assert_eq!(stats.std_return, 0.0);
    }

    #[test]
    fn test_return_stats_empty() {
        let stats = ReturnStats::from_returns(&[]);
        assert_eq!(stats, ReturnStats::default());
    }
}
