//! First-principal-component projection for multi-level OFI.
//!
//! [`PcaProjection`] learns the direction of maximum variance of the
//! mean-centered per-level OFI matrix and projects rows onto it:
//!
//! ```text
//! C     = (X - μ)ᵀ (X - μ) / (n - 1)
//! C v₁  = λ₁ v₁                  (largest eigenvalue)
//! z(t)  = (x(t) - μ) · v₁
//! ```
//!
//! # Look-ahead
//!
//! Fitting on a full sample and projecting that same sample uses future rows
//! to build every past value. That is fine for descriptive analysis but not
//! for backtests. For causal use either fit on a training window and call
//! [`PcaProjection::transform`] on later data, or use
//! [`crate::features::aggregation::expanding_pca_ofi`], which refits on
//! strictly past rows.
//!
//! # Sign
//!
//! An eigenvector is only defined up to sign. The fitted component is
//! normalized so that its largest-magnitude loading is positive, which makes
//! one fit reproducible, but callers must not assume a consistent sign
//! across datasets.

use crate::error::{OfiError, Result};
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Maximum number of Jacobi sweeps.
const MAX_SWEEPS: usize = 100;

/// Eigen-decomposition of a symmetric matrix.
#[derive(Debug, Clone)]
pub struct EigenDecomposition {
    /// Eigenvalues, sorted in descending order
    pub eigenvalues: Array1<f64>,

    /// Eigenvectors as columns, in eigenvalue order
    pub eigenvectors: Array2<f64>,
}

impl EigenDecomposition {
    /// Decompose a symmetric matrix with cyclic Jacobi rotations.
    ///
    /// Only the symmetric part is meaningful; the input is not checked for
    /// symmetry.
    pub fn from_symmetric(matrix: &Array2<f64>) -> Self {
        let n = matrix.nrows();
        let mut a = matrix.clone();
        let mut v = Array2::<f64>::eye(n);

        let scale: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();

        for _ in 0..MAX_SWEEPS {
            let mut off = 0.0;
            for p in 0..n {
                for q in (p + 1)..n {
                    off += a[[p, q]] * a[[p, q]];
                }
            }
            if off.sqrt() <= 1e-15 * scale.max(f64::MIN_POSITIVE) {
                break;
            }

            for p in 0..n {
                for q in (p + 1)..n {
                    let apq = a[[p, q]];
                    if apq == 0.0 {
                        continue;
                    }

                    let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                    let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                    let c = 1.0 / (t * t + 1.0).sqrt();
                    let s = t * c;

                    // A <- Jᵀ A J, V <- V J
                    for k in 0..n {
                        let akp = a[[k, p]];
                        let akq = a[[k, q]];
                        a[[k, p]] = c * akp - s * akq;
                        a[[k, q]] = s * akp + c * akq;
                    }
                    for k in 0..n {
                        let apk = a[[p, k]];
                        let aqk = a[[q, k]];
                        a[[p, k]] = c * apk - s * aqk;
                        a[[q, k]] = s * apk + c * aqk;
                    }
                    for k in 0..n {
                        let vkp = v[[k, p]];
                        let vkq = v[[k, q]];
                        v[[k, p]] = c * vkp - s * vkq;
                        v[[k, q]] = s * vkp + c * vkq;
                    }
                }
            }
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&i, &j| {
            a[[j, j]]
                .partial_cmp(&a[[i, i]])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let eigenvalues = Array1::from_iter(order.iter().map(|&i| a[[i, i]]));
        let mut eigenvectors = Array2::zeros((n, n));
        for (new_idx, &old_idx) in order.iter().enumerate() {
            eigenvectors.column_mut(new_idx).assign(&v.column(old_idx));
        }

        Self {
            eigenvalues,
            eigenvectors,
        }
    }
}

/// Sample covariance matrix of the columns of `data` (denominator `n - 1`).
///
/// A single row yields the zero matrix.
pub fn covariance_matrix(data: ArrayView2<'_, f64>) -> Array2<f64> {
    let (n, m) = data.dim();
    if n == 0 {
        return Array2::zeros((m, m));
    }
    let mean = data.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(m));
    let centered = &data - &mean;
    let denom = (n.saturating_sub(1)).max(1) as f64;
    centered.t().dot(&centered) / denom
}

/// One-component PCA fitted on a `[rows, features]` matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct PcaProjection {
    mean: Array1<f64>,
    component: Array1<f64>,
    explained_variance: f64,
    explained_variance_ratio: f64,
    n_samples: usize,
}

impl PcaProjection {
    /// Fit the first principal component of `data`.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if `data` has no rows or no columns.
    pub fn fit(data: &Array2<f64>) -> Result<Self> {
        let (n, m) = data.dim();
        if n == 0 || m == 0 {
            return Err(OfiError::invalid_parameter(format!(
                "PCA needs at least one row and one column, got {n}x{m}"
            )));
        }

        let mean = data.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(m));
        let cov = covariance_matrix(data.view());
        Ok(Self::from_covariance(mean, &cov, n))
    }

    /// Fit from running moments: column sums and the sum of outer products.
    ///
    /// Used by the expanding-window aggregation to refit in `O(m³)` per row.
    pub(crate) fn from_moments(
        sum: &Array1<f64>,
        outer_sum: &Array2<f64>,
        count: usize,
    ) -> Result<Self> {
        if count == 0 {
            return Err(OfiError::invalid_parameter("PCA needs at least one row"));
        }
        let n = count as f64;
        let mean = sum / n;
        let denom = (count.saturating_sub(1)).max(1) as f64;

        let mut cov = outer_sum - &(n * outer(&mean, &mean));
        cov /= denom;
        Ok(Self::from_covariance(mean, &cov, count))
    }

    fn from_covariance(mean: Array1<f64>, cov: &Array2<f64>, n_samples: usize) -> Self {
        let eigen = EigenDecomposition::from_symmetric(cov);
        let mut component = eigen.eigenvectors.column(0).to_owned();

        // Largest-magnitude loading positive
        let pivot = component
            .iter()
            .copied()
            .fold(0.0_f64, |best, x| if x.abs() > best.abs() { x } else { best });
        if pivot < 0.0 {
            component.mapv_inplace(|x| -x);
        }

        let explained_variance = eigen.eigenvalues[0].max(0.0);
        let total: f64 = eigen.eigenvalues.iter().map(|&l| l.max(0.0)).sum();
        let explained_variance_ratio = if total > 0.0 {
            explained_variance / total
        } else {
            0.0
        };

        Self {
            mean,
            component,
            explained_variance,
            explained_variance_ratio,
            n_samples,
        }
    }

    /// Project rows of `data` onto the fitted component.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the column count differs from the fit.
    pub fn transform(&self, data: &Array2<f64>) -> Result<Array1<f64>> {
        if data.ncols() != self.mean.len() {
            return Err(OfiError::invalid_parameter(format!(
                "PCA fitted on {} columns, got {}",
                self.mean.len(),
                data.ncols()
            )));
        }
        let centered = data - &self.mean;
        Ok(centered.dot(&self.component))
    }

    /// Fit on `data` and project the same rows (full-sample, non-causal).
    pub fn fit_transform(data: &Array2<f64>) -> Result<(Self, Array1<f64>)> {
        let projection = Self::fit(data)?;
        let scores = projection.transform(data)?;
        Ok((projection, scores))
    }

    /// Flip the component if it points away from `reference`.
    pub(crate) fn aligned_with(mut self, reference: &Array1<f64>) -> Self {
        if self.component.dot(reference) < 0.0 {
            self.component.mapv_inplace(|x| -x);
        }
        self
    }

    /// Unit-length first principal component (one loading per level).
    pub fn component(&self) -> &Array1<f64> {
        &self.component
    }

    /// Column means subtracted before projection.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Variance along the component (largest covariance eigenvalue).
    pub fn explained_variance(&self) -> f64 {
        self.explained_variance
    }

    /// Share of total variance captured by the component (0 when the data
    /// has no variance).
    pub fn explained_variance_ratio(&self) -> f64 {
        self.explained_variance_ratio
    }

    /// Rows the projection was fitted on.
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }
}

fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    Array2::from_shape_fn((a.len(), b.len()), |(i, j)| a[i] * b[j])
}
