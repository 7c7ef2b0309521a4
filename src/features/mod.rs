//! Order flow imbalance features for LOB snapshot tables.
//!
//! Based on "Cross-impact of order flow imbalance in equity markets"
//! (Cont, Cucuringu & Zhang, 2023).
//!
//! # Architecture
//!
//! - `ofi`: price/size reconstruction and per-level OFI (`OFI_level_i`)
//! - `aggregation`: combine levels into `OFI_aggregated` (sum, avg, PCA)
//! - `pca`: first-principal-component projection used by the PCA method
//!
//! # Usage
//!
//! ```ignore
//! use ofi_analysis::features::{compute_multi_level_ofi, integrate_multi_level_ofi, AggregationMethod};
//!
//! let table = compute_multi_level_ofi(table, 5)?;
//! let table = integrate_multi_level_ofi(table, 5, AggregationMethod::Sum)?;
//! ```

pub mod aggregation;
pub mod ofi;
pub mod pca;

pub use aggregation::{
    aggregate_levels, aggregate_with_projection, expanding_pca_ofi, integrate_multi_level_ofi,
    AggregationMethod, OFI_AGGREGATED_COLUMN,
};
pub use ofi::{
    compute_level_ofi, compute_multi_level_ofi, ofi_level_column, ofi_matrix, reconstruct_price,
    reconstruct_size,
};
pub use pca::{covariance_matrix, EigenDecomposition, PcaProjection};
