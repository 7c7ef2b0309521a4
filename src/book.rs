//! Book snapshot table.
//!
//! [`BookTable`] is the columnar table every pipeline stage consumes and
//! returns. It holds one row per book snapshot:
//!
//! | Column | Type | Description |
//! |--------|------|-------------|
//! | `system_time` | `DateTime<Utc>` | Snapshot timestamp |
//! | `midpoint` | `f64` | Reference price |
//! | `bids_distance_i` / `asks_distance_i` | `f64` | Signed offset of level `i` from the midpoint |
//! | `bids_notional_i` / `asks_notional_i` | `f64` | Size at level `i` |
//!
//! plus any number of named derived `f64` columns appended by later stages
//! (`OFI_level_i`, `OFI_aggregated`, `future_ret_<h>`).
//!
//! # Invariants
//!
//! - Rows are sorted ascending by timestamp; equal timestamps keep their
//!   input order. Both constructors enforce this.
//! - Every column has exactly [`BookTable::len`] values.
//! - Column names are unique.
//!
//! The table is immutable once built. Stages take it by value and hand back
//! an augmented table, so ownership moves along the pipeline:
//!
//! ```text
//! BookTable ──compute_multi_level_ofi──▶ BookTable ──integrate──▶ BookTable ──returns──▶ ...
//! ```

use crate::error::{OfiError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the midpoint column.
pub const MIDPOINT_COLUMN: &str = "midpoint";

/// Name of the timestamp column.
pub const TIMESTAMP_COLUMN: &str = "system_time";

/// Book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Both sides, bid first.
    pub const ALL: [Side; 2] = [Side::Bid, Side::Ask];

    /// Column prefix used in input files (`bids` / `asks`).
    pub fn column_prefix(&self) -> &'static str {
        match self {
            Side::Bid => "bids",
            Side::Ask => "asks",
        }
    }

    /// Distance column name for `level`, e.g. `bids_distance_0`.
    pub fn distance_column(&self, level: usize) -> String {
        format!("{}_distance_{}", self.column_prefix(), level)
    }

    /// Notional column name for `level`, e.g. `asks_notional_3`.
    pub fn notional_column(&self, level: usize) -> String {
        format!("{}_notional_{}", self.column_prefix(), level)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}

/// Encoded quote at one book level: distance from the midpoint and notional.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LevelQuote {
    /// Signed offset from the midpoint (negative for bids, positive for asks)
    pub distance: f64,

    /// Size at this level
    pub notional: f64,
}

impl LevelQuote {
    pub fn new(distance: f64, notional: f64) -> Self {
        Self { distance, notional }
    }
}

/// A single book snapshot in row form.
///
/// Used to build synthetic tables and to read individual rows back.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use ofi_analysis::book::{BookSnapshot, BookTable, LevelQuote};
///
/// let t0 = Utc.with_ymd_and_hms(2021, 4, 7, 11, 33, 0).unwrap();
/// let snap = BookSnapshot::new(t0, 100.0)
///     .with_level(LevelQuote::new(-0.5, 10.0), LevelQuote::new(0.5, 12.0));
///
/// let table = BookTable::from_snapshots(vec![snap]).unwrap();
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.levels(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BookSnapshot {
    pub timestamp: DateTime<Utc>,
    pub midpoint: f64,
    pub bids: Vec<LevelQuote>,
    pub asks: Vec<LevelQuote>,
}

impl BookSnapshot {
    /// Create a snapshot with no levels.
    pub fn new(timestamp: DateTime<Utc>, midpoint: f64) -> Self {
        Self {
            timestamp,
            midpoint,
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    /// Append the next level (bid and ask quote).
    pub fn with_level(mut self, bid: LevelQuote, ask: LevelQuote) -> Self {
        self.bids.push(bid);
        self.asks.push(ask);
        self
    }

    /// Number of levels in this snapshot.
    pub fn levels(&self) -> usize {
        self.bids.len().min(self.asks.len())
    }
}

/// Raw columns for one side of one level.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct LevelColumns {
    pub(crate) distance: Vec<f64>,
    pub(crate) notional: Vec<f64>,
}

impl LevelColumns {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            distance: Vec::with_capacity(n),
            notional: Vec::with_capacity(n),
        }
    }
}

/// Columnar table of book snapshots, sorted by timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct BookTable {
    timestamps: Vec<DateTime<Utc>>,
    midpoint: Vec<f64>,
    bids: Vec<LevelColumns>,
    asks: Vec<LevelColumns>,
    derived: Vec<(String, Vec<f64>)>,
}

impl BookTable {
    /// Build a table from snapshot rows.
    ///
    /// Rows are stably sorted by timestamp. All snapshots must carry the same
    /// number of bid and ask levels.
    pub fn from_snapshots(snapshots: Vec<BookSnapshot>) -> Result<Self> {
        let n = snapshots.len();
        let levels = snapshots.first().map(|s| s.bids.len()).unwrap_or(0);

        let mut timestamps = Vec::with_capacity(n);
        let mut midpoint = Vec::with_capacity(n);
        let mut bids: Vec<LevelColumns> =
            (0..levels).map(|_| LevelColumns::with_capacity(n)).collect();
        let mut asks: Vec<LevelColumns> =
            (0..levels).map(|_| LevelColumns::with_capacity(n)).collect();

        for (row, snap) in snapshots.into_iter().enumerate() {
            if snap.bids.len() != levels || snap.asks.len() != levels {
                return Err(OfiError::data_format(format!(
                    "snapshot {} has {} bid / {} ask levels, expected {}",
                    row,
                    snap.bids.len(),
                    snap.asks.len(),
                    levels
                )));
            }

            timestamps.push(snap.timestamp);
            midpoint.push(snap.midpoint);
            for (level, (bid, ask)) in snap.bids.iter().zip(snap.asks.iter()).enumerate() {
                bids[level].distance.push(bid.distance);
                bids[level].notional.push(bid.notional);
                asks[level].distance.push(ask.distance);
                asks[level].notional.push(ask.notional);
            }
        }

        Self::from_columns(timestamps, midpoint, bids, asks)
    }

    /// Build a table from raw columns and sort it by timestamp.
    pub(crate) fn from_columns(
        timestamps: Vec<DateTime<Utc>>,
        midpoint: Vec<f64>,
        bids: Vec<LevelColumns>,
        asks: Vec<LevelColumns>,
    ) -> Result<Self> {
        let n = timestamps.len();

        if midpoint.len() != n {
            return Err(OfiError::data_format(format!(
                "midpoint column has {} rows, expected {}",
                midpoint.len(),
                n
            )));
        }
        if bids.len() != asks.len() {
            return Err(OfiError::data_format(format!(
                "{} bid levels but {} ask levels",
                bids.len(),
                asks.len()
            )));
        }
        for (level, (bid, ask)) in bids.iter().zip(asks.iter()).enumerate() {
            let lens = [
                bid.distance.len(),
                bid.notional.len(),
                ask.distance.len(),
                ask.notional.len(),
            ];
            if lens.iter().any(|&len| len != n) {
                return Err(OfiError::data_format(format!(
                    "level {level} columns have lengths {lens:?}, expected {n}"
                )));
            }
        }

        let table = Self {
            timestamps,
            midpoint,
            bids,
            asks,
            derived: Vec::new(),
        };

        Ok(table.sorted_by_time())
    }

    /// Stable sort of all columns by timestamp.
    fn sorted_by_time(self) -> Self {
        if self.timestamps.windows(2).all(|w| w[0] <= w[1]) {
            return self;
        }

        let mut order: Vec<usize> = (0..self.timestamps.len()).collect();
        // `sort_by_key` is stable: ties keep their input order.
        order.sort_by_key(|&i| self.timestamps[i]);

        let permute = |values: &[f64]| -> Vec<f64> { order.iter().map(|&i| values[i]).collect() };
        let permute_side = |cols: &[LevelColumns]| -> Vec<LevelColumns> {
            cols.iter()
                .map(|c| LevelColumns {
                    distance: permute(&c.distance),
                    notional: permute(&c.notional),
                })
                .collect()
        };

        Self {
            timestamps: order.iter().map(|&i| self.timestamps[i]).collect(),
            midpoint: permute(&self.midpoint),
            bids: permute_side(&self.bids),
            asks: permute_side(&self.asks),
            derived: self
                .derived
                .iter()
                .map(|(name, values)| (name.clone(), permute(values)))
                .collect(),
        }
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the table has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Number of book levels carried by the raw columns.
    #[inline]
    pub fn levels(&self) -> usize {
        self.bids.len()
    }

    /// Snapshot timestamps (ascending).
    #[inline]
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Midpoint column.
    #[inline]
    pub fn midpoint(&self) -> &[f64] {
        &self.midpoint
    }

    fn side_columns(&self, side: Side) -> &[LevelColumns] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// Distance column for `level` on `side`, if the level exists.
    pub fn distance(&self, level: usize, side: Side) -> Option<&[f64]> {
        self.side_columns(side)
            .get(level)
            .map(|c| c.distance.as_slice())
    }

    /// Notional column for `level` on `side`, if the level exists.
    pub fn notional(&self, level: usize, side: Side) -> Option<&[f64]> {
        self.side_columns(side)
            .get(level)
            .map(|c| c.notional.as_slice())
    }

    /// Look up any numeric column by name, raw or derived.
    ///
    /// Raw columns use the input-file names (`midpoint`, `bids_distance_0`,
    /// ...). The timestamp column is not numeric and is not returned here.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        if name == MIDPOINT_COLUMN {
            return Some(&self.midpoint);
        }
        if let Some(values) = self.raw_level_column(name) {
            return Some(values);
        }
        self.derived
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Whether a numeric column with this name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Names of the derived columns, in insertion order.
    pub fn derived_column_names(&self) -> Vec<&str> {
        self.derived.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Parse `{bids|asks}_{distance|notional}_{level}` and resolve it.
    fn raw_level_column(&self, name: &str) -> Option<&[f64]> {
        let mut parts = name.splitn(3, '_');
        let side = match parts.next()? {
            "bids" => Side::Bid,
            "asks" => Side::Ask,
            _ => return None,
        };
        let kind = parts.next()?;
        let level: usize = parts.next()?.parse().ok()?;
        match kind {
            "distance" => self.distance(level, side),
            "notional" => self.notional(level, side),
            _ => None,
        }
    }

    /// Return a new table with `values` appended as column `name`.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the length does not match the row count or the
    /// name is already taken.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();

        if values.len() != self.len() {
            return Err(OfiError::invalid_parameter(format!(
                "column '{}' has {} values, table has {} rows",
                name,
                values.len(),
                self.len()
            )));
        }
        if name == TIMESTAMP_COLUMN || self.has_column(&name) {
            return Err(OfiError::invalid_parameter(format!(
                "column '{name}' already exists"
            )));
        }

        self.derived.push((name, values));
        Ok(self)
    }

    /// Keep only the first `len` rows.
    pub fn truncate(mut self, len: usize) -> Self {
        self.timestamps.truncate(len);
        self.midpoint.truncate(len);
        for cols in self.bids.iter_mut().chain(self.asks.iter_mut()) {
            cols.distance.truncate(len);
            cols.notional.truncate(len);
        }
        for (_, values) in self.derived.iter_mut() {
            values.truncate(len);
        }
        self
    }

    /// Read row `index` back as a snapshot (raw columns only).
    pub fn snapshot(&self, index: usize) -> Option<BookSnapshot> {
        let timestamp = *self.timestamps.get(index)?;
        let quote = |c: &LevelColumns| LevelQuote::new(c.distance[index], c.notional[index]);

        Some(BookSnapshot {
            timestamp,
            midpoint: self.midpoint[index],
            bids: self.bids.iter().map(quote).collect(),
            asks: self.asks.iter().map(quote).collect(),
        })
    }
}
