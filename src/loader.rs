//! CSV loading and cleaning for book snapshot files.
//!
//! The input is a delimited text file with a header row. Required columns:
//!
//! - `system_time`: timestamp string
//! - `midpoint`: reference price
//! - per level `i`: `bids_distance_i`, `asks_distance_i`, `bids_notional_i`,
//!   `asks_notional_i`
//!
//! Levels are discovered as the contiguous run `0, 1, 2, ...` for which all
//! four columns are present, unless a level count is requested explicitly.
//! Any other columns are carried through missing-value detection only.
//!
//! # Cleaning
//!
//! 1. Rows with a missing field anywhere (empty, `nan`, `NA`, `null`, ...)
//!    are dropped without error.
//! 2. Timestamps are parsed into UTC.
//! 3. Rows are stably sorted by timestamp and reindexed contiguously.
//!
//! # Example
//!
//! ```ignore
//! use ofi_analysis::loader::{load_and_preprocess_data, BookLoader};
//!
//! let table = load_and_preprocess_data("data/BTC_1min.csv")?;
//!
//! // Require exactly the first five levels to be present
//! let (table, stats) = BookLoader::new("data/BTC_1min.csv")
//!     .levels(Some(5))
//!     .load_with_stats()?;
//! println!("dropped {} incomplete rows", stats.rows_dropped);
//! ```

use crate::book::{BookTable, LevelColumns, Side, MIDPOINT_COLUMN, TIMESTAMP_COLUMN};
use crate::error::{OfiError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};

/// Field values treated as missing, compared case-insensitively.
const MISSING_MARKERS: &[&str] = &["nan", "na", "n/a", "null", "none", "nat"];

/// Statistics collected while loading a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Data rows read from the file
    pub rows_read: usize,

    /// Rows dropped because a field was missing
    pub rows_dropped: usize,

    /// Rows kept in the output table
    pub rows_kept: usize,

    /// Book levels loaded
    pub levels: usize,
}

/// Loader for book snapshot CSV files.
#[derive(Debug, Clone)]
pub struct BookLoader {
    path: PathBuf,
    levels: Option<usize>,
}

impl BookLoader {
    /// Create a loader for `path` that discovers the level count.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            levels: None,
        }
    }

    /// Require exactly `levels` book levels (`None` = discover).
    pub fn levels(mut self, levels: Option<usize>) -> Self {
        self.levels = levels;
        self
    }

    /// Path this loader reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and clean the file.
    pub fn load(&self) -> Result<BookTable> {
        self.load_with_stats().map(|(table, _)| table)
    }

    /// Load and clean the file, also returning load statistics.
    pub fn load_with_stats(&self) -> Result<(BookTable, LoaderStats)> {
        let _span = tracing::info_span!("load", path = %self.path.display()).entered();

        let file = std::fs::File::open(&self.path).map_err(|e| {
            OfiError::Io(io::Error::new(
                e.kind(),
                format!("cannot open {}: {}", self.path.display(), e),
            ))
        })?;

        read_book_csv(io::BufReader::new(file), self.levels)
    }
}

/// Load a book snapshot file, discovering its levels.
///
/// Equivalent to `BookLoader::new(path).load()`.
pub fn load_and_preprocess_data<P: AsRef<Path>>(path: P) -> Result<BookTable> {
    BookLoader::new(path).load()
}

/// Column positions of the fields the table is built from.
struct ColumnLayout {
    timestamp: usize,
    midpoint: usize,
    /// Per level: (bid distance, bid notional, ask distance, ask notional)
    levels: Vec<[usize; 4]>,
    width: usize,
}

impl ColumnLayout {
    fn from_headers(headers: &csv::StringRecord, levels: Option<usize>) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let timestamp = find(TIMESTAMP_COLUMN).ok_or_else(|| {
            OfiError::data_format(format!("missing required column '{TIMESTAMP_COLUMN}'"))
        })?;
        let midpoint = find(MIDPOINT_COLUMN).ok_or_else(|| {
            OfiError::data_format(format!("missing required column '{MIDPOINT_COLUMN}'"))
        })?;

        let level_columns = |level: usize| -> std::result::Result<[usize; 4], String> {
            let names = [
                Side::Bid.distance_column(level),
                Side::Bid.notional_column(level),
                Side::Ask.distance_column(level),
                Side::Ask.notional_column(level),
            ];
            let mut positions = [0usize; 4];
            for (slot, name) in positions.iter_mut().zip(names.iter()) {
                *slot = find(name.as_str()).ok_or_else(|| name.clone())?;
            }
            Ok(positions)
        };

        let mut layout_levels = Vec::new();
        match levels {
            Some(count) => {
                for level in 0..count {
                    let positions = level_columns(level).map_err(|name| {
                        OfiError::data_format(format!(
                            "missing column '{name}' required for {count} levels"
                        ))
                    })?;
                    layout_levels.push(positions);
                }
            }
            None => {
                while let Ok(positions) = level_columns(layout_levels.len()) {
                    layout_levels.push(positions);
                }
            }
        }

        Ok(Self {
            timestamp,
            midpoint,
            levels: layout_levels,
            width: headers.len(),
        })
    }
}

/// Read and clean a book snapshot CSV from any reader.
///
/// `levels` fixes the number of levels to load; `None` discovers it from the
/// header.
pub fn read_book_csv<R: io::Read>(
    reader: R,
    levels: Option<usize>,
) -> Result<(BookTable, LoaderStats)> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let layout = ColumnLayout::from_headers(&headers, levels)?;
    let n_levels = layout.levels.len();

    tracing::debug!(columns = layout.width, levels = n_levels, "parsed header");

    let mut stats = LoaderStats {
        levels: n_levels,
        ..Default::default()
    };

    let mut timestamps = Vec::new();
    let mut midpoint = Vec::new();
    let mut bids: Vec<LevelColumns> = (0..n_levels).map(|_| LevelColumns::default()).collect();
    let mut asks: Vec<LevelColumns> = (0..n_levels).map(|_| LevelColumns::default()).collect();

    for record in rdr.records() {
        let record = record?;
        stats.rows_read += 1;

        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() < layout.width || record.iter().any(is_missing) {
            stats.rows_dropped += 1;
            tracing::debug!(line, "dropping incomplete row");
            continue;
        }

        let raw_ts = record[layout.timestamp].trim();
        let ts = parse_timestamp(raw_ts).ok_or_else(|| {
            OfiError::data_format(format!(
                "line {line}: cannot parse {TIMESTAMP_COLUMN} '{raw_ts}'"
            ))
        })?;

        let number = |idx: usize| -> Result<f64> {
            let raw = record[idx].trim();
            raw.parse::<f64>().map_err(|_| {
                OfiError::data_format(format!(
                    "line {}: column '{}' has non-numeric value '{}'",
                    line,
                    headers.get(idx).unwrap_or("?"),
                    raw
                ))
            })
        };

        timestamps.push(ts);
        midpoint.push(number(layout.midpoint)?);
        for (level, [bid_dist, bid_notional, ask_dist, ask_notional]) in
            layout.levels.iter().enumerate()
        {
            bids[level].distance.push(number(*bid_dist)?);
            bids[level].notional.push(number(*bid_notional)?);
            asks[level].distance.push(number(*ask_dist)?);
            asks[level].notional.push(number(*ask_notional)?);
        }
    }

    let table = BookTable::from_columns(timestamps, midpoint, bids, asks)?;
    stats.rows_kept = table.len();

    tracing::info!(
        rows_read = stats.rows_read,
        rows_dropped = stats.rows_dropped,
        rows_kept = stats.rows_kept,
        levels = stats.levels,
        "loaded book snapshots"
    );

    Ok((table, stats))
}

fn is_missing(field: &str) -> bool {
    let field = field.trim();
    field.is_empty() || MISSING_MARKERS.iter().any(|m| field.eq_ignore_ascii_case(m))
}

/// Parse a timestamp string into UTC.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.f]` with or without a UTC
/// offset, the `T`-separated variant, and plain dates. Values without an
/// offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in [
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%.f%z",
        "%Y-%m-%dT%H:%M:%S%.f%z",
    ] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const HEADER: &str = "system_time,midpoint,bids_distance_0,asks_distance_0,bids_notional_0,asks_notional_0,bids_distance_1,asks_distance_1,bids_notional_1,asks_notional_1";

    fn csv_of(rows: &[&str]) -> String {
        let mut out = String::from(HEADER);
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let a = parse_timestamp("2021-04-07 11:33:41.122161+00:00").unwrap();
        assert_eq!(a.hour(), 11);
        assert_eq!(a.nanosecond(), 122_161_000);

        let b = parse_timestamp("2021-04-07T11:33:41Z").unwrap();
        assert_eq!(b.minute(), 33);

        let c = parse_timestamp("2021-04-07 13:33:41+02:00").unwrap();
        assert_eq!(c.hour(), 11);

        let d = parse_timestamp("2021-04-07 11:33:41").unwrap();
        assert_eq!(d.second(), 41);

        let e = parse_timestamp("2021-04-07").unwrap();
        assert_eq!(e.day(), 7);

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_discovers_levels_and_sorts() {
        let data = csv_of(&[
            "2021-04-07 11:00:02,102,-1,1,10,11,-2,2,20,21",
            "2021-04-07 11:00:00,100,-1,1,10,11,-2,2,20,21",
            "2021-04-07 11:00:01,101,-1,1,10,11,-2,2,20,21",
        ]);
        let (table, stats) = read_book_csv(data.as_bytes(), None).unwrap();

        assert_eq!(stats.levels, 2);
        assert_eq!(stats.rows_read, 3);
        assert_eq!(stats.rows_dropped, 0);
        assert_eq!(table.midpoint(), &[100.0, 101.0, 102.0]);
        assert_eq!(table.column("bids_notional_1"), Some(&[20.0, 20.0, 20.0][..]));
    }

    #[test]
    fn test_drops_incomplete_rows() {
        let data = csv_of(&[
            "2021-04-07 11:00:00,100,-1,1,10,11,-2,2,20,21",
            "2021-04-07 11:00:01,,-1,1,10,11,-2,2,20,21",
            "2021-04-07 11:00:02,102,-1,1,NaN,11,-2,2,20,21",
            "2021-04-07 11:00:03,103,-1,1,10,11",
            ",104,-1,1,10,11,-2,2,20,21",
            "2021-04-07 11:00:05,105,-1,1,10,11,-2,2,20,21",
        ]);
        let (table, stats) = read_book_csv(data.as_bytes(), None).unwrap();

        assert_eq!(stats.rows_read, 6);
        assert_eq!(stats.rows_dropped, 4);
        assert_eq!(stats.rows_kept, 2);
        assert_eq!(table.midpoint(), &[100.0, 105.0]);
    }

    #[test]
    fn test_missing_required_columns() {
        let data = "midpoint,bids_distance_0\n100,-1";
        let err = read_book_csv(data.as_bytes(), None).unwrap_err();
        assert!(err.is_data_format());
        assert!(err.to_string().contains("system_time"));

        let data = "system_time,bids_distance_0\n2021-04-07,-1";
        let err = read_book_csv(data.as_bytes(), None).unwrap_err();
        assert!(err.is_data_format());
        assert!(err.to_string().contains("midpoint"));
    }

    #[test]
    fn test_requested_levels_must_exist() {
        let data = csv_of(&["2021-04-07 11:00:00,100,-1,1,10,11,-2,2,20,21"]);

        let (table, _) = read_book_csv(data.as_bytes(), Some(1)).unwrap();
        assert_eq!(table.levels(), 1);

        let err = read_book_csv(data.as_bytes(), Some(3)).unwrap_err();
        assert!(err.is_data_format());
        assert!(err.to_string().contains("bids_distance_2"));
    }

    #[test]
    fn test_unparseable_values() {
        let data = csv_of(&["not-a-time,100,-1,1,10,11,-2,2,20,21"]);
        let err = read_book_csv(data.as_bytes(), None).unwrap_err();
        assert!(err.is_data_format());

        let data = csv_of(&["2021-04-07 11:00:00,abc,-1,1,10,11,-2,2,20,21"]);
        let err = read_book_csv(data.as_bytes(), None).unwrap_err();
        assert!(err.is_data_format());
        assert!(err.to_string().contains("midpoint"));
    }

    #[test]
    fn test_missing_file() {
        let err = BookLoader::new("definitely/not/here.csv").load().unwrap_err();
        assert!(matches!(err, OfiError::Io(_)));
    }
}
