//! Book data-quality checks.
//!
//! Every check records an outcome in a [`ValidationResult`]; the pipeline
//! logs the result and carries on, since the OFI formula itself does not
//! depend on sign conventions.
//!
//! | Check | Failure kind |
//! |-------|--------------|
//! | midpoint finite and positive | error |
//! | bid distance ≤ 0, ask distance ≥ 0 | warning |
//! | notional ≥ 0 | warning |
//! | timestamps non-decreasing | error |
//! | repeated timestamps, gaps over `max_gap_seconds` | warning |
//! | derived column NaN/Inf | error |
//!
//! # Usage
//!
//! ```ignore
//! use ofi_analysis::validation::BookValidator;
//!
//! let result = BookValidator::default().validate_book(&table);
//! for warning in result.warnings() {
//!     println!("Warning: {}", warning);
//! }
//! ```

use crate::book::{BookTable, Side};
use chrono::{DateTime, Utc};
use std::fmt;

/// Outcome of one named check.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Valid,
    /// Suspicious but usable data
    Warning(String),
    /// Data the OFI numbers should not be trusted on
    Error(String),
}

impl ValidationLevel {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationLevel::Valid)
    }

    fn message(&self) -> Option<&str> {
        match self {
            ValidationLevel::Valid => None,
            ValidationLevel::Warning(msg) | ValidationLevel::Error(msg) => Some(msg),
        }
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationLevel::Valid => f.write_str("ok"),
            ValidationLevel::Warning(msg) => write!(f, "warning ({msg})"),
            ValidationLevel::Error(msg) => write!(f, "error ({msg})"),
        }
    }
}

/// Named check outcomes collected over a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    checks: Vec<(String, ValidationLevel)>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of `check`.
    pub fn add(&mut self, check: &str, level: ValidationLevel) {
        self.checks.push((check.to_string(), level));
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.checks.extend(other.checks);
    }

    /// True when every recorded check passed.
    pub fn is_valid(&self) -> bool {
        self.checks.iter().all(|(_, level)| level.is_valid())
    }

    pub fn has_errors(&self) -> bool {
        self.checks
            .iter()
            .any(|(_, level)| matches!(level, ValidationLevel::Error(_)))
    }

    pub fn has_warnings(&self) -> bool {
        self.checks
            .iter()
            .any(|(_, level)| matches!(level, ValidationLevel::Warning(_)))
    }

    /// Warning messages prefixed with their check name.
    pub fn warnings(&self) -> Vec<String> {
        self.checks
            .iter()
            .filter(|(_, level)| matches!(level, ValidationLevel::Warning(_)))
            .filter_map(|(check, level)| level.message().map(|msg| format!("{check}: {msg}")))
            .collect()
    }

    fn passed(&self) -> usize {
        self.checks.iter().filter(|(_, level)| level.is_valid()).count()
    }

    /// Log failed checks at warn/error level and a one-line summary at info.
    pub fn log(&self) {
        for (check, level) in &self.checks {
            match level {
                ValidationLevel::Valid => {}
                ValidationLevel::Warning(msg) => tracing::warn!(check = %check, "{msg}"),
                ValidationLevel::Error(msg) => tracing::error!(check = %check, "{msg}"),
            }
        }
        tracing::info!(
            passed = self.passed(),
            checks = self.checks.len(),
            "book validation done"
        );
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}/{} book checks passed",
            self.passed(),
            self.checks.len()
        )?;
        for (check, level) in self.checks.iter().filter(|(_, l)| !l.is_valid()) {
            writeln!(f, "  {check}: {level}")?;
        }
        Ok(())
    }
}

/// Configuration for book validation.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Gap between consecutive timestamps above which a warning is raised
    pub max_gap_seconds: f64,

    /// Check bid distances ≤ 0 and ask distances ≥ 0
    pub check_sign_conventions: bool,

    /// Check notionals ≥ 0
    pub check_sizes: bool,

    /// Check for NaN/Inf values
    pub check_nan_inf: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_gap_seconds: 300.0,
            check_sign_conventions: true,
            check_sizes: true,
            check_nan_inf: true,
        }
    }
}

/// Validator for book snapshot tables.
#[derive(Debug, Clone, Default)]
pub struct BookValidator {
    config: ValidationConfig,
}

impl BookValidator {
    /// Create a new validator with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator with custom configuration.
    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate every raw column of a table.
    pub fn validate_book(&self, table: &BookTable) -> ValidationResult {
        let mut result = ValidationResult::new();

        if table.is_empty() {
            result.add(
                "rows",
                ValidationLevel::Warning("Table has no rows".to_string()),
            );
            return result;
        }

        self.validate_midpoint(table, &mut result);

        if self.config.check_sign_conventions {
            self.validate_sign_conventions(table, &mut result);
        }

        if self.config.check_sizes {
            self.validate_sizes(table, &mut result);
        }

        result.merge(validate_timestamps(
            table.timestamps(),
            self.config.max_gap_seconds,
        ));

        result
    }

    /// Validate a derived column (e.g. `OFI_aggregated`).
    pub fn validate_values(&self, name: &str, values: &[f64]) -> ValidationResult {
        let mut result = ValidationResult::new();

        if self.config.check_nan_inf {
            let nan = values.iter().filter(|v| v.is_nan()).count();
            let inf = values.iter().filter(|v| v.is_infinite()).count();
            if nan + inf > 0 {
                result.add(
                    name,
                    ValidationLevel::Error(format!("{nan} NaN and {inf} infinite values")),
                );
            } else {
                result.add(name, ValidationLevel::Valid);
            }
        }

        result
    }

    fn validate_midpoint(&self, table: &BookTable, result: &mut ValidationResult) {
        let mid = table.midpoint();

        let non_finite = mid.iter().filter(|m| !m.is_finite()).count();
        if self.config.check_nan_inf && non_finite > 0 {
            result.add(
                "midpoint_finite",
                ValidationLevel::Error(format!("{non_finite} non-finite midpoints")),
            );
        }

        match mid.iter().position(|&m| m <= 0.0) {
            Some(row) => result.add(
                "midpoint_positive",
                ValidationLevel::Error(format!(
                    "Non-positive midpoint {} at row {} (returns will be non-finite)",
                    mid[row], row
                )),
            ),
            None => result.add("midpoint_positive", ValidationLevel::Valid),
        }
    }

    fn validate_sign_conventions(&self, table: &BookTable, result: &mut ValidationResult) {
        for side in Side::ALL {
            let mut violations = 0usize;
            let mut first: Option<(usize, usize)> = None;

            for level in 0..table.levels() {
                let Some(distance) = table.distance(level, side) else {
                    continue;
                };
                for (row, &d) in distance.iter().enumerate() {
                    let wrong = match side {
                        Side::Bid => d > 0.0,
                        Side::Ask => d < 0.0,
                    };
                    if wrong {
                        violations += 1;
                        first.get_or_insert((level, row));
                    }
                }
            }

            let check = format!("{side}_distance_sign");
            match first {
                Some((level, row)) => result.add(
                    &check,
                    ValidationLevel::Warning(format!(
                        "{violations} {side} distances with unexpected sign (first at level {level}, row {row})"
                    )),
                ),
                None => result.add(&check, ValidationLevel::Valid),
            }
        }
    }

    fn validate_sizes(&self, table: &BookTable, result: &mut ValidationResult) {
        let mut negative = 0usize;
        for side in Side::ALL {
            for level in 0..table.levels() {
                if let Some(notional) = table.notional(level, side) {
                    negative += notional.iter().filter(|&&v| v < 0.0).count();
                }
            }
        }

        if negative > 0 {
            result.add(
                "notional_non_negative",
                ValidationLevel::Warning(format!("{negative} negative notionals")),
            );
        } else {
            result.add("notional_non_negative", ValidationLevel::Valid);
        }
    }
}

/// Validate a sequence of timestamps for monotonicity and gaps.
pub fn validate_timestamps(timestamps: &[DateTime<Utc>], max_gap_seconds: f64) -> ValidationResult {
    let mut result = ValidationResult::new();

    if timestamps.is_empty() {
        result.add(
            "timestamps",
            ValidationLevel::Warning("No timestamps to validate".to_string()),
        );
        return result;
    }

    let mut monotonic = true;
    let mut max_gap_ms = 0i64;
    let mut duplicates = 0usize;

    for (i, pair) in timestamps.windows(2).enumerate() {
        let gap_ms = (pair[1] - pair[0]).num_milliseconds();
        if gap_ms < 0 {
            monotonic = false;
            result.add(
                "timestamp_ordering",
                ValidationLevel::Error(format!(
                    "Non-monotonic timestamp at index {}: {} < {}",
                    i + 1,
                    pair[1],
                    pair[0]
                )),
            );
            break;
        }
        if gap_ms == 0 {
            duplicates += 1;
        }
        max_gap_ms = max_gap_ms.max(gap_ms);
    }

    if monotonic {
        result.add("timestamp_ordering", ValidationLevel::Valid);
    }

    if duplicates > 0 {
        result.add(
            "timestamp_duplicates",
            ValidationLevel::Warning(format!("{duplicates} repeated timestamps")),
        );
    }

    let max_gap_s = max_gap_ms as f64 / 1e3;
    if max_gap_s > max_gap_seconds {
        result.add(
            "timestamp_gaps",
            ValidationLevel::Warning(format!("Max timestamp gap: {max_gap_s:.2} seconds")),
        );
    } else {
        result.add("timestamp_gaps", ValidationLevel::Valid);
    }

    result
}
