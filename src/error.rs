//! Error types for the OFI analysis pipeline.
//!
//! Every fallible operation in the crate returns [`Result`], whose error type
//! is [`OfiError`]. Errors propagate unchanged to the caller; the only
//! condition the pipeline recovers from is an incomplete input row, which the
//! loader drops instead of failing.

use thiserror::Error;

/// Errors raised by the loader, the OFI engine and the analysis stages.
#[derive(Error, Debug)]
pub enum OfiError {
    /// Input table is malformed: a required column is absent or a value
    /// cannot be parsed.
    #[error("data format error: {0}")]
    DataFormat(String),

    /// A caller-supplied parameter is out of range or unsupported
    /// (aggregation method, horizon, level count, sequence lengths).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Failure reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure in the CSV reader.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration could not be serialized or deserialized.
    #[error("config error: {0}")]
    Config(String),
}

impl OfiError {
    /// Create a [`OfiError::DataFormat`] error.
    pub fn data_format(msg: impl Into<String>) -> Self {
        Self::DataFormat(msg.into())
    }

    /// Create a [`OfiError::InvalidParameter`] error.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Whether this error reports malformed input data.
    pub fn is_data_format(&self) -> bool {
        matches!(self, Self::DataFormat(_))
    }

    /// Whether this error reports an unsupported parameter.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameter(_))
    }
}

impl From<toml::de::Error> for OfiError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for OfiError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for OfiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, OfiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert!(OfiError::data_format("missing midpoint").is_data_format());
        assert!(OfiError::invalid_parameter("horizon").is_invalid_parameter());
        assert!(!OfiError::invalid_parameter("horizon").is_data_format());
    }

    #[test]
    fn test_error_display() {
        let err = OfiError::invalid_parameter("unknown aggregation method 'median'");
        assert_eq!(
            err.to_string(),
            "invalid parameter: unknown aggregation method 'median'"
        );
    }

    #[test]
    fn test_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: OfiError = io.into();
        assert!(matches!(err, OfiError::Io(_)));
    }
}
