//! Error types for the songlake ETL job
//!
//! All public APIs return `Result<T, Error>` where Error is defined here.
//! The job has no retry or recovery logic: every error aborts the run.

use thiserror::Error;

/// The main error type for the ETL job
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config key '{key}' in section [{section}]")]
    MissingConfigKey { section: String, key: String },

    // ============================================================================
    // Input / Schema Errors
    // ============================================================================
    #[error("No input files found under '{prefix}'")]
    EmptyInput { prefix: String },

    #[error("Missing required field '{field}' in {record} record")]
    MissingField { field: String, record: String },

    #[error("Field '{field}' has the wrong type, expected {expected}")]
    FieldType { field: String, expected: String },

    #[error("Expected a JSON object for {record} record")]
    RecordType { record: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Arrow/Parquet Errors
    // ============================================================================
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Output error: {message}")]
    Output { message: String },

    // ============================================================================
    // Storage Errors
    // ============================================================================
    #[error("Storage error: {0}")]
    Storage(#[from] object_store::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing config key error
    pub fn missing_key(section: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingConfigKey {
            section: section.into(),
            key: key.into(),
        }
    }

    /// Create a missing record field error
    pub fn missing_field(field: impl Into<String>, record: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
            record: record.into(),
        }
    }

    /// Create a field type error
    pub fn field_type(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::FieldType {
            field: field.into(),
            expected: expected.into(),
        }
    }

    /// Create a record type error
    pub fn record_type(record: impl Into<String>) -> Self {
        Self::RecordType {
            record: record.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }
}

/// Result type alias for the ETL job
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("bad credentials file");
        assert_eq!(err.to_string(), "Configuration error: bad credentials file");

        let err = Error::missing_key("aws_keys", "access_key_id");
        assert_eq!(
            err.to_string(),
            "Missing required config key 'access_key_id' in section [aws_keys]"
        );

        let err = Error::missing_field("song_id", "song-metadata");
        assert_eq!(
            err.to_string(),
            "Missing required field 'song_id' in song-metadata record"
        );

        let err = Error::field_type("ts", "integer");
        assert_eq!(
            err.to_string(),
            "Field 'ts' has the wrong type, expected integer"
        );

        let err = Error::record_type("activity-log");
        assert_eq!(
            err.to_string(),
            "Expected a JSON object for activity-log record"
        );
    }

    #[test]
    fn test_empty_input_display() {
        let err = Error::EmptyInput {
            prefix: "song_data/A/A/A".to_string(),
        };
        assert!(err.to_string().contains("song_data/A/A/A"));
    }
}
