//! Error types for cmtpack-core

use thiserror::Error;

/// Result type alias for cmtpack-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cmtpack-core
///
/// Recoverable input anomalies (unknown tables, incomplete party-list tables,
/// missing relationship sources) are not errors; they are collected as
/// [`crate::diagnostics::Warning`]s instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// Schema file is not well-formed XML
    #[error("failed to parse schema: {0}")]
    SchemaParse(#[from] roxmltree::Error),

    /// Schema is well-formed but missing required declarations
    #[error("invalid schema: {message}")]
    InvalidSchema {
        /// Description of what's invalid
        message: String,
    },

    /// A table file could not be read into rows
    #[error("failed to load table '{table}': {message}")]
    TableLoad {
        /// Table name (file stem)
        table: String,
        /// Description of the error
        message: String,
    },

    /// An entity row has no value for its primary-key column
    #[error("row {row} of entity '{entity}' has no value for primary key '{primary_key}'")]
    MissingPrimaryKey {
        /// Entity name
        entity: String,
        /// Primary-key column name
        primary_key: String,
        /// Zero-based row index within the table
        row: usize,
    },

    /// XML serialization error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Archive error
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Excel workbook error
    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::XlsxError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
