//! Typed failures for each pipeline stage.
//!
//! Every stage returns [`EtlError`]; the command handlers log the error together
//! with [`EtlError::stage`] and halt the run. Per-field coercion failures are not
//! errors at all (see [`crate::clean`]).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    /// Fetching a raw table failed (credentials, not found, malformed file).
    #[error("An error occurred while loading the {table} data: {reason}")]
    SourceLoad { table: String, reason: String },

    /// Required-column or pipeline settings reference something that does not exist.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Data quality gate tripped.
    #[error(
        "Proportion of missing data in {table} exceeds threshold({threshold}): {ratio}"
    )]
    ThresholdExceeded {
        table: String,
        ratio: f64,
        threshold: f64,
    },

    /// Unexpected failure while coercing columns.
    #[error("An error occurred while cleaning the {table} data: {reason}")]
    Cleaning { table: String, reason: String },

    /// A post-clean invariant does not hold.
    #[error("Validation of {table} failed: {rule}")]
    Validation { table: String, rule: String },

    #[error("An error occurred while exporting the {table} data to {path:?}: {reason}")]
    Export {
        table: String,
        path: PathBuf,
        reason: String,
    },

    #[error("An error occurred while loading the {table} data into the store: {reason}")]
    Load { table: String, reason: String },
}

impl EtlError {
    /// Pipeline stage that produced the error, used in the top-level log line.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::SourceLoad { .. } => "extract",
            Self::Configuration(_) => "configuration",
            Self::ThresholdExceeded { .. } => "threshold",
            Self::Cleaning { .. } => "clean",
            Self::Validation { .. } => "validate",
            Self::Export { .. } => "export",
            Self::Load { .. } => "load",
        }
    }

    /// Table the error refers to, when it concerns a single table.
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::SourceLoad { table, .. }
            | Self::ThresholdExceeded { table, .. }
            | Self::Cleaning { table, .. }
            | Self::Validation { table, .. }
            | Self::Export { table, .. }
            | Self::Load { table, .. } => Some(table),
            Self::Configuration(_) => None,
        }
    }
}

/// Failures raised by a relational store collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unsupported store connection string '{0}'")]
    UnsupportedUrl(String),

    #[error("No column mapping is registered for table '{0}'")]
    UnmappedTable(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_message_names_table_and_ratio() {
        let err = EtlError::ThresholdExceeded {
            table: "spending".into(),
            ratio: 0.1,
            threshold: 0.05,
        };
        let message = err.to_string();
        assert!(message.contains("spending"));
        assert!(message.contains("0.05"));
        assert!(message.contains("0.1"));
        assert_eq!(err.stage(), "threshold");
        assert_eq!(err.table(), Some("spending"));
    }

    #[test]
    fn configuration_errors_have_no_table() {
        let err = EtlError::Configuration("unknown table 'hotels'".into());
        assert_eq!(err.table(), None);
        assert_eq!(err.stage(), "configuration");
    }
}
