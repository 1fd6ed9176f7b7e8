//! Error types for the dump library.

use thiserror::Error;

/// Main error type for dump operations.
#[derive(Error, Debug)]
pub enum DumpError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cannot establish or maintain the database connection
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// Foreign-key metadata query failed; nothing has been written yet
    #[error("Schema load failed: {0}")]
    SchemaLoad(String),

    /// The row source failed mid-stream; partial output is left as-is
    #[error("Row scan failed for table {table}: {message}")]
    RowScan { table: String, message: String },

    /// A row contained a scalar the encoder cannot render as a SQL literal.
    /// Fatal for the whole run: a partially malformed script is worse
    /// than no script.
    #[error("Unsupported value type {type_name} for value {value}")]
    UnsupportedValue { value: String, type_name: String },

    /// IO error (output sink, config file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error (summary output)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DumpError {
    /// Create a Connection error with context about where it occurred.
    pub fn connection(message: impl ToString, context: impl Into<String>) -> Self {
        DumpError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a RowScan error for a table.
    pub fn scan(table: impl Into<String>, message: impl ToString) -> Self {
        DumpError::RowScan {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            DumpError::Config(_) | DumpError::Yaml(_) => 1,
            DumpError::Connection { .. } => 2,
            DumpError::SchemaLoad(_) => 3,
            DumpError::RowScan { .. } => 4,
            DumpError::UnsupportedValue { .. } => 5,
            DumpError::Json(_) => 6,
            DumpError::Io(_) => 7,
        }
    }
}

/// Result type alias for dump operations.
pub type Result<T> = std::result::Result<T, DumpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_context() {
        let err = DumpError::connection("refused", "connecting to MySQL");
        let msg = err.to_string();
        assert!(msg.contains("refused"));
        assert!(msg.contains("connecting to MySQL"));
    }

    #[test]
    fn test_exit_codes_distinct_per_class() {
        assert_eq!(DumpError::Config("x".into()).exit_code(), 1);
        assert_eq!(
            DumpError::UnsupportedValue {
                value: "b'01'".into(),
                type_name: "BIT".into()
            }
            .exit_code(),
            5
        );
        assert_eq!(DumpError::scan("orders", "lost connection").exit_code(), 4);
    }
}
