//! Domain error types.

/// Top-level error type for ta-scanner.
#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    /// A required indicator or filter option is absent. Raised before any row
    /// is processed.
    #[error("{component} requires key = {key}")]
    Configuration { component: String, key: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("{name} has 0 rows")]
    EmptyInput { name: String },

    #[error("column {field} not found on bar series")]
    MissingColumn { field: String },

    /// The column exists but holds the other kind of data.
    #[error("column {field} is not a {expected} column")]
    ColumnType {
        field: String,
        expected: &'static str,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScannerError {
    pub fn configuration(component: &str, key: impl ToString) -> Self {
        ScannerError::Configuration {
            component: component.to_string(),
            key: key.to_string(),
        }
    }

    pub fn missing_column(field: &str) -> Self {
        ScannerError::MissingColumn {
            field: field.to_string(),
        }
    }
}

impl From<&ScannerError> for std::process::ExitCode {
    fn from(err: &ScannerError) -> Self {
        let code: u8 = match err {
            ScannerError::Io(_) | ScannerError::Csv(_) => 1,
            ScannerError::ConfigParse { .. }
            | ScannerError::ConfigMissing { .. }
            | ScannerError::ConfigInvalid { .. } => 2,
            ScannerError::Database { .. }
            | ScannerError::DatabaseQuery { .. }
            | ScannerError::DataSource { .. } => 3,
            ScannerError::Configuration { .. }
            | ScannerError::MissingColumn { .. }
            | ScannerError::ColumnType { .. } => 4,
            ScannerError::EmptyInput { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
