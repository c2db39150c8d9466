use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChargepolError>;

#[derive(Debug, Error)]
pub enum ChargepolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid CSV header: {0}")]
    CsvHeader(String),

    #[error("Invalid record at line {line}: expected {expected} fields, got {got}")]
    FieldCount {
        line: usize,
        expected: usize,
        got: usize,
    },

    #[error("Unknown charge type at line {line}: {value:?}")]
    ChargeType { line: usize, value: String },

    #[error("Invalid {field} at line {line}: {value:?}")]
    Number {
        line: usize,
        field: &'static str,
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    #[error("GeoJSON error in {path}: {message}")]
    GeoJson { path: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}
