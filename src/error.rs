use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Cannot load {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("Unknown month name {label:?} in row {row}")]
    UnknownMonth { row: usize, label: String },

    #[error("Baseline for series {series:?} at {period} sums to zero")]
    ZeroBaseline { series: String, period: String },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Non-numeric value {value:?} in column {column} (row {row})")]
    NonNumeric {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
