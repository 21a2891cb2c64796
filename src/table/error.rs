use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Required column '{0}' not found in observation table")]
    ColumnNotFound(String, #[source] PolarsError),

    #[error("Column '{column}' has type {found}, expected {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
        found: String,
    },

    #[error("Column '{column}' has a missing value at row {row}")]
    NullValue { column: String, row: usize },

    #[error("Unknown weather group '{label}' at row {row}")]
    UnknownWeatherGroup { label: String, row: usize },

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}
