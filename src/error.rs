use crate::config::ConfigError;
use crate::filter_state::FilterStateError;
use crate::table::error::TableError;
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AirshedError {
    #[error(transparent)]
    FilterState(#[from] FilterStateError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Polars query failed: {0}")]
    Polars(#[from] PolarsError),
}
