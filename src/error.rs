use std::io;

use thiserror::Error;

/// Everything that can go wrong between loading records and writing grids.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("no records available to compute extents")]
    EmptyInput,
    #[error("grid size must be positive, got {0}")]
    InvalidGridSize(i64),
    #[error("grid for date '{date}' failed: {reason}")]
    TaskFailure { date: String, reason: String },
    #[error("grid run was cancelled")]
    Cancelled,
    #[error("input is missing required column '{0}'")]
    MissingColumn(String),
    #[error("unknown axis '{0}' (expected Latitude or Longitude)")]
    InvalidAxis(String),
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("bad input pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, GridError>;
