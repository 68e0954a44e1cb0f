use thiserror::Error;

use super::{ConfigError, HttpError, ServiceError};

/// Top-level error returned by `main`/`run`, rolling up each module's own
/// error enum plus the handful of external errors (`clap`, process I/O) that
/// surface before any of those layers get a chance to wrap them.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("CLI error: {source}")]
    Clap {
        #[from]
        source: clap::Error,
    },
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}

pub type AppResult<T> = Result<T, AppError>;
