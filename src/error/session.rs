use thiserror::Error;

use super::HttpError;

/// Errors internal to deployment intake and the download worker.
///
/// None of these cross a task boundary as a propagated `Result` failure in
/// normal operation; each is converted to feedback and a log line at the
/// point it occurs (see the session module). The enum exists so that
/// callers which *do* want to propagate (tests, `base_poll`'s top-level
/// `Result`) have a concrete type to match on.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("base poll request failed: {source}")]
    BasePollFailed {
        #[source]
        source: HttpError,
    },
    #[error("base poll response was missing or had an invalid 'config.polling.sleep'")]
    InvalidPollingSleep { raw: String },
    #[error("a deployment is already in progress")]
    AlreadyInProgress,
    #[error("failed to fetch deployment resource: {source}")]
    DeploymentFetchFailed {
        #[source]
        source: HttpError,
    },
    #[error("deployment resource was missing required field '{field}'")]
    MalformedDeployment { field: &'static str },
    #[error("not enough free space at '{path}': need {needed} bytes, have {available} bytes")]
    InsufficientSpace {
        path: String,
        needed: u64,
        available: u64,
    },
    #[error("checksum mismatch: expected {expected}, computed {computed}")]
    ChecksumMismatch { expected: String, computed: String },
    #[error("artifact download failed: {source}")]
    DownloadFailed {
        #[source]
        source: HttpError,
    },
    #[error("installer reported failure")]
    InstallFailed,
    #[error("free space probe failed: {source}")]
    StatvfsFailed {
        #[source]
        source: nix::Error,
    },
}
