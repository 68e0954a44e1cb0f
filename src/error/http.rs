use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Request failed: {source}")]
    RequestFailed {
        #[source]
        source: reqwest::Error,
    },
    #[error("Server returned HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("Failed to parse response body as JSON: {source}")]
    ParseResponse {
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to open '{path}' for writing: {source}")]
    OpenDestination {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write downloaded bytes to '{path}': {source}")]
    WriteDestination {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Download stalled below the minimum transfer rate")]
    DownloadStalled,
    #[error("Failed to build HTTP client: {source}")]
    BuildClientFailed {
        #[source]
        source: reqwest::Error,
    },
    #[error("configured auth token is not a valid header value")]
    InvalidAuthHeader,
}
