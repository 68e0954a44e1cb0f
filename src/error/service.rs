use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Cannot combine --install-service and --uninstall-service.")]
    ConflictingServiceAction,
    #[error("Service name cannot be empty.")]
    EmptyServiceName,
    #[error("Failed to resolve working directory: {source}")]
    WorkingDirectory {
        #[source]
        source: std::io::Error,
    },
    #[error("Working directory is not valid UTF-8.")]
    WorkingDirectoryNotUtf8,
    #[error("Failed to resolve executable path: {source}")]
    ExecutablePath {
        #[source]
        source: std::io::Error,
    },
    #[error("Executable path is not valid UTF-8.")]
    ExecutablePathNotUtf8,
    #[error("Failed to write unit file '{path}': {source}")]
    WriteUnit {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to remove unit file '{path}': {source}")]
    RemoveUnit {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to run systemctl {args:?}: {source}")]
    RunSystemctl {
        args: Vec<String>,
        #[source]
        source: std::io::Error,
    },
    #[error("systemctl {args:?} failed with status {status}")]
    SystemctlFailed { args: Vec<String>, status: String },
    #[cfg(not(target_os = "linux"))]
    #[error("Service install/uninstall is only supported on Linux.")]
    UnsupportedPlatform,
}
