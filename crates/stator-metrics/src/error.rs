use thiserror::Error;

/// Errors raised by a collector. Each one drops only that collector's group.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to get disk usage for {path}: {source}")]
    DiskUsage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read process stats from {path}: {reason}")]
    Process { path: String, reason: String },

    #[error("{0}")]
    Other(String),
}
