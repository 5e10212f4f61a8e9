use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FindError {
    // Traversal
    #[error("could not access directory {path}")]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("path is {len} bytes, longer than the {max} byte limit: {path}")]
    PathTooLong { path: PathBuf, len: usize, max: usize },

    // Runtime
    #[error("slot pool lock poisoned")]
    LockFailure,

    #[error("could not spawn worker for slot #{slot}")]
    WorkerSpawn {
        slot: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("worker in slot #{slot} panicked")]
    WorkerPanicked { slot: usize },

    // Config
    #[error("thread capacity {requested} exceeds the maximum of {max}")]
    CapacityExceeded { requested: usize, max: usize },

    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("unknown log level: {0}")]
    InvalidLogLevel(String),
}

impl FindError {
    /// The path this error occurred at, if applicable.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::DirectoryUnavailable { path, .. }
            | Self::NotADirectory(path)
            | Self::PathTooLong { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Whether the traversal can continue after this error.
    ///
    /// Recoverable errors are localized to one directory, entry or worker and
    /// are collected into [`Results::errors`](crate::Results::errors) while the
    /// walk keeps going.
    ///
    /// Fatal errors (poisoned lock, spawn failure, bad configuration) stop the
    /// whole run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DirectoryUnavailable { .. }
                | Self::NotADirectory(_)
                | Self::PathTooLong { .. }
                | Self::WorkerPanicked { .. }
        )
    }
}

impl<T> From<std::sync::PoisonError<T>> for FindError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::LockFailure
    }
}
