//! Error types for scraping operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that end or reject a whole scrape.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A scrape for the same, a parent or a child directory is still queued or running.
    #[error("A scrape is already queued for {root} or an overlapping directory")]
    AlreadyQueued { root: PathBuf },

    /// The root directory is missing or cannot be read.
    #[error("Directory {path} does not exist or cannot be accessed: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// The scrape controller is no longer running.
    #[error("Scrape engine is shut down")]
    EngineClosed,

    /// The blocking walker task panicked.
    #[error("Scrape worker panicked: {message}")]
    WorkerPanicked { message: String },
}

impl ScrapeError {
    /// Create a root read error with path context.
    pub fn root(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::RootUnreadable {
            path: path.into(),
            source,
        }
    }

    /// Whether this is the overlap rejection.
    pub fn is_already_queued(&self) -> bool {
        matches!(self, Self::AlreadyQueued { .. })
    }
}

/// Errors raised by a single extraction function for a single file.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Reading the file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external probe tool could not be run or exited unsuccessfully.
    #[error("Probe failed for {path}: {message}")]
    Probe { path: PathBuf, message: String },

    /// The probe tool produced output that is not a valid report.
    #[error("Unreadable probe report for {path}: {source}")]
    ProbeReport {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl ExtractError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors reported by a catalog store.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No record with this hash exists.
    #[error("No catalog entry for hash {hash}")]
    NotFound { hash: String },

    /// A record with this hash exists already.
    #[error("Catalog entry for hash {hash} already exists")]
    AlreadyExists { hash: String },

    /// Backend failure.
    #[error("Catalog backend error: {message}")]
    Backend { message: String },
}
