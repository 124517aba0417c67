use std::io;
use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use encore_core::ScrapeError;

use crate::config::LoadError;

/// Error returned by a request handler.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("A scrape is already queued or running for {0} or an overlapping directory")]
    ScrapeAlreadyQueued(PathBuf),

    #[error("No scrape found for {0}")]
    ScrapeNotFound(PathBuf),

    #[error("Directory {path} cannot be read: {source}")]
    DirNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Illegal path: {0}")]
    IllegalPath(String),

    #[error("No video with hash {0}")]
    VideoNotFound(String),

    #[error("{0}")]
    Unknown(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ScrapeAlreadyQueued(_) => "SCRAPE_ALREADY_QUEUED",
            AppError::ScrapeNotFound(_) => "SCRAPE_NOT_FOUND",
            AppError::DirNotFound { .. } => "DIR_NOT_FOUND",
            AppError::IllegalPath(_) => "ILLEGAL_PATH",
            AppError::VideoNotFound(_) => "VIDEO_NOT_FOUND",
            AppError::Unknown(_) => "UNKNOWN_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ScrapeAlreadyQueued(_) => StatusCode::CONFLICT,
            AppError::ScrapeNotFound(_)
            | AppError::DirNotFound { .. }
            | AppError::VideoNotFound(_) => StatusCode::NOT_FOUND,
            AppError::IllegalPath(_) => StatusCode::BAD_REQUEST,
            AppError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        let body = json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

impl From<ScrapeError> for AppError {
    fn from(err: ScrapeError) -> Self {
        match err {
            ScrapeError::AlreadyQueued { root } => AppError::ScrapeAlreadyQueued(root),
            ScrapeError::NotADirectory { path } => AppError::IllegalPath(path.display().to_string()),
            other => AppError::Unknown(other.to_string()),
        }
    }
}

/// Error that prevents the server from starting or shutting down cleanly.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] LoadError),

    #[error(transparent)]
    Engine(#[from] encore_scrape::ConfigError),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error("Server I/O error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrape_errors_map_to_codes() {
        let err: AppError = ScrapeError::AlreadyQueued {
            root: PathBuf::from("/media/B"),
        }
        .into();
        assert_eq!(err.code(), "SCRAPE_ALREADY_QUEUED");
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: AppError = ScrapeError::EngineClosed.into();
        assert_eq!(err.code(), "UNKNOWN_ERROR");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
