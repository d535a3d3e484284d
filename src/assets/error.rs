//! Asset serving error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Asset serving error type
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Asset not found")]
    NotFound,

    #[error("Path escapes mount root: {path}")]
    Forbidden { path: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl AssetError {
    /// Map an IO error on `path`: missing files are 404s, anything else is a read failure.
    pub fn from_io(path: &std::path::Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory => AssetError::NotFound,
            _ => AssetError::Io {
                path: path.display().to_string(),
                source,
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AssetError::NotFound => StatusCode::NOT_FOUND,
            AssetError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AssetError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error should result in a 403 Forbidden response
    pub fn is_forbidden(&self) -> bool {
        matches!(self, AssetError::Forbidden { .. })
    }

    /// Check if this error should result in a 404 Not Found response
    pub fn is_not_found(&self) -> bool {
        matches!(self, AssetError::NotFound)
    }
}

impl IntoResponse for AssetError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = status.canonical_reason().unwrap_or("Error");
        (status, body).into_response()
    }
}
