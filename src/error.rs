//! Error types for the drive_mirror crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while mirroring Google Drive content.
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Invalid URL or ID: {0}")]
    InvalidReference(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Rate limited by the Drive API")]
    RateLimited,

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to read credentials file: {0}")]
    CredentialsFileError(#[from] std::io::Error),

    #[error("Failed to parse credentials JSON: {0}")]
    CredentialsParseError(#[from] serde_json::Error),

    #[error("JWT encoding error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Token refresh failed: {0}")]
    TokenRefreshError(String),
}

impl DriveError {
    /// Whether this error is a rate-limit signal worth retrying.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, DriveError::RateLimited)
    }
}

/// Result type alias for DriveError.
pub type Result<T> = std::result::Result<T, DriveError>;
