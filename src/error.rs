//! Error types for the gdrive_transfer crate.

use thiserror::Error;

/// Errors that can occur while talking to Google Drive or moving bytes.
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid client secret: {0}")]
    InvalidClientSecret(String),

    #[error("Invalid file URL or ID: {0}")]
    InvalidFileId(String),

    #[error("Resumable upload session returned no upload URL")]
    MissingUploadUrl,
}

/// Result type alias for DriveError.
pub type Result<T> = std::result::Result<T, DriveError>;
