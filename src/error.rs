//! Error types for play-upload.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Main error type for upload operations.
#[derive(Error, Debug)]
pub enum UploadError {
    // Cli args errors
    #[error("Invalid arguments: {0}")]
    Configuration(String),

    #[error("Invalid API url: {0}")]
    Url(#[from] url::ParseError),

    // Credential errors
    #[error("Failed to load credentials from {path}: {reason}")]
    Credential { path: PathBuf, reason: String },

    // Package errors
    #[error("Failed to read apk {path}: {reason}")]
    PackageParse { path: PathBuf, reason: String },

    #[error("Failed to read release notes from {path}: {source}")]
    NotesRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // Publisher errors
    #[error("{0}")]
    Remote(String),

    #[error("Invalid release: {0}")]
    InvalidRelease(String),

    #[error("Operation failed: {cause}\nEdit {edit_id} discarded")]
    EditDiscarded {
        edit_id: String,
        cause: Box<UploadError>,
    },

    #[error(
        "Operation failed: {cause}\nFailed to delete edit {edit_id}: {delete_error}\nThe edit may still be open and require manual cleanup"
    )]
    AbortFailed {
        edit_id: String,
        cause: Box<UploadError>,
        delete_error: Box<UploadError>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Logger initialization error: {0}")]
    Logger(#[from] log::SetLoggerError),
}

/// Result type alias using UploadError
pub type Result<T> = std::result::Result<T, UploadError>;

impl UploadError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a credential error for the key file at `path`
    pub fn credential(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Credential {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a package parse error for the apk at `path`
    pub fn package_parse(
        path: impl Into<PathBuf>,
        reason: impl ToString,
    ) -> Self {
        Self::PackageParse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a remote operation error
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// The error that triggered an edit abort, if this is an abort error.
    #[cfg(test)]
    pub fn abort_cause(&self) -> Option<&UploadError> {
        match self {
            Self::EditDiscarded { cause, .. } => Some(cause),
            Self::AbortFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

// Network/API errors from the http client
impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::Remote(format!("Network request failed: {err}"))
        } else if let Some(status) = err.status() {
            Self::Remote(format!("Request failed with status {status}: {err}"))
        } else {
            Self::Remote(err.to_string())
        }
    }
}

impl From<reqwest::header::InvalidHeaderValue> for UploadError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        Self::Configuration(format!("Invalid header value: {err}"))
    }
}

impl From<crate::publisher::TrackReleaseBuilderError> for UploadError {
    fn from(err: crate::publisher::TrackReleaseBuilderError) -> Self {
        Self::InvalidRelease(err.to_string())
    }
}
