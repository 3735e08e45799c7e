//! Error handling for relsync.
//!
//! This module provides:
//! - [`ReleaseError`]: The main error enum for all operations
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Error payload for JSON output

mod codes;

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;

/// Main error type for release operations.
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// The provider has no release for the requested tag.
    #[error("Release not found: {0}")]
    NotFound(String),

    /// The provider answered with a status the caller did not expect.
    #[error("Provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to upload release asset {name}. received status code {status}\n{message}")]
    Upload {
        name: String,
        status: u16,
        message: String,
    },

    #[error("Too many retries: release creation failed {attempts} times")]
    AbortedAfterRetries { attempts: u32 },

    #[error("Releases require a tag (ref {git_ref} is not a tag ref)")]
    MissingTag { git_ref: String },

    #[error("{failed} of {total} asset uploads failed")]
    AssetsFailed { failed: usize, total: usize },

    #[error("There were unmatched files: {}", .0.join(", "))]
    UnmatchedFiles(Vec<String>),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),
}

impl ReleaseError {
    /// Build an [`ReleaseError::Api`] from a status code and provider message.
    pub fn api(status: reqwest::StatusCode, message: impl Into<String>) -> Self {
        Self::Api {
            status: status.as_u16(),
            message: message.into(),
        }
    }

    /// Whether this error means "the release does not exist".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Get the error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::ReleaseNotFound,
            Self::Api { status: 401, .. } => ErrorCode::NetworkAuthFailed,
            Self::Api { .. } => ErrorCode::ProviderError,
            Self::Upload { .. } => ErrorCode::AssetUploadFailed,
            Self::AbortedAfterRetries { .. } => ErrorCode::ReleaseRetriesExhausted,
            Self::MissingTag { .. } => ErrorCode::ReleaseTagMissing,
            Self::AssetsFailed { .. } => ErrorCode::AssetSyncIncomplete,
            Self::UnmatchedFiles(_) => ErrorCode::AssetPatternUnmatched,
            Self::UnsupportedPlatform(_) => ErrorCode::ConfigUnsupportedPlatform,
            Self::Http(_) => ErrorCode::NetworkUnreachable,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::SerializationError,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::MissingConfig(_) => ErrorCode::ConfigMissingRequired,
        }
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::Api { status, message } => {
                Some(serde_json::json!({ "status": status, "message": message }))
            }
            Self::Upload {
                name,
                status,
                message,
            } => Some(serde_json::json!({ "asset": name, "status": status, "message": message })),
            Self::AbortedAfterRetries { attempts } => {
                Some(serde_json::json!({ "attempts": attempts }))
            }
            Self::AssetsFailed { failed, total } => {
                Some(serde_json::json!({ "failed": failed, "total": total }))
            }
            Self::UnmatchedFiles(patterns) => Some(serde_json::json!({ "patterns": patterns })),
            Self::MissingConfig(key) => Some(serde_json::json!({ "config_key": key })),
            _ => None,
        }
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_release_error(self)
    }
}

/// A structured error with machine-readable code, suggestion, and context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// The error code (e.g., "RELEASE_NOT_FOUND")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 101)
    pub numeric_code: u16,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for recovery
    pub suggestion: String,

    /// Additional context for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Whether this error is potentially recoverable by the user
    pub recoverable: bool,

    /// Error category (e.g., "release", "asset", "config")
    pub category: String,
}

impl StructuredError {
    /// Create a new structured error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            numeric_code: code.numeric(),
            suggestion: code.suggestion().to_string(),
            context: None,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
            code,
            message: message.into(),
        }
    }

    /// Create a structured error from a [`ReleaseError`].
    #[must_use]
    pub fn from_release_error(err: &ReleaseError) -> Self {
        Self {
            context: err.context(),
            ..Self::new(err.code(), err.to_string())
        }
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&ReleaseError> for StructuredError {
    fn from(err: &ReleaseError) -> Self {
        Self::from_release_error(err)
    }
}

/// Result type alias using [`ReleaseError`].
pub type Result<T> = std::result::Result<T, ReleaseError>;
