//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Release errors
//! - 2xx: Asset errors
//! - 3xx: Config errors
//! - 5xx: Network / provider errors
//! - 6xx: Storage errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for JSON output.
///
/// Each variant maps to a numeric code (e.g., `ReleaseNotFound` -> E101).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Release errors (1xx)
    // ========================================
    /// E101: No release exists for the requested tag
    ReleaseNotFound,
    /// E102: Creating the release kept failing until the attempt budget ran out
    ReleaseRetriesExhausted,
    /// E103: A release needs a tag and none could be resolved
    ReleaseTagMissing,

    // ========================================
    // Asset errors (2xx)
    // ========================================
    /// E201: The provider rejected an asset upload
    AssetUploadFailed,
    /// E202: One or more assets failed during sync
    AssetSyncIncomplete,
    /// E203: A file pattern matched nothing
    AssetPatternUnmatched,

    // ========================================
    // Config errors (3xx)
    // ========================================
    /// E302: Config file or value is invalid
    ConfigInvalid,
    /// E304: Required config value is missing
    ConfigMissingRequired,
    /// E305: Hosting platform is not supported
    ConfigUnsupportedPlatform,

    // ========================================
    // Network errors (5xx)
    // ========================================
    /// E501: Cannot reach the provider
    NetworkUnreachable,
    /// E503: Authentication with the provider failed
    NetworkAuthFailed,
    /// E504: Provider answered with an unexpected status
    ProviderError,

    // ========================================
    // Storage errors (6xx)
    // ========================================
    /// E605: Serialization/deserialization failed
    SerializationError,
    /// E606: IO operation failed
    IoError,
}

impl ErrorCode {
    /// Get the numeric error code (e.g., `ReleaseNotFound` -> 101).
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::ReleaseNotFound => 101,
            Self::ReleaseRetriesExhausted => 102,
            Self::ReleaseTagMissing => 103,

            Self::AssetUploadFailed => 201,
            Self::AssetSyncIncomplete => 202,
            Self::AssetPatternUnmatched => 203,

            Self::ConfigInvalid => 302,
            Self::ConfigMissingRequired => 304,
            Self::ConfigUnsupportedPlatform => 305,

            Self::NetworkUnreachable => 501,
            Self::NetworkAuthFailed => 503,
            Self::ProviderError => 504,

            Self::SerializationError => 605,
            Self::IoError => 606,
        }
    }

    /// Get the error code as a formatted string (e.g., "E101").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    /// Get the default suggestion for this error code.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::ReleaseNotFound => "Check the tag name and repository. Drafts can only be found with --draft",
            Self::ReleaseRetriesExhausted => "Another run may be creating the same release. Re-run the job, or raise --max-retries",
            Self::ReleaseTagMissing => "Pass --tag-name, run on a tag ref (refs/tags/...), or create a draft release",

            Self::AssetUploadFailed => "Check the provider message. The asset may be too large or the token may lack write access",
            Self::AssetSyncIncomplete => "Re-run the job; existing assets with the same name are replaced on every run",
            Self::AssetPatternUnmatched => "Check the file patterns, or unset fail-on-unmatched-files to only warn",

            Self::ConfigInvalid => "Run `relsync check` to see the resolved configuration. Check TOML syntax and env values",
            Self::ConfigMissingRequired => "Set the value in the config file, the environment, or on the command line",
            Self::ConfigUnsupportedPlatform => "Use --platform github or --platform gitea",

            Self::NetworkUnreachable => "Check your network connection and the provider API URL",
            Self::NetworkAuthFailed => "Verify the token and its repository permissions",
            Self::ProviderError => "Inspect the provider status and message for details",

            Self::SerializationError => "The provider response could not be parsed. Check the API URL points at a supported provider",
            Self::IoError => "File operation failed. Check path exists and permissions are correct",
        }
    }

    /// Check if this error is potentially recoverable by the user.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::SerializationError)
    }

    /// Get the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            1 => "release",
            2 => "asset",
            3 => "config",
            5 => "network",
            6 => "storage",
            _ => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}
