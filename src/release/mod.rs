//! Release reconciliation and asset synchronization.
//!
//! The engine never talks HTTP itself: everything goes through a
//! [`ReleaseBackend`], so the same decision logic drives GitHub, Gitea, and
//! the in-memory backend used by tests.

pub mod assets;
pub mod backend;
pub mod reconcile;

use serde::{Deserialize, Serialize};

use crate::error::{ReleaseError, Result};

pub use assets::{
    AssetFailure, AssetSyncReport, DEFAULT_UPLOAD_CONCURRENCY, LocalAsset, sync_assets,
    upload_asset,
};
pub use backend::{RELEASES_PER_PAGE, ReleaseBackend, ReleasePages, paginate};
pub use reconcile::{
    DEFAULT_MAX_ATTEMPTS, ReconcileAction, Reconciliation, Reconciler, merge_body, reconcile,
};

const TAG_REF_PREFIX: &str = "refs/tags/";

/// `owner/repo` pair identifying a repository on the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Parse `owner/repo`, tolerating a leading `https://github.com/` and a
    /// trailing `.git`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        for prefix in ["https://github.com/", "http://github.com/", "github.com/"] {
            if let Some(stripped) = trimmed.strip_prefix(prefix) {
                return Self::parse(stripped);
            }
        }
        let mut parts = trimmed.split('/');
        let owner = parts.next().unwrap_or("").trim();
        let repo = parts.next().unwrap_or("").trim();
        if owner.is_empty() || repo.is_empty() || parts.any(|part| !part.trim().is_empty()) {
            return Err(ReleaseError::Config(format!(
                "invalid repository reference: {input} (expected owner/repo)"
            )));
        }
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.trim_end_matches(".git").to_string(),
        })
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Whether a git ref points at a tag.
#[must_use]
pub fn is_tag_ref(git_ref: &str) -> bool {
    git_ref.starts_with(TAG_REF_PREFIX)
}

/// Explicit tag if non-empty, else the tag named by a `refs/tags/` ref.
#[must_use]
pub fn resolve_tag(tag_name: Option<&str>, git_ref: &str) -> Option<String> {
    tag_name
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .or_else(|| git_ref.strip_prefix(TAG_REF_PREFIX).map(str::to_string))
}

/// The release the caller wants to exist.
///
/// `draft` and `prerelease` are tri-state: `None` means "keep whatever the
/// existing release has", which is not the same as `Some(false)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DesiredRelease {
    pub owner: String,
    pub repo: String,
    pub tag: String,
    pub name: Option<String>,
    pub body: Option<String>,
    pub append_body: bool,
    pub draft: Option<bool>,
    pub prerelease: Option<bool>,
    pub target_commitish: Option<String>,
    pub discussion_category_name: Option<String>,
    pub generate_release_notes: bool,
}

impl DesiredRelease {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Drafts are not indexed by tag and need a full listing scan.
    #[must_use]
    pub fn is_draft(&self) -> bool {
        self.draft == Some(true)
    }
}

/// Asset already attached to a remote release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAsset {
    pub id: u64,
    pub name: String,
}

/// Snapshot of a release as the provider reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRelease {
    pub id: u64,
    pub upload_url: String,
    pub html_url: String,
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub target_commitish: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<RemoteAsset>,
}

impl RemoteRelease {
    /// Asset with exactly this name, if one is attached.
    #[must_use]
    pub fn asset_named(&self, name: &str) -> Option<&RemoteAsset> {
        self.assets.iter().find(|asset| asset.name == name)
    }
}

/// Payload for creating a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateRelease {
    pub tag_name: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prerelease: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_commitish: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discussion_category_name: Option<String>,
    pub generate_release_notes: bool,
}

/// Payload for updating an existing release. Every field is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateRelease {
    pub tag_name: String,
    pub target_commitish: String,
    pub name: String,
    pub body: String,
    pub draft: bool,
    pub prerelease: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discussion_category_name: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub generate_release_notes: bool,
}

/// What the provider returns after an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub browser_download_url: String,
}
