//! Create-or-update decision for a single release.
//!
//! ```text
//! Looking-up ──found──▶ Updating ──▶ Done
//!     │
//!     └─not found──▶ Creating ──▶ Done
//!                       │
//!                       └─failed──▶ Looking-up (budget - 1) ──▶ … ──▶ Exhausted
//! ```
//!
//! A failed create is presumed to be a race with a concurrent run that
//! created the same tag in between our lookup and our create, so the whole
//! lookup is repeated. Nothing else is retried here.

use futures::TryStreamExt;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{ReleaseError, Result};

use super::{CreateRelease, DesiredRelease, ReleaseBackend, RemoteRelease, UpdateRelease};

/// Default budget of create attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Which path reconciliation took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    Created,
    Updated,
}

impl std::fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
        }
    }
}

/// Result of a successful reconciliation.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub release: RemoteRelease,
    pub action: ReconcileAction,
    /// Failed creates that were retried before this result.
    pub retries: u32,
}

/// Drives one release towards its desired state through a backend.
pub struct Reconciler<'a, B: ReleaseBackend + ?Sized> {
    backend: &'a B,
    max_attempts: u32,
}

impl<'a, B: ReleaseBackend + ?Sized> Reconciler<'a, B> {
    pub const fn new(backend: &'a B) -> Self {
        Self {
            backend,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Create or update the release described by `desired`.
    pub async fn run(&self, desired: &DesiredRelease) -> Result<Reconciliation> {
        let mut remaining = self.max_attempts;
        loop {
            if remaining == 0 {
                error!(
                    tag = %desired.tag,
                    attempts = self.max_attempts,
                    "Too many retries. Aborting..."
                );
                return Err(ReleaseError::AbortedAfterRetries {
                    attempts: self.max_attempts,
                });
            }
            let retries = self.max_attempts - remaining;

            match self.find_existing(desired).await {
                Ok(Some(existing)) => {
                    let request = update_request(desired, &existing);
                    debug!(release_id = existing.id, tag = %desired.tag, "Updating existing release");
                    let release = self
                        .backend
                        .update(&desired.owner, &desired.repo, existing.id, &request)
                        .await?;
                    return Ok(Reconciliation {
                        release,
                        action: ReconcileAction::Updated,
                        retries,
                    });
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        tag = %desired.tag,
                        error = %err,
                        "Unexpected error fetching release"
                    );
                    return Err(err);
                }
            }

            let request = create_request(desired);
            match &request.target_commitish {
                Some(commit) => info!(
                    tag = %request.tag_name,
                    commit = %commit,
                    provider = self.backend.name(),
                    "Creating new release using commit"
                ),
                None => info!(
                    tag = %request.tag_name,
                    provider = self.backend.name(),
                    "Creating new release"
                ),
            }
            match self
                .backend
                .create(&desired.owner, &desired.repo, &request)
                .await
            {
                Ok(release) => {
                    return Ok(Reconciliation {
                        release,
                        action: ReconcileAction::Created,
                        retries,
                    });
                }
                Err(err) => {
                    remaining -= 1;
                    warn!(
                        tag = %desired.tag,
                        error = %err,
                        retries_remaining = remaining,
                        "Release creation failed, presuming a race with a concurrent run; retrying"
                    );
                }
            }
        }
    }

    async fn find_existing(&self, desired: &DesiredRelease) -> Result<Option<RemoteRelease>> {
        if desired.is_draft() {
            return self.scan_for_draft(desired).await;
        }
        match self
            .backend
            .fetch_by_tag(&desired.owner, &desired.repo, &desired.tag)
            .await
        {
            Ok(release) => Ok(Some(release)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    // Drafts have no tag index; walk the listing until the tag shows up.
    async fn scan_for_draft(&self, desired: &DesiredRelease) -> Result<Option<RemoteRelease>> {
        let mut pages = self.backend.list_all(&desired.owner, &desired.repo);
        while let Some(page) = pages.try_next().await? {
            if let Some(found) = page.into_iter().find(|r| r.tag_name == desired.tag) {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

/// Create or update a release, returning the provider's view of it.
pub async fn reconcile<B: ReleaseBackend + ?Sized>(
    desired: &DesiredRelease,
    backend: &B,
    max_attempts: u32,
) -> Result<RemoteRelease> {
    Reconciler::new(backend)
        .with_max_attempts(max_attempts)
        .run(desired)
        .await
        .map(|reconciled| reconciled.release)
}

/// Fields for a brand-new release. Nothing is inherited.
#[must_use]
pub fn create_request(desired: &DesiredRelease) -> CreateRelease {
    CreateRelease {
        tag_name: desired.tag.clone(),
        name: non_empty(desired.name.as_deref())
            .unwrap_or(&desired.tag)
            .to_string(),
        body: desired.body.clone(),
        draft: desired.draft,
        prerelease: desired.prerelease,
        target_commitish: desired.target_commitish.clone(),
        discussion_category_name: desired.discussion_category_name.clone(),
        generate_release_notes: desired.generate_release_notes,
    }
}

/// Fields for updating `existing` towards `desired`.
#[must_use]
pub fn update_request(desired: &DesiredRelease, existing: &RemoteRelease) -> UpdateRelease {
    let target_commitish = match non_empty(desired.target_commitish.as_deref()) {
        Some(commit) if commit != existing.target_commitish => {
            info!(
                from = %existing.target_commitish,
                to = %commit,
                "Updating release commit"
            );
            commit.to_string()
        }
        _ => existing.target_commitish.clone(),
    };

    let name = non_empty(desired.name.as_deref())
        .or_else(|| non_empty(existing.name.as_deref()))
        .unwrap_or(&desired.tag)
        .to_string();

    UpdateRelease {
        tag_name: desired.tag.clone(),
        target_commitish,
        name,
        body: merge_body(
            existing.body.as_deref(),
            desired.body.as_deref(),
            desired.append_body,
        ),
        draft: desired.draft.unwrap_or(existing.draft),
        prerelease: desired.prerelease.unwrap_or(existing.prerelease),
        discussion_category_name: desired.discussion_category_name.clone(),
        generate_release_notes: desired.generate_release_notes,
    }
}

/// Combine the existing release body with a newly supplied one.
///
/// With `append` set and both sides non-empty the result is
/// `existing + "\n" + supplied`. Otherwise the supplied body wins and the
/// existing one is kept only when nothing was supplied.
///
/// Appending is not idempotent: reconciling twice with the same supplied body
/// appends it twice.
#[must_use]
pub fn merge_body(existing: Option<&str>, supplied: Option<&str>, append: bool) -> String {
    match (non_empty(existing), non_empty(supplied)) {
        (Some(existing), Some(supplied)) if append => format!("{existing}\n{supplied}"),
        (_, Some(supplied)) => supplied.to_string(),
        (Some(existing), None) => existing.to_string(),
        (None, None) => String::new(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
