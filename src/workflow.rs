//! One release run: preconditions, reconciliation, asset sync.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::ReleaseConfig;
use crate::error::{ReleaseError, Result};
use crate::files::{self, FileMatches};
use crate::release::{
    AssetSyncReport, DesiredRelease, ReconcileAction, Reconciler, ReleaseBackend, RemoteRelease,
    sync_assets,
};

/// Everything decided before the provider is contacted.
#[derive(Debug, Clone, Serialize)]
pub struct ReleasePlan {
    pub desired: DesiredRelease,
    pub files: FileMatches,
    pub warnings: Vec<String>,
}

/// Check preconditions and resolve the release and files a run would use.
///
/// A non-draft release needs a tag. Unmatched file patterns are warnings,
/// or an error with `fail_on_unmatched_files`.
pub fn plan(config: &ReleaseConfig) -> Result<ReleasePlan> {
    config.validate()?;

    let tag = match config.resolved_tag() {
        Some(tag) => tag,
        None if config.draft == Some(true) => String::new(),
        None => {
            return Err(ReleaseError::MissingTag {
                git_ref: config.git_ref().to_string(),
            });
        }
    };
    let desired = config.desired_release(&tag)?;

    let mut warnings = Vec::new();
    let matches = if config.files.is_empty() {
        FileMatches::default()
    } else {
        files::resolve(&config.files)?
    };

    for pattern in &matches.unmatched {
        warn!(pattern = %pattern, "Pattern does not match any files");
        warnings.push(format!("Pattern '{pattern}' does not match any files."));
    }
    if !matches.unmatched.is_empty() && config.fail_on_unmatched_files {
        return Err(ReleaseError::UnmatchedFiles(matches.unmatched));
    }
    for name in colliding_names(&matches.paths) {
        warn!(asset = %name, "Several files share this asset name");
        warnings.push(format!(
            "More than one file is named '{name}'; only one of them will end up on the release."
        ));
    }
    if !config.files.is_empty() && matches.paths.is_empty() {
        let listed = config.files.join(", ");
        warn!(files = %listed, "No valid file to upload");
        warnings.push(format!("{listed} does not include a valid file."));
    }

    Ok(ReleasePlan {
        desired,
        files: matches,
        warnings,
    })
}

/// Asset names shared by more than one path, in first-seen order.
fn colliding_names(paths: &[PathBuf]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut colliding = Vec::new();
    for name in paths.iter().filter_map(|path| path.file_name()) {
        let name = name.to_string_lossy().into_owned();
        if !seen.insert(name.clone()) && !colliding.contains(&name) {
            colliding.push(name);
        }
    }
    colliding
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct ReleaseOutcome {
    pub release: RemoteRelease,
    pub action: ReconcileAction,
    pub retries: u32,
    /// `None` when no files were configured.
    pub assets: Option<AssetSyncReport>,
    pub warnings: Vec<String>,
}

/// Serializable view of a [`ReleaseOutcome`].
#[derive(Debug, Serialize)]
pub struct ReleaseSummary<'a> {
    pub url: &'a str,
    pub id: u64,
    pub upload_url: &'a str,
    pub tag: &'a str,
    pub action: ReconcileAction,
    pub retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<&'a AssetSyncReport>,
    #[serde(skip_serializing_if = "no_warnings")]
    pub warnings: &'a [String],
}

fn no_warnings(warnings: &&[String]) -> bool {
    warnings.is_empty()
}

impl ReleaseOutcome {
    #[must_use]
    pub fn summary(&self) -> ReleaseSummary<'_> {
        ReleaseSummary {
            url: &self.release.html_url,
            id: self.release.id,
            upload_url: &self.release.upload_url,
            tag: &self.release.tag_name,
            action: self.action,
            retries: self.retries,
            assets: self.assets.as_ref(),
            warnings: &self.warnings,
        }
    }

    /// Fail when any asset upload failed. The release itself exists either way.
    pub fn ensure_complete(&self) -> Result<()> {
        match &self.assets {
            Some(report) if !report.is_complete() => Err(ReleaseError::AssetsFailed {
                failed: report.failed.len(),
                total: report.total(),
            }),
            _ => Ok(()),
        }
    }
}

/// Reconcile the configured release and sync its files.
pub async fn run_release<B: ReleaseBackend + ?Sized>(
    config: &ReleaseConfig,
    backend: &B,
) -> Result<ReleaseOutcome> {
    let ReleasePlan {
        desired,
        files,
        warnings,
    } = plan(config)?;

    let reconciled = Reconciler::new(backend)
        .with_max_attempts(config.max_retries)
        .run(&desired)
        .await?;
    info!(
        release_id = reconciled.release.id,
        action = %reconciled.action,
        retries = reconciled.retries,
        "Release reconciled"
    );

    let assets = if config.files.is_empty() {
        None
    } else {
        let results = sync_assets(
            backend,
            &desired.owner,
            &desired.repo,
            &reconciled.release,
            &files.paths,
            config.upload_concurrency,
        )
        .await;
        Some(AssetSyncReport::from_results(&files.paths, results))
    };

    info!(url = %reconciled.release.html_url, "Release ready");
    Ok(ReleaseOutcome {
        release: reconciled.release,
        action: reconciled.action,
        retries: reconciled.retries,
        assets,
        warnings,
    })
}
