//! Local files and the delete-then-upload sync of release attachments.

use std::io;
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ReleaseError, Result, StructuredError};

use super::{AssetDescriptor, ReleaseBackend, RemoteRelease};

/// Default number of uploads in flight at once.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 8;

const DEFAULT_MIME: &str = "application/octet-stream";

/// A file ready to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAsset {
    /// Basename of the file; also the asset name on the release.
    pub name: String,
    pub mime: String,
    pub size: u64,
    pub data: Vec<u8>,
}

impl LocalAsset {
    /// Read `path` into memory.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ReleaseError::Config(format!("not a file path: {}", path.display()))
            })?;
        let data = tokio::fs::read(path).await.map_err(|err| {
            ReleaseError::Io(io::Error::new(
                err.kind(),
                format!("{}: {err}", path.display()),
            ))
        })?;
        Ok(Self {
            name,
            mime: mime_or_default(path),
            size: data.len() as u64,
            data,
        })
    }
}

/// MIME type guessed from the extension, `application/octet-stream` when unknown.
#[must_use]
pub fn mime_or_default(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map_or_else(|| DEFAULT_MIME.to_string(), |mime| mime.essence_str().to_string())
}

/// Replace one file on `release`: delete any asset with the same name, then
/// upload the new bytes.
pub async fn upload_asset<B: ReleaseBackend + ?Sized>(
    backend: &B,
    owner: &str,
    repo: &str,
    release: &RemoteRelease,
    path: &Path,
) -> Result<AssetDescriptor> {
    let asset = LocalAsset::from_path(path).await?;

    if let Some(existing) = release.asset_named(&asset.name) {
        debug!(
            asset = %asset.name,
            asset_id = existing.id,
            release_id = release.id,
            "Deleting previously uploaded asset"
        );
        backend
            .delete_asset(owner, repo, release.id, existing.id)
            .await?;
    }

    info!(asset = %asset.name, size = asset.size, mime = %asset.mime, "Uploading asset");
    backend.upload_asset(&release.upload_url, &asset).await
}

/// Sync every path onto `release`.
///
/// Uploads run concurrently, at most `concurrency` at a time. One result per
/// path, in the order of `paths`; a failed file never aborts its siblings.
pub async fn sync_assets<B: ReleaseBackend + ?Sized>(
    backend: &B,
    owner: &str,
    repo: &str,
    release: &RemoteRelease,
    paths: &[PathBuf],
    concurrency: usize,
) -> Vec<Result<AssetDescriptor>> {
    stream::iter(paths)
        .map(|path| async move {
            let result = upload_asset(backend, owner, repo, release, path).await;
            if let Err(err) = &result {
                warn!(path = %path.display(), error = %err, "Asset upload failed");
            }
            result
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}

/// A file that did not make it onto the release.
#[derive(Debug, Clone, Serialize)]
pub struct AssetFailure {
    pub path: String,
    pub error: StructuredError,
}

/// Per-file outcome of an asset sync.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssetSyncReport {
    pub uploaded: Vec<AssetDescriptor>,
    pub failed: Vec<AssetFailure>,
}

impl AssetSyncReport {
    /// Pair `results` (as returned by [`sync_assets`]) with their paths.
    #[must_use]
    pub fn from_results(paths: &[PathBuf], results: Vec<Result<AssetDescriptor>>) -> Self {
        let mut report = Self::default();
        for (path, result) in paths.iter().zip(results) {
            match result {
                Ok(descriptor) => report.uploaded.push(descriptor),
                Err(err) => report.failed.push(AssetFailure {
                    path: path.display().to_string(),
                    error: err.to_structured(),
                }),
            }
        }
        report
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.uploaded.len() + self.failed.len()
    }
}
