//! Capability contract every hosting provider implements.

use std::future::Future;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::{ReleaseError, Result};

use super::{AssetDescriptor, CreateRelease, LocalAsset, RemoteRelease, UpdateRelease};

/// Page size used when listing releases.
pub const RELEASES_PER_PAGE: usize = 100;

/// Lazy, forward-only sequence of release pages.
///
/// Each poll fetches one page. Dropping the stream stops the scan without
/// touching the remaining pages.
pub type ReleasePages<'a> = BoxStream<'a, Result<Vec<RemoteRelease>>>;

/// Remote operations the reconciliation engine and asset sync rely on.
#[async_trait]
pub trait ReleaseBackend: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// Fetch a published release by tag. Fails with
    /// [`ReleaseError::NotFound`](crate::error::ReleaseError::NotFound) when
    /// the tag has no release.
    async fn fetch_by_tag(&self, owner: &str, repo: &str, tag: &str) -> Result<RemoteRelease>;

    /// List every release, drafts included, one page at a time. The stream
    /// ends at the first empty page.
    fn list_all<'a>(&'a self, owner: &'a str, repo: &'a str) -> ReleasePages<'a>;

    async fn create(&self, owner: &str, repo: &str, release: &CreateRelease)
    -> Result<RemoteRelease>;

    async fn update(
        &self,
        owner: &str,
        repo: &str,
        release_id: u64,
        release: &UpdateRelease,
    ) -> Result<RemoteRelease>;

    async fn delete_asset(&self, owner: &str, repo: &str, release_id: u64, asset_id: u64)
    -> Result<()>;

    /// Upload one asset to a release's upload endpoint. A non-success
    /// response fails with
    /// [`ReleaseError::Upload`](crate::error::ReleaseError::Upload).
    async fn upload_asset(&self, upload_url: &str, asset: &LocalAsset) -> Result<AssetDescriptor>;
}

/// Turn a page fetcher into a [`ReleasePages`] stream.
///
/// Pages are numbered from 1. The stream ends on the first empty page and
/// yields (then ends on) the first error.
pub fn paginate<'a, F, Fut>(mut fetch_page: F) -> ReleasePages<'a>
where
    F: FnMut(u32) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Vec<RemoteRelease>>> + Send + 'a,
{
    stream::try_unfold(1_u32, move |page| {
        let next = fetch_page(page);
        async move {
            let releases = next.await?;
            let step = if releases.is_empty() {
                None
            } else {
                Some((releases, page + 1))
            };
            Ok::<_, ReleaseError>(step)
        }
    })
    .boxed()
}
