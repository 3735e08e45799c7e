//! In-memory `ReleaseBackend` for testing.
//!
//! `MockReleaseBackend` keeps releases in memory and records every call it
//! receives, so tests can assert on the exact sequence of provider requests
//! (lookups, pages fetched, delete-before-upload ordering) without a server.
//!
//! | Test Type | Use |
//! |-----------|-----|
//! | Reconciliation decisions, retry budget | `MockReleaseBackend` (this module) |
//! | Error injection / edge cases | `MockReleaseBackend::inject_error` |
//! | Wire format of a provider | real backend + `httpmock` |
//!
//! ```rust,ignore
//! use relsync::test_utils::mock_backend::{MockReleaseBackend, test_release};
//!
//! let backend = MockReleaseBackend::new().with_releases(vec![test_release(1, "v1")]);
//! backend.simulate_create_race(1);
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{ReleaseError, Result};
use crate::release::{
    AssetDescriptor, CreateRelease, LocalAsset, RELEASES_PER_PAGE, ReleaseBackend, ReleasePages,
    RemoteAsset, RemoteRelease, UpdateRelease, paginate,
};

/// A request the mock received, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    FetchByTag { tag: String },
    ListPage { page: u32 },
    Create(CreateRelease),
    Update { release_id: u64, request: UpdateRelease },
    DeleteAsset { release_id: u64, asset_id: u64 },
    UploadAsset { upload_url: String, name: String },
}

/// Kind of error to inject.
#[derive(Debug, Clone)]
pub enum MockErrorKind {
    NotFound,
    Status(u16, String),
}

impl MockErrorKind {
    fn to_error(&self, context: &str) -> ReleaseError {
        match self {
            Self::NotFound => ReleaseError::NotFound(format!("mock error: {context}")),
            Self::Status(status, message) => ReleaseError::Api {
                status: *status,
                message: message.clone(),
            },
        }
    }
}

/// Error injection configuration.
#[derive(Debug, Clone)]
pub enum ErrorInjection {
    /// Fail every operation.
    All(MockErrorKind),
    /// Fail one operation by name: `fetch_by_tag`, `list_page`, `create`,
    /// `update`, `delete_asset` or `upload_asset`.
    Operation(&'static str, MockErrorKind),
}

#[derive(Debug)]
struct MockState {
    releases: Vec<RemoteRelease>,
    page_size: usize,
    calls: Vec<BackendCall>,
    failing_creates: u32,
    race_on_create_failure: bool,
    error_on: Option<ErrorInjection>,
    upload_failures: HashMap<String, (u16, String)>,
    next_id: u64,
}

/// In-memory release store that records the calls made against it.
#[derive(Debug)]
pub struct MockReleaseBackend {
    state: Mutex<MockState>,
}

impl MockReleaseBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                releases: Vec::new(),
                page_size: RELEASES_PER_PAGE,
                calls: Vec::new(),
                failing_creates: 0,
                race_on_create_failure: false,
                error_on: None,
                upload_failures: HashMap::new(),
                next_id: 1000,
            }),
        }
    }

    /// Pre-populate with releases, in listing order.
    #[must_use]
    pub fn with_releases(self, releases: Vec<RemoteRelease>) -> Self {
        self.lock().releases.extend(releases);
        self
    }

    /// Use a smaller page size so listings span several pages.
    #[must_use]
    pub fn with_page_size(self, page_size: usize) -> Self {
        self.lock().page_size = page_size.max(1);
        self
    }

    pub fn insert_release(&self, release: RemoteRelease) {
        self.lock().releases.push(release);
    }

    /// Snapshot of all stored releases.
    pub fn releases(&self) -> Vec<RemoteRelease> {
        self.lock().releases.clone()
    }

    pub fn release_by_tag(&self, tag: &str) -> Option<RemoteRelease> {
        self.lock()
            .releases
            .iter()
            .find(|release| release.tag_name == tag)
            .cloned()
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    /// Number of create requests received.
    pub fn create_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, BackendCall::Create(_)))
            .count()
    }

    /// Pages requested from the listing, in order.
    pub fn pages_requested(&self) -> Vec<u32> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::ListPage { page } => Some(*page),
                _ => None,
            })
            .collect()
    }

    /// Make the next `count` creates fail with a 422.
    pub fn fail_creates(&self, count: u32) {
        let mut state = self.lock();
        state.failing_creates = count;
        state.race_on_create_failure = false;
    }

    /// Like [`fail_creates`](Self::fail_creates), but the first failure also
    /// stores the release, as if a concurrent run had created it first.
    pub fn simulate_create_race(&self, count: u32) {
        let mut state = self.lock();
        state.failing_creates = count;
        state.race_on_create_failure = true;
    }

    /// Reject uploads of `name` with the given status and message.
    pub fn fail_upload(&self, name: &str, status: u16, message: &str) {
        self.lock()
            .upload_failures
            .insert(name.to_string(), (status, message.to_string()));
    }

    pub fn inject_error(&self, injection: ErrorInjection) {
        self.lock().error_on = Some(injection);
    }

    pub fn clear_errors(&self) {
        self.lock().error_on = None;
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_error(state: &MockState, op: &str) -> Result<()> {
        match state.error_on.as_ref() {
            Some(ErrorInjection::All(kind)) => Err(kind.to_error(op)),
            Some(ErrorInjection::Operation(target, kind)) if *target == op => {
                Err(kind.to_error(op))
            }
            _ => Ok(()),
        }
    }

    fn list_page(&self, page: u32) -> Result<Vec<RemoteRelease>> {
        let mut state = self.lock();
        state.calls.push(BackendCall::ListPage { page });
        Self::check_error(&state, "list_page")?;

        let skip = (page.saturating_sub(1) as usize).saturating_mul(state.page_size);
        Ok(state
            .releases
            .iter()
            .skip(skip)
            .take(state.page_size)
            .cloned()
            .collect())
    }

    fn store_new(state: &mut MockState, request: &CreateRelease) -> RemoteRelease {
        let id = state.next_id;
        state.next_id += 1;
        let release = RemoteRelease {
            id,
            upload_url: format!("mock://uploads/{id}"),
            html_url: format!("mock://releases/tag/{}", request.tag_name),
            tag_name: request.tag_name.clone(),
            name: Some(request.name.clone()),
            body: request.body.clone(),
            target_commitish: request
                .target_commitish
                .clone()
                .unwrap_or_else(|| "main".to_string()),
            draft: request.draft.unwrap_or(false),
            prerelease: request.prerelease.unwrap_or(false),
            assets: Vec::new(),
        };
        state.releases.push(release.clone());
        release
    }
}

impl Default for MockReleaseBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReleaseBackend for MockReleaseBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_by_tag(&self, _owner: &str, _repo: &str, tag: &str) -> Result<RemoteRelease> {
        let mut state = self.lock();
        state.calls.push(BackendCall::FetchByTag {
            tag: tag.to_string(),
        });
        Self::check_error(&state, "fetch_by_tag")?;

        state
            .releases
            .iter()
            .find(|release| !release.draft && release.tag_name == tag)
            .cloned()
            .ok_or_else(|| ReleaseError::NotFound(format!("release with tag {tag}")))
    }

    fn list_all<'a>(&'a self, _owner: &'a str, _repo: &'a str) -> ReleasePages<'a> {
        paginate(move |page| {
            let result = self.list_page(page);
            async move { result }
        })
    }

    async fn create(
        &self,
        _owner: &str,
        _repo: &str,
        release: &CreateRelease,
    ) -> Result<RemoteRelease> {
        let mut state = self.lock();
        state.calls.push(BackendCall::Create(release.clone()));
        Self::check_error(&state, "create")?;

        if state.failing_creates > 0 {
            state.failing_creates -= 1;
            if state.race_on_create_failure {
                state.race_on_create_failure = false;
                Self::store_new(&mut state, release);
            }
            return Err(ReleaseError::Api {
                status: 422,
                message: "Validation Failed: already_exists".to_string(),
            });
        }

        Ok(Self::store_new(&mut state, release))
    }

    async fn update(
        &self,
        _owner: &str,
        _repo: &str,
        release_id: u64,
        request: &UpdateRelease,
    ) -> Result<RemoteRelease> {
        let mut state = self.lock();
        state.calls.push(BackendCall::Update {
            release_id,
            request: request.clone(),
        });
        Self::check_error(&state, "update")?;

        let release = state
            .releases
            .iter_mut()
            .find(|release| release.id == release_id)
            .ok_or_else(|| ReleaseError::NotFound(format!("release {release_id}")))?;
        release.tag_name.clone_from(&request.tag_name);
        release.target_commitish.clone_from(&request.target_commitish);
        release.name = Some(request.name.clone());
        release.body = Some(request.body.clone());
        release.draft = request.draft;
        release.prerelease = request.prerelease;
        Ok(release.clone())
    }

    async fn delete_asset(
        &self,
        _owner: &str,
        _repo: &str,
        release_id: u64,
        asset_id: u64,
    ) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(BackendCall::DeleteAsset {
            release_id,
            asset_id,
        });
        Self::check_error(&state, "delete_asset")?;

        if let Some(release) = state.releases.iter_mut().find(|r| r.id == release_id) {
            release.assets.retain(|asset| asset.id != asset_id);
        }
        Ok(())
    }

    async fn upload_asset(&self, upload_url: &str, asset: &LocalAsset) -> Result<AssetDescriptor> {
        let mut state = self.lock();
        state.calls.push(BackendCall::UploadAsset {
            upload_url: upload_url.to_string(),
            name: asset.name.clone(),
        });
        Self::check_error(&state, "upload_asset")?;

        if let Some((status, message)) = state.upload_failures.get(&asset.name) {
            return Err(ReleaseError::Upload {
                name: asset.name.clone(),
                status: *status,
                message: message.clone(),
            });
        }

        let id = state.next_id;
        state.next_id += 1;
        if let Some(release) = state
            .releases
            .iter_mut()
            .find(|release| release.upload_url == upload_url)
        {
            release.assets.push(RemoteAsset {
                id,
                name: asset.name.clone(),
            });
        }
        Ok(AssetDescriptor {
            id,
            name: asset.name.clone(),
            size: asset.size,
            content_type: Some(asset.mime.clone()),
            browser_download_url: format!("mock://download/{}", asset.name),
        })
    }
}

/// Create a published release for testing.
#[must_use]
pub fn test_release(id: u64, tag: &str) -> RemoteRelease {
    RemoteRelease {
        id,
        upload_url: format!("mock://uploads/{id}"),
        html_url: format!("mock://releases/tag/{tag}"),
        tag_name: tag.to_string(),
        name: Some(tag.to_string()),
        body: None,
        target_commitish: "main".to_string(),
        draft: false,
        prerelease: false,
        assets: Vec::new(),
    }
}

/// Create a draft release for testing.
#[must_use]
pub fn test_draft(id: u64, tag: &str) -> RemoteRelease {
    RemoteRelease {
        draft: true,
        ..test_release(id, tag)
    }
}
