//! GitHub REST backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, RETRY_AFTER};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use crate::error::{ReleaseError, Result};
use crate::release::{
    AssetDescriptor, CreateRelease, LocalAsset, RELEASES_PER_PAGE, ReleaseBackend, ReleasePages,
    RemoteRelease, UpdateRelease, paginate,
};

use super::{expect_json, expect_success, http_client, read_message};

pub const GITHUB_API: &str = "https://api.github.com";
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const DEFAULT_MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// GitHub (or GitHub Enterprise) releases over the REST API.
#[derive(Debug, Clone)]
pub struct GitHubBackend {
    client: reqwest::Client,
    api_url: String,
    token: String,
    max_rate_limit_wait: Duration,
}

impl GitHubBackend {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_url: GITHUB_API.to_string(),
            token: token.into(),
            max_rate_limit_wait: DEFAULT_MAX_RATE_LIMIT_WAIT,
        })
    }

    /// Point at another API root, e.g. a GitHub Enterprise server.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Upper bound on the single rate-limit wait.
    #[must_use]
    pub const fn with_max_rate_limit_wait(mut self, wait: Duration) -> Self {
        self.max_rate_limit_wait = wait;
        self
    }

    fn repo_url(&self, owner: &str, repo: &str, path: &str) -> String {
        format!(
            "{}/repos/{}/{}{path}",
            self.api_url,
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .bearer_auth(&self.token)
    }

    /// Send a request, retrying exactly once when GitHub reports the quota is
    /// exhausted. `build` is called again for the retry.
    async fn send<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let response = build().send().await?;
        let now = chrono::Utc::now().timestamp();
        match rate_limit_delay(response.status(), response.headers(), now) {
            Some(delay) => {
                let wait = delay.min(self.max_rate_limit_wait);
                warn!(
                    status = response.status().as_u16(),
                    wait_secs = wait.as_secs(),
                    "Request quota exhausted, retrying once"
                );
                tokio::time::sleep(wait).await;
                Ok(build().send().await?)
            }
            None => {
                if response.status() == StatusCode::FORBIDDEN {
                    warn!(
                        url = %response.url(),
                        "GitHub refused the request; secondary rate limit or missing permission"
                    );
                }
                Ok(response)
            }
        }
    }

    async fn fetch_page(&self, owner: &str, repo: &str, page: u32) -> Result<Vec<RemoteRelease>> {
        let url = self.repo_url(
            owner,
            repo,
            &format!("/releases?per_page={RELEASES_PER_PAGE}&page={page}"),
        );
        debug!(page, "Listing releases");
        let response = self.send(|| self.request(Method::GET, &url)).await?;
        expect_json(response).await
    }
}

#[async_trait]
impl ReleaseBackend for GitHubBackend {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn fetch_by_tag(&self, owner: &str, repo: &str, tag: &str) -> Result<RemoteRelease> {
        let url = self.repo_url(
            owner,
            repo,
            &format!("/releases/tags/{}", urlencoding::encode(tag)),
        );
        let response = self.send(|| self.request(Method::GET, &url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ReleaseError::NotFound(format!("release with tag {tag}")));
        }
        expect_json(response).await
    }

    fn list_all<'a>(&'a self, owner: &'a str, repo: &'a str) -> ReleasePages<'a> {
        paginate(move |page| self.fetch_page(owner, repo, page))
    }

    async fn create(
        &self,
        owner: &str,
        repo: &str,
        release: &CreateRelease,
    ) -> Result<RemoteRelease> {
        let url = self.repo_url(owner, repo, "/releases");
        let response = self
            .send(|| self.request(Method::POST, &url).json(release))
            .await?;
        expect_json(response).await
    }

    async fn update(
        &self,
        owner: &str,
        repo: &str,
        release_id: u64,
        release: &UpdateRelease,
    ) -> Result<RemoteRelease> {
        let url = self.repo_url(owner, repo, &format!("/releases/{release_id}"));
        let response = self
            .send(|| self.request(Method::PATCH, &url).json(release))
            .await?;
        expect_json(response).await
    }

    async fn delete_asset(
        &self,
        owner: &str,
        repo: &str,
        _release_id: u64,
        asset_id: u64,
    ) -> Result<()> {
        let url = self.repo_url(owner, repo, &format!("/releases/assets/{asset_id}"));
        let response = self.send(|| self.request(Method::DELETE, &url)).await?;
        expect_success(response).await
    }

    async fn upload_asset(&self, upload_url: &str, asset: &LocalAsset) -> Result<AssetDescriptor> {
        let url = format!(
            "{}?name={}",
            normalize_upload_url(upload_url),
            urlencoding::encode(&asset.name)
        );
        // Uploads bypass `send`: a rejected upload is reported, never retried.
        let response = self
            .request(Method::POST, &url)
            .header(CONTENT_TYPE, asset.mime.as_str())
            .header(CONTENT_LENGTH, asset.size)
            .body(asset.data.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReleaseError::Upload {
                name: asset.name.clone(),
                status: status.as_u16(),
                message: read_message(response).await,
            });
        }
        expect_json(response).await
    }
}

/// Strip the URI template (`{?name,label}`) GitHub appends to upload URLs.
#[must_use]
pub fn normalize_upload_url(raw: &str) -> &str {
    raw.find('{').map_or(raw, |idx| &raw[..idx])
}

/// How long to wait before retrying, if the response says the request quota
/// is exhausted: any 429, or a 403 with `x-ratelimit-remaining: 0`.
///
/// `retry-after` wins over `x-ratelimit-reset`; without either the caller's
/// cap applies.
#[must_use]
pub fn rate_limit_delay(status: StatusCode, headers: &HeaderMap, now: i64) -> Option<Duration> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
    };

    let exhausted = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && header("x-ratelimit-remaining") == Some("0"));
    if !exhausted {
        return None;
    }

    if let Some(secs) = header(RETRY_AFTER.as_str()).and_then(|v| v.parse::<u64>().ok()) {
        return Some(Duration::from_secs(secs));
    }
    if let Some(reset) = header("x-ratelimit-reset").and_then(|v| v.parse::<i64>().ok()) {
        let secs = u64::try_from(reset.saturating_sub(now)).unwrap_or(0);
        return Some(Duration::from_secs(secs));
    }
    Some(DEFAULT_MAX_RATE_LIMIT_WAIT)
}
