//! Gitea (and Forgejo) backend over `/api/v1`.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ReleaseError, Result};
use crate::release::{
    AssetDescriptor, CreateRelease, LocalAsset, RELEASES_PER_PAGE, ReleaseBackend, ReleasePages,
    RemoteAsset, RemoteRelease, UpdateRelease, paginate,
};

use super::{expect_json, expect_success, http_client, read_message};

pub const GITEA_DEFAULT_URL: &str = "https://gitea.com";

/// Release as Gitea returns it. Gitea has no upload URL template; assets
/// are posted to `<release api url>/assets`.
#[derive(Debug, Deserialize)]
struct GiteaRelease {
    id: u64,
    url: String,
    #[serde(default)]
    html_url: String,
    tag_name: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    target_commitish: String,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    assets: Vec<RemoteAsset>,
}

impl From<GiteaRelease> for RemoteRelease {
    fn from(release: GiteaRelease) -> Self {
        Self {
            id: release.id,
            upload_url: format!("{}/assets", release.url.trim_end_matches('/')),
            html_url: release.html_url,
            tag_name: release.tag_name,
            name: release.name,
            body: release.body,
            target_commitish: release.target_commitish,
            draft: release.draft,
            prerelease: release.prerelease,
            assets: release.assets,
        }
    }
}

/// Create/edit payload. Gitea has neither discussion categories nor
/// generated release notes.
#[derive(Debug, Serialize)]
struct GiteaReleaseOption<'a> {
    tag_name: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_commitish: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    draft: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prerelease: Option<bool>,
}

impl<'a> From<&'a CreateRelease> for GiteaReleaseOption<'a> {
    fn from(release: &'a CreateRelease) -> Self {
        Self {
            tag_name: &release.tag_name,
            name: &release.name,
            body: release.body.as_deref(),
            target_commitish: release.target_commitish.as_deref(),
            draft: release.draft,
            prerelease: release.prerelease,
        }
    }
}

impl<'a> From<&'a UpdateRelease> for GiteaReleaseOption<'a> {
    fn from(release: &'a UpdateRelease) -> Self {
        Self {
            tag_name: &release.tag_name,
            name: &release.name,
            body: Some(&release.body),
            target_commitish: Some(&release.target_commitish),
            draft: Some(release.draft),
            prerelease: Some(release.prerelease),
        }
    }
}

fn log_unsupported(discussion_category_name: Option<&str>, generate_release_notes: bool) {
    if discussion_category_name.is_some() || generate_release_notes {
        debug!("Gitea does not support discussion categories or generated notes; ignoring");
    }
}

/// Gitea releases over the v1 REST API.
#[derive(Debug, Clone)]
pub struct GiteaBackend {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl GiteaBackend {
    /// `server_url` is the instance root, e.g. `https://gitea.com`.
    pub fn new(server_url: &str, token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_url: format!("{}/api/v1", server_url.trim_end_matches('/')),
            token: token.into(),
        })
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
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("token {}", self.token))
    }

    async fn fetch_page(&self, owner: &str, repo: &str, page: u32) -> Result<Vec<RemoteRelease>> {
        let url = self.repo_url(
            owner,
            repo,
            &format!("/releases?limit={RELEASES_PER_PAGE}&page={page}"),
        );
        debug!(page, "Listing releases");
        let response = self.request(Method::GET, &url).send().await?;
        let releases: Vec<GiteaRelease> = expect_json(response).await?;
        Ok(releases.into_iter().map(RemoteRelease::from).collect())
    }
}

#[async_trait]
impl ReleaseBackend for GiteaBackend {
    fn name(&self) -> &'static str {
        "gitea"
    }

    async fn fetch_by_tag(&self, owner: &str, repo: &str, tag: &str) -> Result<RemoteRelease> {
        let url = self.repo_url(
            owner,
            repo,
            &format!("/releases/tags/{}", urlencoding::encode(tag)),
        );
        let response = self.request(Method::GET, &url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ReleaseError::NotFound(format!("release with tag {tag}")));
        }
        expect_json::<GiteaRelease>(response).await.map(Into::into)
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
        log_unsupported(
            release.discussion_category_name.as_deref(),
            release.generate_release_notes,
        );
        let url = self.repo_url(owner, repo, "/releases");
        let response = self
            .request(Method::POST, &url)
            .json(&GiteaReleaseOption::from(release))
            .send()
            .await?;
        expect_json::<GiteaRelease>(response).await.map(Into::into)
    }

    async fn update(
        &self,
        owner: &str,
        repo: &str,
        release_id: u64,
        release: &UpdateRelease,
    ) -> Result<RemoteRelease> {
        log_unsupported(
            release.discussion_category_name.as_deref(),
            release.generate_release_notes,
        );
        let url = self.repo_url(owner, repo, &format!("/releases/{release_id}"));
        let response = self
            .request(Method::PATCH, &url)
            .json(&GiteaReleaseOption::from(release))
            .send()
            .await?;
        expect_json::<GiteaRelease>(response).await.map(Into::into)
    }

    async fn delete_asset(
        &self,
        owner: &str,
        repo: &str,
        release_id: u64,
        asset_id: u64,
    ) -> Result<()> {
        let url = self.repo_url(
            owner,
            repo,
            &format!("/releases/{release_id}/assets/{asset_id}"),
        );
        let response = self.request(Method::DELETE, &url).send().await?;
        expect_success(response).await
    }

    async fn upload_asset(&self, upload_url: &str, asset: &LocalAsset) -> Result<AssetDescriptor> {
        let url = format!("{upload_url}?name={}", urlencoding::encode(&asset.name));
        let part = Part::bytes(asset.data.clone())
            .file_name(asset.name.clone())
            .mime_str(&asset.mime)?;
        let response = self
            .request(Method::POST, &url)
            .multipart(Form::new().part("attachment", part))
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
