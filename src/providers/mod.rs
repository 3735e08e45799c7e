//! Hosting provider backends.

pub mod gitea;
pub mod github;

use std::str::FromStr;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ReleaseConfig;
use crate::error::{ReleaseError, Result};
use crate::release::ReleaseBackend;

pub use gitea::GiteaBackend;
pub use github::GitHubBackend;

pub(crate) const USER_AGENT: &str = concat!("relsync/", env!("CARGO_PKG_VERSION"));

/// Supported hosting platforms.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Github,
    Gitea,
}

impl FromStr for Platform {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(Self::Github),
            "gitea" => Ok(Self::Gitea),
            other => Err(ReleaseError::UnsupportedPlatform(other.to_string())),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Github => write!(f, "github"),
            Self::Gitea => write!(f, "gitea"),
        }
    }
}

/// Build the backend selected by `config.platform`.
pub fn backend_for(config: &ReleaseConfig) -> Result<Box<dyn ReleaseBackend>> {
    let token = config
        .token
        .as_deref()
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ReleaseError::MissingConfig("token".to_string()))?;

    match config.platform {
        Platform::Github => {
            let mut backend = GitHubBackend::new(token)?;
            if let Some(url) = config.api_url() {
                backend = backend.with_api_url(url);
            }
            Ok(Box::new(backend))
        }
        Platform::Gitea => {
            let server = config.api_url().unwrap_or(gitea::GITEA_DEFAULT_URL);
            Ok(Box::new(GiteaBackend::new(server, token)?))
        }
    }
}

pub(crate) fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().user_agent(USER_AGENT).build()?)
}

/// Decode a successful JSON response, or turn a failure into
/// [`ReleaseError::Api`].
pub(crate) async fn expect_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(ReleaseError::api(status, read_message(response).await));
    }
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub(crate) async fn expect_success(response: Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    Err(ReleaseError::api(status, read_message(response).await))
}

pub(crate) async fn read_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    provider_message(status, &text)
}

/// Error text from a provider response body.
///
/// JSON bodies contribute their `message`, followed by the `errors` array
/// verbatim on its own line when present. Anything else is passed through
/// trimmed; an empty body falls back to the status reason.
pub(crate) fn provider_message(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    let fallback = || {
        if trimmed.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        } else {
            trimmed.to_string()
        }
    };

    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return fallback();
    };
    let Some(message) = value.get("message").and_then(Value::as_str) else {
        return fallback();
    };
    match value.get("errors") {
        Some(errors @ Value::Array(items)) if !items.is_empty() => format!("{message}\n{errors}"),
        _ => message.to_string(),
    }
}
