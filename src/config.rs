use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ReleaseError, Result};
use crate::files::parse_patterns;
use crate::providers::Platform;
use crate::release::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_UPLOAD_CONCURRENCY, DesiredRelease, RepoRef, resolve_tag,
};

/// Config file picked up from the working directory when no path is given.
pub const PROJECT_CONFIG_FILE: &str = "relsync.toml";

/// Resolved settings for one run.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseConfig {
    pub platform: Platform,
    /// Explicit API root; wins over the per-platform defaults below.
    pub api_url: Option<String>,
    /// Gitea instance root (`INPUT_URL`).
    pub url: Option<String>,
    /// GitHub API root advertised by the runner (`GITHUB_API_URL`).
    pub github_api_url: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub repository: Option<String>,
    pub git_ref: Option<String>,
    pub tag_name: Option<String>,
    pub name: Option<String>,
    pub body: Option<String>,
    pub body_path: Option<PathBuf>,
    pub append_body: bool,
    pub draft: Option<bool>,
    pub prerelease: Option<bool>,
    pub target_commitish: Option<String>,
    pub discussion_category_name: Option<String>,
    pub generate_release_notes: bool,
    pub files: Vec<String>,
    pub fail_on_unmatched_files: bool,
    pub max_retries: u32,
    pub upload_concurrency: usize,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            platform: Platform::default(),
            api_url: None,
            url: None,
            github_api_url: None,
            token: None,
            repository: None,
            git_ref: None,
            tag_name: None,
            name: None,
            body: None,
            body_path: None,
            append_body: false,
            draft: None,
            prerelease: None,
            target_commitish: None,
            discussion_category_name: None,
            generate_release_notes: false,
            files: Vec::new(),
            fail_on_unmatched_files: false,
            max_retries: DEFAULT_MAX_ATTEMPTS,
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
        }
    }
}

/// Partial config from a TOML file or the command line. `None` leaves the
/// current value alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigPatch {
    pub platform: Option<Platform>,
    pub api_url: Option<String>,
    pub url: Option<String>,
    pub token: Option<String>,
    pub repository: Option<String>,
    pub git_ref: Option<String>,
    pub tag_name: Option<String>,
    pub name: Option<String>,
    pub body: Option<String>,
    pub body_path: Option<PathBuf>,
    pub append_body: Option<bool>,
    pub draft: Option<bool>,
    pub prerelease: Option<bool>,
    pub target_commitish: Option<String>,
    pub discussion_category_name: Option<String>,
    pub generate_release_notes: Option<bool>,
    pub files: Option<Vec<String>>,
    pub fail_on_unmatched_files: Option<bool>,
    pub max_retries: Option<u32>,
    pub upload_concurrency: Option<usize>,
}

/// Environment lookup; swapped out in tests.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

impl ReleaseConfig {
    /// Defaults, then the config file, then the process environment.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(explicit_path, &|key| std::env::var(key).ok())
    }

    pub fn load_with_env(explicit_path: Option<&Path>, env: EnvLookup<'_>) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| env_string(env, "RELSYNC_CONFIG").map(PathBuf::from));

        if let Some(path) = explicit {
            config.merge_patch(Self::load_patch(&path)?);
        } else {
            let project = Path::new(PROJECT_CONFIG_FILE);
            if project.is_file() {
                config.merge_patch(Self::load_patch(project)?);
            }
        }

        config.apply_env_overrides(env)?;

        Ok(config)
    }

    fn load_patch(path: &Path) -> Result<ConfigPatch> {
        debug!(path = %path.display(), "Loading config file");
        let raw = std::fs::read_to_string(path)
            .map_err(|err| ReleaseError::Config(format!("read config {}: {err}", path.display())))?;
        toml::from_str(&raw)
            .map_err(|err| ReleaseError::Config(format!("parse config {}: {err}", path.display())))
    }

    pub fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(value) = patch.platform {
            self.platform = value;
        }
        if let Some(value) = patch.api_url {
            self.api_url = Some(value);
        }
        if let Some(value) = patch.url {
            self.url = Some(value);
        }
        if let Some(value) = patch.token {
            self.token = Some(value);
        }
        if let Some(value) = patch.repository {
            self.repository = Some(value);
        }
        if let Some(value) = patch.git_ref {
            self.git_ref = Some(value);
        }
        if let Some(value) = patch.tag_name {
            self.tag_name = Some(value);
        }
        if let Some(value) = patch.name {
            self.name = Some(value);
        }
        if let Some(value) = patch.body {
            self.body = Some(value);
        }
        if let Some(value) = patch.body_path {
            self.body_path = Some(value);
        }
        if let Some(value) = patch.append_body {
            self.append_body = value;
        }
        if let Some(value) = patch.draft {
            self.draft = Some(value);
        }
        if let Some(value) = patch.prerelease {
            self.prerelease = Some(value);
        }
        if let Some(value) = patch.target_commitish {
            self.target_commitish = Some(value);
        }
        if let Some(value) = patch.discussion_category_name {
            self.discussion_category_name = Some(value);
        }
        if let Some(value) = patch.generate_release_notes {
            self.generate_release_notes = value;
        }
        if let Some(values) = patch.files {
            self.files = values;
        }
        if let Some(value) = patch.fail_on_unmatched_files {
            self.fail_on_unmatched_files = value;
        }
        if let Some(value) = patch.max_retries {
            self.max_retries = value;
        }
        if let Some(value) = patch.upload_concurrency {
            self.upload_concurrency = value;
        }
    }

    fn apply_env_overrides(&mut self, env: EnvLookup<'_>) -> Result<()> {
        if let Some(value) = env_string(env, "INPUT_PLATFORM") {
            self.platform = value.parse()?;
        }
        if let Some(value) = env_string(env, "INPUT_URL") {
            self.url = Some(value);
        }
        if let Some(value) = env_string(env, "GITHUB_API_URL") {
            self.github_api_url = Some(value);
        }
        if let Some(value) =
            env_string(env, "INPUT_TOKEN").or_else(|| env_string(env, "GITHUB_TOKEN"))
        {
            self.token = Some(value);
        }
        if let Some(value) = env_string(env, "GITHUB_REPOSITORY") {
            self.repository = Some(value);
        }
        if let Some(value) = env_string(env, "GITHUB_REF") {
            self.git_ref = Some(value);
        }

        if let Some(value) = env_string(env, "INPUT_TAG_NAME") {
            self.tag_name = Some(value);
        }
        if let Some(value) = env_string(env, "INPUT_NAME") {
            self.name = Some(value);
        }
        if let Some(value) = env_string(env, "INPUT_BODY") {
            self.body = Some(value);
        }
        if let Some(value) = env_string(env, "INPUT_BODY_PATH") {
            self.body_path = Some(PathBuf::from(value));
        }
        if let Some(value) = env_bool(env, "INPUT_APPEND_BODY") {
            self.append_body = value;
        }
        if let Some(value) = env_bool(env, "INPUT_DRAFT") {
            self.draft = Some(value);
        }
        if let Some(value) = env_bool(env, "INPUT_PRERELEASE") {
            self.prerelease = Some(value);
        }
        if let Some(value) = env_string(env, "INPUT_TARGET_COMMITISH") {
            self.target_commitish = Some(value);
        }
        if let Some(value) = env_string(env, "INPUT_DISCUSSION_CATEGORY_NAME") {
            self.discussion_category_name = Some(value);
        }
        if let Some(value) = env_bool(env, "INPUT_GENERATE_RELEASE_NOTES") {
            self.generate_release_notes = value;
        }

        if let Some(value) = env_string(env, "INPUT_FILES") {
            self.files = parse_patterns(&value);
        }
        if let Some(value) = env_bool(env, "INPUT_FAIL_ON_UNMATCHED_FILES") {
            self.fail_on_unmatched_files = value;
        }
        if let Some(value) = env_u32(env, "INPUT_MAX_RETRIES")? {
            self.max_retries = value;
        }
        if let Some(value) = env_usize(env, "INPUT_UPLOAD_CONCURRENCY")? {
            self.upload_concurrency = value;
        }

        Ok(())
    }

    /// Reject values no run can succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(ReleaseError::Config(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.upload_concurrency == 0 {
            return Err(ReleaseError::Config(
                "upload_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// API root for the selected platform, if one is configured.
    #[must_use]
    pub fn api_url(&self) -> Option<&str> {
        let platform_url = match self.platform {
            Platform::Github => self.github_api_url.as_deref(),
            Platform::Gitea => self.url.as_deref(),
        };
        self.api_url
            .as_deref()
            .or(platform_url)
            .filter(|url| !url.is_empty())
    }

    pub fn repo_ref(&self) -> Result<RepoRef> {
        let repository = self
            .repository
            .as_deref()
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ReleaseError::MissingConfig("repository".to_string()))?;
        RepoRef::parse(repository)
    }

    #[must_use]
    pub fn git_ref(&self) -> &str {
        self.git_ref.as_deref().unwrap_or_default()
    }

    /// Explicit tag, else the tag the git ref points at.
    #[must_use]
    pub fn resolved_tag(&self) -> Option<String> {
        resolve_tag(self.tag_name.as_deref(), self.git_ref())
    }

    /// Release notes: the body file when it is readable and non-empty,
    /// otherwise the inline body.
    #[must_use]
    pub fn release_body(&self) -> Option<String> {
        if let Some(path) = &self.body_path {
            match std::fs::read_to_string(path) {
                Ok(contents) if !contents.is_empty() => return Some(contents),
                Ok(_) => debug!(path = %path.display(), "Body file is empty"),
                Err(err) => warn!(path = %path.display(), error = %err, "Cannot read body file"),
            }
        }
        self.body.clone().filter(|body| !body.is_empty())
    }

    /// The release this config asks for, under `tag`.
    pub fn desired_release(&self, tag: &str) -> Result<DesiredRelease> {
        let repo = self.repo_ref()?;
        Ok(DesiredRelease {
            owner: repo.owner,
            repo: repo.repo,
            tag: tag.to_string(),
            name: non_empty(self.name.as_ref()),
            body: self.release_body(),
            append_body: self.append_body,
            draft: self.draft,
            prerelease: self.prerelease,
            target_commitish: non_empty(self.target_commitish.as_ref()),
            discussion_category_name: non_empty(self.discussion_category_name.as_ref()),
            generate_release_notes: self.generate_release_notes,
        })
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

fn env_string(env: EnvLookup<'_>, key: &str) -> Option<String> {
    env(key).filter(|value| !value.is_empty())
}

fn env_bool(env: EnvLookup<'_>, key: &str) -> Option<bool> {
    env_string(env, key).map(|value| {
        matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u32(env: EnvLookup<'_>, key: &str) -> Result<Option<u32>> {
    match env_string(env, key) {
        Some(value) => value.trim().parse::<u32>().map(Some).map_err(|err| {
            ReleaseError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        None => Ok(None),
    }
}

fn env_usize(env: EnvLookup<'_>, key: &str) -> Result<Option<usize>> {
    match env_string(env, key) {
        Some(value) => value.trim().parse::<usize>().map(Some).map_err(|err| {
            ReleaseError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        None => Ok(None),
    }
}
