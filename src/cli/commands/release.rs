//! relsync release - Create or update a release and upload its files

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;

use crate::app::AppContext;
use crate::cli::output::{
    HumanLayout, RobotStatus, emit_human, emit_json, robot_ok, write_step_outputs,
};
use crate::config::ConfigPatch;
use crate::error::Result;
use crate::providers::{Platform, backend_for};
use crate::workflow::{ReleaseOutcome, run_release};

/// Release settings. Anything left out falls back to the config file and
/// the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct ReleaseArgs {
    /// Hosting platform
    #[arg(long, value_enum)]
    pub platform: Option<Platform>,

    /// API root (GitHub API URL, or Gitea server URL)
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Access token (default: $INPUT_TOKEN, then $GITHUB_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Repository as owner/name (default: $GITHUB_REPOSITORY)
    #[arg(long, value_name = "OWNER/NAME")]
    pub repository: Option<String>,

    /// Git ref the run is for (default: $GITHUB_REF)
    #[arg(long = "ref", value_name = "REF")]
    pub git_ref: Option<String>,

    /// Tag name; defaults to the tag the ref points at
    #[arg(long)]
    pub tag_name: Option<String>,

    /// Release name; defaults to the tag
    #[arg(long)]
    pub name: Option<String>,

    /// Release notes
    #[arg(long)]
    pub body: Option<String>,

    /// Read release notes from a file (wins over --body when non-empty)
    #[arg(long, value_name = "PATH")]
    pub body_path: Option<PathBuf>,

    /// Append the notes to the existing body instead of replacing it
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub append_body: Option<bool>,

    /// Mark the release as a draft
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub draft: Option<bool>,

    /// Mark the release as a prerelease
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub prerelease: Option<bool>,

    /// Commitish the tag is created from when it does not exist yet
    #[arg(long, value_name = "COMMITISH")]
    pub target_commitish: Option<String>,

    /// Start a discussion in this category (GitHub only)
    #[arg(long, value_name = "CATEGORY")]
    pub discussion_category_name: Option<String>,

    /// Let the provider generate notes for new releases (GitHub only)
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub generate_release_notes: Option<bool>,

    /// Files to upload: glob patterns, repeated or comma-separated
    #[arg(long, short = 'f', value_delimiter = ',', value_name = "PATTERN")]
    pub files: Vec<String>,

    /// Fail when a file pattern matches nothing
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub fail_on_unmatched_files: Option<bool>,

    /// How many times to try creating the release
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Maximum concurrent asset uploads
    #[arg(long, value_name = "N")]
    pub upload_concurrency: Option<usize>,
}

impl ReleaseArgs {
    /// Command-line values as a config layer.
    #[must_use]
    pub fn to_patch(&self) -> ConfigPatch {
        let files: Vec<String> = self
            .files
            .iter()
            .map(|pattern| pattern.trim())
            .filter(|pattern| !pattern.is_empty())
            .map(str::to_string)
            .collect();

        ConfigPatch {
            platform: self.platform,
            api_url: self.api_url.clone(),
            url: None,
            token: self.token.clone(),
            repository: self.repository.clone(),
            git_ref: self.git_ref.clone(),
            tag_name: self.tag_name.clone(),
            name: self.name.clone(),
            body: self.body.clone(),
            body_path: self.body_path.clone(),
            append_body: self.append_body,
            draft: self.draft,
            prerelease: self.prerelease,
            target_commitish: self.target_commitish.clone(),
            discussion_category_name: self.discussion_category_name.clone(),
            generate_release_notes: self.generate_release_notes,
            files: (!files.is_empty()).then_some(files),
            fail_on_unmatched_files: self.fail_on_unmatched_files,
            max_retries: self.max_retries,
            upload_concurrency: self.upload_concurrency,
        }
    }
}

pub async fn run(ctx: &AppContext) -> Result<()> {
    let backend = backend_for(&ctx.config)?;
    let outcome = run_release(&ctx.config, backend.as_ref()).await?;

    if let Some(path) = ctx.step_output.as_deref() {
        write_outputs(path, &outcome)?;
    }

    if ctx.robot_mode() {
        let mut response = robot_ok(outcome.summary());
        if let Some(report) = outcome.assets.as_ref().filter(|r| !r.is_complete()) {
            response.status = RobotStatus::Partial {
                completed: report.uploaded.len(),
                failed: report.failed.len(),
            };
        }
        response.warnings.clone_from(&outcome.warnings);
        emit_json(&response)?;
    } else if !ctx.quiet {
        emit_human(human_layout(&outcome));
    }

    outcome.ensure_complete()
}

fn write_outputs(path: &Path, outcome: &ReleaseOutcome) -> Result<()> {
    let mut outputs = vec![
        ("url", outcome.release.html_url.clone()),
        ("id", outcome.release.id.to_string()),
        ("upload_url", outcome.release.upload_url.clone()),
    ];
    if let Some(report) = &outcome.assets {
        outputs.push(("assets", serde_json::to_string(&report.uploaded)?));
    }
    write_step_outputs(path, &outputs)
}

fn human_layout(outcome: &ReleaseOutcome) -> HumanLayout {
    let mut layout = HumanLayout::new();
    let title = format!("Release {} {}", outcome.release.tag_name, outcome.action);
    layout
        .title(&title)
        .kv("URL", &outcome.release.html_url)
        .kv("ID", &outcome.release.id.to_string());
    if outcome.release.draft {
        layout.kv("Draft", "yes");
    }
    if outcome.retries > 0 {
        layout.kv("Retries", &outcome.retries.to_string());
    }

    if let Some(report) = &outcome.assets {
        layout.blank().section("Assets");
        for asset in &report.uploaded {
            layout.bullet(&format!(
                "{} {} ({} bytes)",
                style("✓").green(),
                asset.name,
                asset.size
            ));
        }
        for failure in &report.failed {
            layout.bullet(&format!(
                "{} {}: {}",
                style("✗").red(),
                failure.path,
                failure.error.message
            ));
        }
    }

    if !outcome.warnings.is_empty() {
        layout.blank().section("Warnings");
        for warning in &outcome.warnings {
            layout.bullet(warning);
        }
    }
    layout
}
