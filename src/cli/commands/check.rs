//! relsync check - Show what a release run would do, without network access

use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::error::Result;
use crate::providers::Platform;
use crate::workflow::{ReleasePlan, plan};

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    platform: Platform,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_url: Option<&'a str>,
    token_set: bool,
    #[serde(flatten)]
    plan: &'a ReleasePlan,
}

pub fn run(ctx: &AppContext) -> Result<()> {
    let plan = plan(&ctx.config)?;
    let report = CheckReport {
        platform: ctx.config.platform,
        api_url: ctx.config.api_url(),
        token_set: ctx
            .config
            .token
            .as_deref()
            .is_some_and(|token| !token.is_empty()),
        plan: &plan,
    };

    if ctx.robot_mode() {
        let mut response = robot_ok(&report);
        response.warnings.clone_from(&plan.warnings);
        emit_json(&response)?;
    } else if !ctx.quiet {
        emit_human(human_layout(&report));
    }
    Ok(())
}

fn human_layout(report: &CheckReport<'_>) -> HumanLayout {
    let desired = &report.plan.desired;
    let mut layout = HumanLayout::new();
    layout
        .title("Release plan")
        .kv("Platform", &report.platform.to_string())
        .kv("API", report.api_url.unwrap_or("(default)"))
        .kv("Token", if report.token_set { "set" } else { "missing" })
        .kv("Repository", &format!("{}/{}", desired.owner, desired.repo))
        .kv("Tag", &desired.tag)
        .kv("Name", desired.name.as_deref().unwrap_or(&desired.tag))
        .kv("Draft", &flag(desired.draft))
        .kv("Prerelease", &flag(desired.prerelease))
        .kv("Append body", if desired.append_body { "yes" } else { "no" });

    let files = &report.plan.files;
    if !files.paths.is_empty() {
        layout.blank().section("Files");
        for path in &files.paths {
            layout.bullet(&path.display().to_string());
        }
    }
    if !report.plan.warnings.is_empty() {
        layout.blank().section("Warnings");
        for warning in &report.plan.warnings {
            layout.bullet(warning);
        }
    }
    layout
}

fn flag(value: Option<bool>) -> String {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => "(unchanged)",
    }
    .to_string()
}
