//! Per-invocation context shared by the commands.

use std::path::PathBuf;

use crate::cli::{Cli, OutputFormat};
use crate::config::ReleaseConfig;
use crate::error::Result;

pub struct AppContext {
    /// Defaults, config file, environment, then command-line flags.
    pub config: ReleaseConfig,
    pub output_format: OutputFormat,
    pub quiet: bool,
    /// Step output file (`$GITHUB_OUTPUT`), when the runner provides one.
    pub step_output: Option<PathBuf>,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = ReleaseConfig::load(cli.config.as_deref())?;
        config.merge_patch(cli.command.release_args().to_patch());

        let step_output = std::env::var_os("GITHUB_OUTPUT")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            config,
            output_format: cli.output_format(),
            quiet: cli.quiet,
            step_output,
        })
    }

    #[must_use]
    pub const fn robot_mode(&self) -> bool {
        self.output_format.is_machine_readable()
    }
}
