//! CLI command implementations
//!
//! Each subcommand has its own module with a `run()` function. Both
//! commands share [`release::ReleaseArgs`].

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;

pub mod check;
pub mod release;

pub async fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Release(_) => release::run(ctx).await,
        Commands::Check(_) => check::run(ctx),
    }
}
