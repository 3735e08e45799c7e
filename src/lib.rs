pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod files;
pub mod providers;
pub mod release;
pub mod test_utils;
pub mod workflow;

pub use error::{ReleaseError, Result};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
