//! Core building blocks shared by every command
//!
//! - **config**: release.toml parsing and validation
//! - **context**: Config loaded once and the paths derived from it
//! - **error**: Error types with contextual help messages and exit codes
//! - **plan**: The immutable publish plan
//! - **vcs**: Git operations (SystemGit)

pub mod config;
pub mod context;
pub mod error;
pub mod plan;
pub mod vcs;
