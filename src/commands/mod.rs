//! CLI commands for release-rail
//!
//! - **publish**: run (or resume) the release across every configured repository
//! - **status**: show where each repository stands in the current run
//! - **reset**: drop progress markers after manual recovery
//! - **steps**: list the fixed step order
//!
//! Commands that read `release.toml` take a `&PublishContext` built once in main.rs.

pub mod publish;
pub mod reset;
pub mod status;
pub mod steps;

pub use publish::run_publish;
pub use reset::run_reset;
pub use status::run_status;
pub use steps::run_steps;
