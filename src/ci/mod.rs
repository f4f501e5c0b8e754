//! Remote CI: workflow trigger discovery, the GitHub host and run validation

pub mod github;
pub mod validator;
pub mod workflows;

pub use github::GhCli;
