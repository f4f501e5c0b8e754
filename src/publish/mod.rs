//! Multi-repository release publishing
//!
//! A publish walks the planned repositories in order and runs the fixed step
//! list on each. Before a step starts its name is written to the progress
//! file, and it is removed once the step finishes, so a crashed or failed run
//! restarts exactly at the step that did not complete.

pub mod manifest;
pub mod release;
pub mod runner;
pub mod sequencer;
pub mod step;

pub use runner::RepositoryPublisher;
pub use sequencer::Sequencer;
pub use step::StepId;
