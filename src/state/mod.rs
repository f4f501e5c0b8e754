//! Durable progress state for resumable publishing

pub mod fsync;
pub mod store;

pub use store::{COMPLETE_MARKER, ProgressStore};
