//! The feed aggregation engine.
//!
//! Merges persisted and synthetic posts into a single bounded, ordered
//! snapshot, keeps it fresh with periodic injections and exposes the viewer
//! mutations (likes, comments, edits, deletes) on top of it.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod merge;
pub mod reaction;
pub mod scheduler;
pub mod signal;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use config::FeedConfig;
pub use engine::{FeedEngine, LoadReport};
pub use error::FeedError;
pub use scheduler::InjectionScheduler;
pub use signal::FeedSignal;
pub use source::{PersistedSource, SourceError, SyntheticSource};
