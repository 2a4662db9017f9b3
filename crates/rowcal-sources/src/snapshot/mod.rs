//! Archived snapshot source.

mod config;
mod source;

pub use config::SnapshotConfig;
pub use source::SnapshotSource;
