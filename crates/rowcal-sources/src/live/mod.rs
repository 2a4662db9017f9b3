//! Live collection-service source.
//!
//! Discovers the collection schema, queries records page by page with an
//! optional server-side hide filter, and assembles events with bodies
//! flattened from each record's block tree.

mod blocks;
mod client;
mod config;
mod property;
mod source;
pub mod wire;

pub use blocks::{render_block, ContentFlattener};
pub use client::{CollectionClient, HttpCollectionClient};
pub use config::LiveConfig;
pub use property::{render_property, render_value};
pub use source::LiveSource;
