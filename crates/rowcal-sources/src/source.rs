//! EventSource trait definition.
//!
//! This module defines [`EventSource`], the capability both acquisition
//! paths (live collection service, archived snapshot) expose to the caller.
//! A driver selects exactly one implementation, calls [`EventSource::read_all`]
//! once, and hands the resulting events plus the name to a serializer.

use std::future::Future;
use std::pin::Pin;

use rowcal_core::Event;

use crate::error::SourceResult;

/// A boxed future for async trait methods.
///
/// Boxing keeps the trait object-safe so callers can hold a
/// `Box<dyn EventSource>` regardless of which origin produced it.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The common capability of every event origin.
///
/// Implementations materialize the whole collection in one pass. There is
/// no partial-result mode: either the full event list is returned, or the
/// first failure aborts the read.
pub trait EventSource: Send + Sync {
    /// Returns a human-readable label for the whole collection, suitable
    /// as a calendar title.
    fn name(&self) -> &str;

    /// Reads the complete, ordered materialization of all events.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::SourceError`] on the first configuration,
    /// connectivity, schema, or parse failure; nothing is retried.
    fn read_all(&self) -> BoxFuture<'_, SourceResult<Vec<Event>>>;
}
