//! EventSource trait and implementations (live collection service, snapshot archive)

pub mod error;
pub mod live;
pub mod snapshot;
pub mod source;

pub use error::{SourceError, SourceErrorCode, SourceResult};
pub use live::{CollectionClient, HttpCollectionClient, LiveConfig, LiveSource};
pub use snapshot::{SnapshotConfig, SnapshotSource};
pub use source::{BoxFuture, EventSource};
