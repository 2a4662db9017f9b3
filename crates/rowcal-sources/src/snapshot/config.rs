//! Snapshot source configuration.

use chrono_tz::Tz;

/// Configuration for reading from an exported snapshot archive.
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Time zone used to interpret the snapshot's human-formatted dates.
    /// The caller supplies a resolved zone.
    pub zone: Tz,

    /// Header of the date column to use as the event date. When unset, the
    /// column is found by synonym (`date`, `when`, `period`).
    pub date_column: Option<String>,
}

impl SnapshotConfig {
    /// Creates a new snapshot configuration for the given zone.
    pub fn new(zone: Tz) -> Self {
        Self {
            zone,
            date_column: None,
        }
    }

    /// Sets the date column header.
    #[must_use]
    pub fn with_date_column(mut self, header: impl Into<String>) -> Self {
        self.date_column = Some(header.into());
        self
    }
}
