//! Archived snapshot source.
//!
//! Reads a previously exported flat-file snapshot: a zip archive holding a
//! comma-delimited table. Columns are untyped text, so the date and title
//! columns are inferred by synonym and the date cells go through the
//! heuristic range parser. Event ids are content hashes over title and
//! start instant, which keeps regenerated calendars byte-stable.

use std::io::{Read, Seek};

use chrono::{SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, info};
use zip::ZipArchive;

use rowcal_core::{parse_date_range, Event, Property};

use crate::error::{SourceError, SourceResult};
use crate::snapshot::config::SnapshotConfig;
use crate::source::{BoxFuture, EventSource};

/// Origin tag appended to content hashes to form event ids.
const ID_SUFFIX: &str = "@rowcal-snapshot";

/// Recognized extension of the tabular entry inside the archive.
const TABLE_EXTENSION: &str = ".csv";

/// Date column synonyms, in preference order.
const DATE_SYNONYMS: &[&str] = &["date", "when", "period"];

/// Title column synonyms, in preference order.
const TITLE_SYNONYMS: &[&str] = &["name", "title"];

/// An [`EventSource`] reading an exported snapshot archive.
#[derive(Debug)]
pub struct SnapshotSource<R> {
    config: SnapshotConfig,
    archive: Mutex<ZipArchive<R>>,
    entry_name: String,
}

impl<R: Read + Seek> SnapshotSource<R> {
    /// Opens the archive and locates its table entry.
    ///
    /// # Errors
    ///
    /// Fails when the bytes are not a readable archive or when no top-level
    /// `.csv` entry exists.
    pub fn open(config: SnapshotConfig, reader: R) -> SourceResult<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| SourceError::network("unable to open archive").with_source(e))?;

        let entry_name = find_table_entry(&mut archive)?;
        debug!(entry = %entry_name, "located snapshot table");

        Ok(Self {
            config,
            archive: Mutex::new(archive),
            entry_name,
        })
    }

    fn event_from_row(
        &self,
        headers: &[String],
        row: &csv::StringRecord,
        row_number: usize,
    ) -> SourceResult<Event> {
        if headers.len() != row.len() {
            return Err(SourceError::schema(format!(
                "row {row_number} has {} cells for {} headers",
                row.len(),
                headers.len()
            )));
        }
        let cells: Vec<&str> = row.iter().collect();

        let date_index = match self.config.date_column.as_deref() {
            Some(header) => headers.iter().position(|h| h == header).ok_or_else(|| {
                SourceError::configuration(format!(
                    "no date column named {header:?}; available columns: [{}]",
                    headers.join(", ")
                ))
            })?,
            None => find_column(headers, DATE_SYNONYMS).ok_or_else(|| {
                SourceError::configuration(format!(
                    "no date column among [{}]",
                    headers.join(", ")
                ))
            })?,
        };

        let title_index = find_column(headers, TITLE_SYNONYMS).ok_or_else(|| {
            SourceError::configuration(format!(
                "no title column among [{}]",
                headers.join(", ")
            ))
        })?;

        let (start, end) = parse_date_range(cells[date_index], &self.config.zone)?;
        let start = start.with_timezone(&Utc);
        let end = end.with_timezone(&Utc);
        let title = cells[title_index];

        // Original column order, minus the consumed title and date cells.
        let properties = headers
            .iter()
            .zip(&cells)
            .enumerate()
            .filter(|(index, _)| *index != date_index && *index != title_index)
            .map(|(_, (header, cell))| Property::new(header.clone(), *cell))
            .collect();

        // Content-addressed id: the same title and start always hash to the
        // same id, so repeated exports regenerate identical calendar UIDs.
        let mut hasher = Sha256::new();
        hasher.update(title.as_bytes());
        hasher.update(start.to_rfc3339_opts(SecondsFormat::Secs, true).as_bytes());
        let id = format!("{:x}{ID_SUFFIX}", hasher.finalize());

        Ok(Event::new(id, title, start, end).with_properties(properties))
    }
}

impl<R: Read + Seek + Send> EventSource for SnapshotSource<R> {
    fn name(&self) -> &str {
        &self.entry_name
    }

    fn read_all(&self) -> BoxFuture<'_, SourceResult<Vec<Event>>> {
        Box::pin(async move {
            let mut archive = self.archive.lock().await;
            let entry = archive.by_name(&self.entry_name).map_err(|e| {
                SourceError::network(format!("failed to open {}", self.entry_name)).with_source(e)
            })?;

            let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(entry);
            let headers: Vec<String> = reader
                .headers()
                .map_err(|e| SourceError::schema("failed to read table headers").with_source(e))?
                .iter()
                .map(str::to_string)
                .collect();

            let mut events = Vec::new();
            for (index, row) in reader.records().enumerate() {
                let row_number = index + 1;
                let row = row.map_err(|e| {
                    SourceError::schema(format!("failed to read table row {row_number}"))
                        .with_source(e)
                })?;
                events.push(self.event_from_row(&headers, &row, row_number)?);
            }

            info!(
                count = events.len(),
                table = %self.entry_name,
                "read all events from snapshot"
            );
            Ok(events)
        })
    }
}

/// Finds the first top-level entry with the table extension, by archive
/// enumeration order.
fn find_table_entry<R: Read + Seek>(archive: &mut ZipArchive<R>) -> SourceResult<String> {
    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|e| SourceError::network("unable to read archive entry").with_source(e))?;
        let name = entry.name();
        if !name.contains('/') && name.to_ascii_lowercase().ends_with(TABLE_EXTENSION) {
            return Ok(name.to_string());
        }
    }

    Err(SourceError::configuration(format!(
        "no top-level {TABLE_EXTENSION} table found in the archive"
    )))
}

/// Resolves a column by synonym: an exact case-insensitive match anywhere
/// wins over a substring match, and within each pass synonyms are tried in
/// preference order against columns in original order.
fn find_column(headers: &[String], synonyms: &[&str]) -> Option<usize> {
    for synonym in synonyms {
        if let Some(index) = headers
            .iter()
            .position(|header| header.to_lowercase() == *synonym)
        {
            return Some(index);
        }
    }

    for synonym in synonyms {
        if let Some(index) = headers
            .iter()
            .position(|header| header.to_lowercase().contains(synonym))
        {
            return Some(index);
        }
    }

    None
}
