//! Core types: events, properties, date-range parsing

pub mod daterange;
pub mod event;
pub mod tracing;

pub use daterange::{parse_date, parse_date_range, DateParseError};
pub use event::{Event, Property};
pub use tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};
