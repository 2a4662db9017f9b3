//! Event types for calendar events.
//!
//! This module provides the canonical unit both sources produce:
//! - [`Event`]: an origin-agnostic calendar entry
//! - [`Property`]: a rendered `(name, value)` pair from a record field
//!
//! Events are built once per read, are immutable afterwards, and carry no
//! reference back to the connection that produced them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named field of a record, rendered for display.
///
/// Both origins agree on this shape; the rendering rules that produce the
/// `value` string differ per origin and live with the sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// The field's display name.
    pub name: String,
    /// The field's display value. May be empty or span multiple lines.
    pub value: String,
}

impl Property {
    /// Creates a new property.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One calendar entry.
///
/// The `id` is globally unique and deterministic across repeated runs over
/// the same origin data, so regenerated calendars keep stable UIDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Deterministic, globally unique identifier.
    pub id: String,

    /// Display title. Required; a record without one is rejected upstream.
    pub title: String,

    /// Optional decorative emoji from the record's icon.
    pub emoji: Option<String>,

    /// Optional canonical link back to the source record.
    pub url: Option<String>,

    /// When the event starts.
    pub start: DateTime<Utc>,

    /// When the event ends. Always `>= start`; equals `start` when the
    /// origin supplied no end.
    pub end: DateTime<Utc>,

    /// Ordered plain-text lines forming the event body.
    pub content: Vec<String>,

    /// Ordered `(name, value)` pairs of the record's remaining fields.
    /// Ordering is origin-specific and part of the contract: alphabetical
    /// for the live source, original column order for the snapshot source.
    pub properties: Vec<Property>,
}

impl Event {
    /// Creates a new event with the required fields.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            emoji: None,
            url: None,
            start,
            end: end.max(start),
            content: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Builder method to set the emoji.
    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    /// Builder method to set the source URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Builder method to set the content lines.
    pub fn with_content(mut self, content: Vec<String>) -> Self {
        self.content = content;
        self
    }

    /// Builder method to set the properties.
    pub fn with_properties(mut self, properties: Vec<Property>) -> Self {
        self.properties = properties;
        self
    }

    /// Renders the event body for a calendar description field.
    ///
    /// Properties come first, one `Name: value` line each (a multiline value
    /// moves to its own lines below the name), followed by the content lines
    /// separated by blank lines.
    pub fn description(&self) -> String {
        let mut parts = Vec::new();

        for property in &self.properties {
            let mut line = format!("{}:", property.name);
            if property.value.contains('\n') {
                line.push('\n');
            } else {
                line.push(' ');
            }
            line.push_str(&property.value);
            parts.push(line);
            parts.push("\n".to_string());
        }

        for content in &self.content {
            parts.push(content.clone());
            parts.push("\n\n".to_string());
        }

        parts.concat()
    }
}
