//! Live source configuration.

use std::time::Duration;
use url::Url;

/// Configuration for reading from the live collection service.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Base URL of the collection service API.
    pub base_url: Url,

    /// API key used as a bearer token.
    pub api_key: String,

    /// Identifier of the collection to read events from.
    pub collection_id: String,

    /// Display name of the date field to use as the event date. When unset,
    /// the collection must have exactly one date-typed field.
    pub date_field: Option<String>,

    /// Display name of a checkbox field that hides rows when set.
    pub hide_field: Option<String>,

    /// Per-request timeout. Each network call gets its own deadline; a slow
    /// run is never globally time-boxed.
    pub timeout: Duration,
}

impl LiveConfig {
    /// Default per-request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a new live configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid.
    pub fn new(
        base_url: impl AsRef<str>,
        api_key: impl Into<String>,
        collection_id: impl Into<String>,
    ) -> Result<Self, url::ParseError> {
        let parsed = Url::parse(base_url.as_ref())?;
        Ok(Self {
            base_url: parsed,
            api_key: api_key.into(),
            collection_id: collection_id.into(),
            date_field: None,
            hide_field: None,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Sets the date field name.
    #[must_use]
    pub fn with_date_field(mut self, name: impl Into<String>) -> Self {
        self.date_field = Some(name.into());
        self
    }

    /// Sets the hide field name.
    #[must_use]
    pub fn with_hide_field(mut self, name: impl Into<String>) -> Self {
        self.hide_field = Some(name.into());
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = LiveConfig::new("https://api.example.com/v1", "secret", "col-1")
            .unwrap()
            .with_date_field("When")
            .with_hide_field("Hidden")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.collection_id, "col-1");
        assert_eq!(config.date_field.as_deref(), Some("When"));
        assert_eq!(config.hide_field.as_deref(), Some("Hidden"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(LiveConfig::new("not a url", "secret", "col-1").is_err());
    }
}
