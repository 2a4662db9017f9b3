//! Live collection-service source.
//!
//! Resolves the target collection and its schema once at construction, then
//! materializes every record into an [`Event`] on demand: title from the
//! title field, timing from the resolved date field, remaining fields as
//! alphabetically ordered properties, body from the record's block tree.

use chrono::Utc;
use tracing::{debug, info};

use rowcal_core::Event;

use crate::error::{SourceError, SourceResult};
use crate::live::blocks::ContentFlattener;
use crate::live::client::{CollectionClient, HttpCollectionClient};
use crate::live::config::LiveConfig;
use crate::live::property::render_property;
use crate::live::wire::{
    rich_text_to_string, Collection, FieldKind, FieldValue, QueryFilter, Record,
};
use crate::source::{BoxFuture, EventSource};

/// Fixed page size for record and block-children queries.
const PAGE_SIZE: usize = 100;

/// Origin tag appended to record ids to form event ids.
const ID_SUFFIX: &str = "@rowcal";

/// An [`EventSource`] reading a live collection over the service API.
pub struct LiveSource {
    client: Box<dyn CollectionClient>,
    collection: Collection,
    name: String,
    date_field: String,
    hide_field: Option<String>,
}

impl std::fmt::Debug for LiveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSource")
            .field("collection", &self.collection)
            .field("name", &self.name)
            .field("date_field", &self.date_field)
            .field("hide_field", &self.hide_field)
            .finish_non_exhaustive()
    }
}

impl LiveSource {
    /// Connects to the service and resolves the configured collection.
    ///
    /// # Errors
    ///
    /// Fails when the collection does not exist, when the date field is
    /// absent or ambiguous, or when a configured hide field does not match
    /// exactly one checkbox field.
    pub async fn connect(config: LiveConfig) -> SourceResult<Self> {
        let client = HttpCollectionClient::new(&config)?;
        Self::with_client(config, Box::new(client)).await
    }

    /// Like [`LiveSource::connect`], but over a caller-supplied client.
    pub async fn with_client(
        config: LiveConfig,
        client: Box<dyn CollectionClient>,
    ) -> SourceResult<Self> {
        let collection = client.find_collection(&config.collection_id).await?;

        let date_field = resolve_schema_field(
            &collection,
            FieldKind::Date,
            config.date_field.as_deref(),
            "date",
        )?;

        let hide_field = match config.hide_field.as_deref() {
            Some(name) => Some(resolve_schema_field(
                &collection,
                FieldKind::Checkbox,
                Some(name),
                "hide",
            )?),
            None => None,
        };

        let name = collection.display_name();
        info!(
            collection = %collection.id,
            date_field = %date_field,
            "resolved collection schema"
        );

        Ok(Self {
            client,
            collection,
            name,
            date_field,
            hide_field,
        })
    }

    async fn event_from_record(&self, record: &Record) -> SourceResult<Event> {
        let mut title = None;
        let mut date = None;
        let mut properties = Vec::new();

        for (name, value) in &record.fields {
            match value {
                FieldValue::Title { title: runs } => {
                    title = Some(rich_text_to_string(runs));
                    continue;
                }
                FieldValue::Date { date: value } if name == &self.date_field => {
                    date = value.clone();
                    continue;
                }
                // Relations carry no useful text, only foreign ids.
                FieldValue::Relation { .. } => continue,
                _ => {}
            }
            properties.push(render_property(name, value));
        }

        let title = title.ok_or_else(|| {
            SourceError::configuration(format!("record {} has no title field", record.id))
        })?;
        let date = date.ok_or_else(|| {
            SourceError::schema(format!(
                "record {} has no value in date field {:?}",
                record.id, self.date_field
            ))
        })?;

        let start = date.start.with_timezone(&Utc);
        let end = date
            .end
            .map(|end| end.with_timezone(&Utc))
            .unwrap_or(start);

        // Property order is alphabetical by display name.
        properties.sort_by(|a, b| a.name.cmp(&b.name));

        // A record's body is itself a block tree rooted at the record id.
        let content = ContentFlattener::new(self.client.as_ref(), PAGE_SIZE)
            .flatten(&record.id)
            .await?;

        let mut event = Event::new(format!("{}{ID_SUFFIX}", record.id), title, start, end)
            .with_content(content)
            .with_properties(properties);

        if let Some(emoji) = record.icon.as_ref().and_then(|icon| icon.emoji.clone()) {
            event = event.with_emoji(emoji);
        }
        if let Some(url) = record.url.clone() {
            event = event.with_url(url);
        }

        Ok(event)
    }
}

impl EventSource for LiveSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_all(&self) -> BoxFuture<'_, SourceResult<Vec<Event>>> {
        Box::pin(async move {
            let filter = self
                .hide_field
                .as_ref()
                .map(|field| QueryFilter::checkbox_not(field.clone(), true));

            let mut events = Vec::new();
            let mut cursor: Option<String> = None;

            loop {
                let page = self
                    .client
                    .query_collection(
                        &self.collection.id,
                        filter.as_ref(),
                        cursor.as_deref(),
                        PAGE_SIZE,
                    )
                    .await?;

                debug!(
                    count = page.results.len(),
                    has_more = page.has_more,
                    "fetched record page"
                );

                for record in &page.results {
                    events.push(self.event_from_record(record).await?);
                }

                if !page.has_more {
                    break;
                }
                cursor = match page.next_cursor {
                    Some(next) => Some(next),
                    None => {
                        return Err(SourceError::invalid_response(
                            "service reported more pages without a cursor",
                        ));
                    }
                };
            }

            info!(count = events.len(), "read all events from collection");
            Ok(events)
        })
    }
}

/// Resolves the schema field to use for `role` (date timing or hide flag).
///
/// With a configured name, exactly one field of the wanted type must carry
/// that exact name; without one, exactly one field of the wanted type must
/// exist at all. Anything else is a configuration error naming the
/// available fields.
fn resolve_schema_field(
    collection: &Collection,
    kind: FieldKind,
    name: Option<&str>,
    role: &str,
) -> SourceResult<String> {
    let matches: Vec<&str> = collection
        .schema
        .iter()
        .filter(|(field_name, field)| {
            field.kind == kind && name.is_none_or(|n| n == field_name.as_str())
        })
        .map(|(field_name, _)| field_name.as_str())
        .collect();

    if let [only] = matches.as_slice() {
        return Ok((*only).to_string());
    }

    let available = collection
        .schema
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let wanted = match name {
        Some(name) => format!("named {name:?}"),
        None => "in the schema".to_string(),
    };
    if matches.is_empty() {
        Err(SourceError::configuration(format!(
            "no {role} field {wanted}; available fields: [{available}]"
        )))
    } else {
        Err(SourceError::configuration(format!(
            "ambiguous {role} field: {} candidates {wanted}; available fields: [{available}]",
            matches.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use crate::error::SourceErrorCode;
    use crate::live::wire::{Block, Page};

    /// In-memory stand-in for the remote service.
    struct FakeClient {
        collection: Collection,
        record_pages: Vec<Page<Record>>,
        blocks: HashMap<String, Block>,
        children: HashMap<String, Vec<Vec<Block>>>,
        seen_filters: Arc<Mutex<Vec<Option<QueryFilter>>>>,
    }

    impl FakeClient {
        fn new(collection: serde_json::Value) -> Self {
            Self {
                collection: serde_json::from_value(collection).unwrap(),
                record_pages: Vec::new(),
                blocks: HashMap::new(),
                children: HashMap::new(),
                seen_filters: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn with_records(mut self, records: Vec<serde_json::Value>) -> Self {
            let records: Vec<Record> = records
                .into_iter()
                .map(|r| serde_json::from_value(r).unwrap())
                .collect();
            self.record_pages = vec![Page {
                results: records,
                has_more: false,
                next_cursor: None,
            }];
            self
        }

        fn with_record_pages(mut self, pages: Vec<Vec<serde_json::Value>>) -> Self {
            let last = pages.len().saturating_sub(1);
            self.record_pages = pages
                .into_iter()
                .enumerate()
                .map(|(i, records)| Page {
                    results: records
                        .into_iter()
                        .map(|r| serde_json::from_value(r).unwrap())
                        .collect(),
                    has_more: i < last,
                    next_cursor: (i < last).then(|| (i + 1).to_string()),
                })
                .collect();
            self
        }

        fn with_block(mut self, block: serde_json::Value) -> Self {
            let block: Block = serde_json::from_value(block).unwrap();
            self.blocks.insert(block.id.clone(), block);
            self
        }

        fn with_children(self, parent: &str, children: Vec<serde_json::Value>) -> Self {
            self.with_children_pages(parent, vec![children])
        }

        fn with_children_pages(
            mut self,
            parent: &str,
            pages: Vec<Vec<serde_json::Value>>,
        ) -> Self {
            let pages = pages
                .into_iter()
                .map(|blocks| {
                    blocks
                        .into_iter()
                        .map(|b| serde_json::from_value(b).unwrap())
                        .collect()
                })
                .collect();
            self.children.insert(parent.to_string(), pages);
            self
        }
    }

    impl CollectionClient for FakeClient {
        fn find_collection<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SourceResult<Collection>> {
            Box::pin(async move {
                if id == self.collection.id {
                    Ok(self.collection.clone())
                } else {
                    Err(SourceError::not_found(format!("collection {id} not found")))
                }
            })
        }

        fn query_collection<'a>(
            &'a self,
            _id: &'a str,
            filter: Option<&'a QueryFilter>,
            cursor: Option<&'a str>,
            _page_size: usize,
        ) -> BoxFuture<'a, SourceResult<Page<Record>>> {
            Box::pin(async move {
                self.seen_filters.lock().unwrap().push(filter.cloned());
                let index: usize = cursor.map_or(0, |c| c.parse().unwrap());
                Ok(self.record_pages[index].clone())
            })
        }

        fn find_block<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SourceResult<Block>> {
            Box::pin(async move {
                self.blocks
                    .get(id)
                    .cloned()
                    .ok_or_else(|| SourceError::not_found(format!("block {id} not found")))
            })
        }

        fn find_block_children<'a>(
            &'a self,
            parent_id: &'a str,
            cursor: Option<&'a str>,
            _page_size: usize,
        ) -> BoxFuture<'a, SourceResult<Page<Block>>> {
            Box::pin(async move {
                let pages = self.children.get(parent_id).cloned().unwrap_or_default();
                let index: usize = cursor.map_or(0, |c| c.parse().unwrap());
                let more = index + 1 < pages.len();
                Ok(Page {
                    results: pages.into_iter().nth(index).unwrap_or_default(),
                    has_more: more,
                    next_cursor: more.then(|| (index + 1).to_string()),
                })
            })
        }
    }

    fn schema() -> serde_json::Value {
        json!({
            "id": "col-1",
            "title": [{"plain_text": "Team Events"}],
            "schema": {
                "Name": {"type": "title"},
                "When": {"type": "date"},
                "Hidden": {"type": "checkbox"},
                "Alpha": {"type": "rich_text"},
                "Zebra": {"type": "rich_text"},
                "Partner": {"type": "relation"}
            }
        })
    }

    fn record() -> serde_json::Value {
        json!({
            "id": "rec-1",
            "url": "https://rows.example.com/rec-1",
            "icon": {"emoji": "🎉"},
            "fields": {
                "Name": {"type": "title", "title": [{"plain_text": "Launch"}]},
                "When": {"type": "date", "date": {
                    "start": "2023-01-02T15:00:00+00:00",
                    "end": "2023-01-02T17:00:00+00:00"
                }},
                "Zebra": {"type": "rich_text", "rich_text": [{"plain_text": "last"}]},
                "Alpha": {"type": "rich_text", "rich_text": [{"plain_text": "first"}]},
                "Partner": {"type": "relation", "relation": [{"id": "r-9"}]}
            }
        })
    }

    fn leaf_page_block(id: &str) -> serde_json::Value {
        json!({"id": id, "type": "child_page", "title": "body", "has_children": false})
    }

    fn config() -> LiveConfig {
        LiveConfig::new("https://api.example.com/v1", "secret", "col-1").unwrap()
    }

    async fn source_with(client: FakeClient, config: LiveConfig) -> SourceResult<LiveSource> {
        LiveSource::with_client(config, Box::new(client)).await
    }

    #[tokio::test]
    async fn resolves_collection_name() {
        let client = FakeClient::new(schema()).with_records(vec![]);
        let source = source_with(client, config()).await.unwrap();
        assert_eq!(source.name(), "Team Events");
    }

    #[tokio::test]
    async fn builds_event_from_record() {
        let client = FakeClient::new(schema())
            .with_records(vec![record()])
            .with_block(leaf_page_block("rec-1"));
        let source = source_with(client, config()).await.unwrap();

        let events = source.read_all().await.unwrap();
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert_eq!(event.id, "rec-1@rowcal");
        assert_eq!(event.title, "Launch");
        assert_eq!(event.emoji.as_deref(), Some("🎉"));
        assert_eq!(event.url.as_deref(), Some("https://rows.example.com/rec-1"));
        assert_eq!(event.start.to_rfc3339(), "2023-01-02T15:00:00+00:00");
        assert_eq!(event.end.to_rfc3339(), "2023-01-02T17:00:00+00:00");

        // Title, date, and relation fields are consumed or dropped; the
        // rest sorts alphabetically by display name.
        let names: Vec<&str> = event.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zebra"]);
        assert_eq!(event.properties[0].value, "first");
    }

    #[tokio::test]
    async fn flattens_record_body_depth_first() {
        let client = FakeClient::new(schema())
            .with_records(vec![record()])
            .with_block(json!({
                "id": "rec-1", "type": "child_page", "title": "body", "has_children": true
            }))
            .with_children(
                "rec-1",
                vec![json!({
                    "id": "h-1", "type": "heading_1", "has_children": true,
                    "rich_text": [{"plain_text": "Intro"}]
                })],
            )
            .with_children(
                "h-1",
                vec![
                    json!({"id": "p-1", "type": "paragraph",
                           "rich_text": [{"plain_text": "hi"}]}),
                    json!({"id": "l-1", "type": "bulleted_list_item",
                           "rich_text": [{"plain_text": "a"}]}),
                    json!({"id": "l-2", "type": "bulleted_list_item",
                           "rich_text": [{"plain_text": "b"}]}),
                ],
            );
        let source = source_with(client, config()).await.unwrap();

        let events = source.read_all().await.unwrap();
        assert_eq!(events[0].content, vec!["# Intro", "hi", "- a", "- b"]);
    }

    #[tokio::test]
    async fn skips_child_page_blocks_in_body() {
        let client = FakeClient::new(schema())
            .with_records(vec![record()])
            .with_block(json!({
                "id": "rec-1", "type": "child_page", "title": "body", "has_children": true
            }))
            .with_children(
                "rec-1",
                vec![
                    json!({"id": "p-1", "type": "paragraph",
                           "rich_text": [{"plain_text": "kept"}]}),
                    json!({"id": "sub", "type": "child_page", "title": "nested",
                           "has_children": true}),
                ],
            );
        let source = source_with(client, config()).await.unwrap();

        let events = source.read_all().await.unwrap();
        assert_eq!(events[0].content, vec!["kept"]);
    }

    #[tokio::test]
    async fn paginates_records_in_order() {
        let mut second = record();
        second["id"] = json!("rec-2");
        let client = FakeClient::new(schema())
            .with_record_pages(vec![vec![record()], vec![second]])
            .with_block(leaf_page_block("rec-1"))
            .with_block(leaf_page_block("rec-2"));
        let source = source_with(client, config()).await.unwrap();

        let events = source.read_all().await.unwrap();
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["rec-1@rowcal", "rec-2@rowcal"]);
    }

    #[tokio::test]
    async fn paginates_block_children_in_order() {
        let client = FakeClient::new(schema())
            .with_records(vec![record()])
            .with_block(json!({
                "id": "rec-1", "type": "child_page", "title": "body", "has_children": true
            }))
            .with_children_pages(
                "rec-1",
                vec![
                    vec![
                        json!({"id": "p-1", "type": "paragraph",
                               "rich_text": [{"plain_text": "one"}]}),
                        json!({"id": "h-1", "type": "heading_1", "has_children": true,
                               "rich_text": [{"plain_text": "Two"}]}),
                    ],
                    vec![json!({"id": "p-2", "type": "paragraph",
                                "rich_text": [{"plain_text": "three"}]})],
                ],
            )
            .with_children(
                "h-1",
                vec![json!({"id": "p-n", "type": "paragraph",
                            "rich_text": [{"plain_text": "nested"}]})],
            );
        let source = source_with(client, config()).await.unwrap();

        // The nested child renders before the second page is fetched.
        let events = source.read_all().await.unwrap();
        assert_eq!(events[0].content, vec!["one", "# Two", "nested", "three"]);
    }

    #[tokio::test]
    async fn ambiguous_date_field_is_configuration_error() {
        let collection = json!({
            "id": "col-1",
            "title": [],
            "schema": {
                "Name": {"type": "title"},
                "Starts": {"type": "date"},
                "Ends": {"type": "date"}
            }
        });
        let err = source_with(FakeClient::new(collection), config())
            .await
            .unwrap_err();

        assert_eq!(err.code(), SourceErrorCode::ConfigurationError);
        assert!(err.message().contains("Starts"));
        assert!(err.message().contains("Ends"));
    }

    #[tokio::test]
    async fn named_date_field_disambiguates() {
        let collection = json!({
            "id": "col-1",
            "title": [],
            "schema": {
                "Name": {"type": "title"},
                "Starts": {"type": "date"},
                "Ends": {"type": "date"}
            }
        });
        let client = FakeClient::new(collection).with_records(vec![]);
        let source = source_with(client, config().with_date_field("Starts"))
            .await
            .unwrap();
        assert_eq!(source.date_field, "Starts");
    }

    #[tokio::test]
    async fn missing_named_hide_field_is_configuration_error() {
        let client = FakeClient::new(schema());
        let err = source_with(client, config().with_hide_field("Archived"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), SourceErrorCode::ConfigurationError);
        assert!(err.message().contains("Archived"));
        assert!(err.message().contains("Hidden"));
    }

    #[tokio::test]
    async fn hide_field_becomes_server_side_filter() {
        let client = FakeClient::new(schema()).with_records(vec![]);
        let filters = client.seen_filters.clone();
        let source = source_with(client, config().with_hide_field("Hidden"))
            .await
            .unwrap();

        source.read_all().await.unwrap();

        assert_eq!(
            filters.lock().unwrap().as_slice(),
            &[Some(QueryFilter::checkbox_not("Hidden", true))]
        );
    }

    #[tokio::test]
    async fn null_date_value_is_schema_error() {
        let mut bad = record();
        bad["fields"]["When"] = json!({"type": "date", "date": null});
        let client = FakeClient::new(schema())
            .with_records(vec![bad])
            .with_block(leaf_page_block("rec-1"));
        let source = source_with(client, config()).await.unwrap();

        let err = source.read_all().await.unwrap_err();
        assert_eq!(err.code(), SourceErrorCode::SchemaError);
        assert!(err.message().contains("rec-1"));
        assert!(err.message().contains("When"));
    }

    #[tokio::test]
    async fn more_pages_without_cursor_is_invalid_response() {
        let mut client = FakeClient::new(schema()).with_records(vec![]);
        client.record_pages[0].has_more = true;
        let source = source_with(client, config()).await.unwrap();

        let err = source.read_all().await.unwrap_err();
        assert_eq!(err.code(), SourceErrorCode::InvalidResponse);
    }
}
