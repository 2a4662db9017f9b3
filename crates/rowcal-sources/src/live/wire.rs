//! Wire model for the live collection service.
//!
//! Serde types mirroring the service's JSON: collections with a typed
//! schema, records with typed field values, and the block tree forming a
//! record's body. Unknown field or block types deserialize to a catch-all
//! variant instead of failing, so new server-side types degrade to empty
//! output rather than aborting a read.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// One styled run of inline text. Only the plain-text portion is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    /// The text content with styling stripped.
    #[serde(default)]
    pub plain_text: String,
}

/// Flattens rich inline text by concatenating its runs in order.
pub fn rich_text_to_string(runs: &[RichText]) -> String {
    runs.iter().map(|run| run.plain_text.as_str()).collect()
}

/// The type tag of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Title,
    RichText,
    Number,
    Select,
    MultiSelect,
    Status,
    Date,
    Formula,
    Relation,
    Rollup,
    People,
    Files,
    Checkbox,
    Url,
    Email,
    PhoneNumber,
    CreatedTime,
    CreatedBy,
    LastEditedTime,
    LastEditedBy,
    #[serde(other)]
    Unknown,
}

/// One field of a collection's schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// The field's type tag.
    #[serde(rename = "type")]
    pub kind: FieldKind,
}

/// A collection: the structured record set being converted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// The collection's identifier.
    pub id: String,
    /// The collection's rich-text title.
    #[serde(default)]
    pub title: Vec<RichText>,
    /// The collection's schema, keyed by field display name.
    #[serde(default)]
    pub schema: BTreeMap<String, SchemaField>,
}

impl Collection {
    /// Renders the collection title as plain text.
    pub fn display_name(&self) -> String {
        rich_text_to_string(&self.title)
    }
}

/// A selected option of a select/status/multi-select field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// The option's label.
    pub name: String,
}

/// A reference to another record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// The referenced record's identifier.
    pub id: String,
}

/// A person attached to a people or audit field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// The person's display name.
    #[serde(default)]
    pub name: String,
}

/// A typed date value. The service supplies resolved instants directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateValue {
    /// When the range starts.
    pub start: DateTime<FixedOffset>,
    /// When the range ends, if the record has one.
    #[serde(default)]
    pub end: Option<DateTime<FixedOffset>>,
}

/// The resolved scalar of a computed (formula/rollup) field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Number(f64),
    String(String),
    Date(DateValue),
}

/// A reference to an uploaded or externally linked file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileReference {
    /// An internal upload; the service resolves its URL.
    File { file: FileUrl },
    /// An external link.
    External { external: FileUrl },
}

/// The resolved URL of a file reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUrl {
    pub url: String,
}

impl FileReference {
    /// Returns the resolved URL regardless of where the file lives.
    pub fn url(&self) -> &str {
        match self {
            Self::File { file } => &file.url,
            Self::External { external } => &external.url,
        }
    }
}

/// A typed field value of a record.
///
/// Values are origin-nullable throughout: a null inner value renders as an
/// empty string rather than failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldValue {
    Title {
        #[serde(default)]
        title: Vec<RichText>,
    },
    RichText {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    Number {
        #[serde(default)]
        number: Option<f64>,
    },
    Select {
        #[serde(default)]
        select: Option<SelectOption>,
    },
    MultiSelect {
        #[serde(default)]
        multi_select: Vec<SelectOption>,
    },
    Status {
        #[serde(default)]
        status: Option<SelectOption>,
    },
    Date {
        #[serde(default)]
        date: Option<DateValue>,
    },
    Formula {
        #[serde(default)]
        formula: Option<ScalarValue>,
    },
    Relation {
        #[serde(default)]
        relation: Vec<Reference>,
    },
    Rollup {
        #[serde(default)]
        rollup: Option<ScalarValue>,
    },
    People {
        #[serde(default)]
        people: Vec<Person>,
    },
    Files {
        #[serde(default)]
        files: Vec<FileReference>,
    },
    Checkbox {
        #[serde(default)]
        checkbox: Option<bool>,
    },
    Url {
        #[serde(default)]
        url: Option<String>,
    },
    Email {
        #[serde(default)]
        email: Option<String>,
    },
    PhoneNumber {
        #[serde(default)]
        phone_number: Option<String>,
    },
    CreatedTime {
        #[serde(default)]
        created_time: Option<DateTime<Utc>>,
    },
    CreatedBy {
        #[serde(default)]
        created_by: Option<Person>,
    },
    LastEditedTime {
        #[serde(default)]
        last_edited_time: Option<DateTime<Utc>>,
    },
    LastEditedBy {
        #[serde(default)]
        last_edited_by: Option<Person>,
    },
    #[serde(other)]
    Unknown,
}

impl FieldValue {
    /// Returns the value's type tag.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Title { .. } => FieldKind::Title,
            Self::RichText { .. } => FieldKind::RichText,
            Self::Number { .. } => FieldKind::Number,
            Self::Select { .. } => FieldKind::Select,
            Self::MultiSelect { .. } => FieldKind::MultiSelect,
            Self::Status { .. } => FieldKind::Status,
            Self::Date { .. } => FieldKind::Date,
            Self::Formula { .. } => FieldKind::Formula,
            Self::Relation { .. } => FieldKind::Relation,
            Self::Rollup { .. } => FieldKind::Rollup,
            Self::People { .. } => FieldKind::People,
            Self::Files { .. } => FieldKind::Files,
            Self::Checkbox { .. } => FieldKind::Checkbox,
            Self::Url { .. } => FieldKind::Url,
            Self::Email { .. } => FieldKind::Email,
            Self::PhoneNumber { .. } => FieldKind::PhoneNumber,
            Self::CreatedTime { .. } => FieldKind::CreatedTime,
            Self::CreatedBy { .. } => FieldKind::CreatedBy,
            Self::LastEditedTime { .. } => FieldKind::LastEditedTime,
            Self::LastEditedBy { .. } => FieldKind::LastEditedBy,
            Self::Unknown => FieldKind::Unknown,
        }
    }
}

/// The icon attached to a record, when decorative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    /// The emoji form of the icon, if it is one.
    #[serde(default)]
    pub emoji: Option<String>,
}

/// One record (row) of a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// The record's stable identifier.
    pub id: String,
    /// Canonical link back to the record.
    #[serde(default)]
    pub url: Option<String>,
    /// The record's icon, if any.
    #[serde(default)]
    pub icon: Option<Icon>,
    /// The record's field values, keyed by field display name.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

/// The target of a link-to-page block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkTarget {
    Page { page_id: String },
    Database { database_id: String },
}

impl LinkTarget {
    /// Returns the target identifier.
    pub fn id(&self) -> &str {
        match self {
            Self::Page { page_id } => page_id,
            Self::Database { database_id } => database_id,
        }
    }
}

/// The typed payload of a content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockPayload {
    Paragraph {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    #[serde(rename = "heading_1")]
    Heading1 {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    #[serde(rename = "heading_2")]
    Heading2 {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    #[serde(rename = "heading_3")]
    Heading3 {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    BulletedListItem {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    NumberedListItem {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    ToDo {
        #[serde(default)]
        rich_text: Vec<RichText>,
        #[serde(default)]
        checked: bool,
    },
    Toggle {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    Callout {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    Quote {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    Code {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    Equation {
        #[serde(default)]
        expression: String,
    },
    Template {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    Embed {
        url: String,
    },
    Bookmark {
        url: String,
    },
    LinkPreview {
        url: String,
    },
    Image {
        image: FileReference,
    },
    Audio {
        audio: FileReference,
    },
    Video {
        video: FileReference,
    },
    File {
        file: FileReference,
    },
    Pdf {
        pdf: FileReference,
    },
    LinkToPage {
        #[serde(flatten)]
        target: LinkTarget,
    },
    Divider,
    TableOfContents,
    Breadcrumb,
    ColumnList,
    Column,
    Table {
        #[serde(default)]
        children: Vec<Block>,
    },
    TableRow {
        #[serde(default)]
        cells: Vec<Vec<RichText>>,
    },
    SyncedBlock {
        #[serde(default)]
        children: Vec<Block>,
    },
    ChildPage {
        #[serde(default)]
        title: String,
    },
    #[serde(other)]
    Unsupported,
}

/// A node in a record's rich-body document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// The block's identifier.
    pub id: String,
    /// Whether the block has nested children to fetch separately.
    #[serde(default)]
    pub has_children: bool,
    /// The typed payload.
    #[serde(flatten)]
    pub payload: BlockPayload,
}

impl Block {
    /// Returns true for blocks that are not inlined into a parent body.
    pub fn is_child_page(&self) -> bool {
        matches!(self.payload, BlockPayload::ChildPage { .. })
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// The items of this page, in service order.
    pub results: Vec<T>,
    /// Whether more pages follow.
    #[serde(default)]
    pub has_more: bool,
    /// The cursor for the next page, when `has_more` is true.
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A server-side filter for querying a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryFilter {
    /// The display name of the filtered field.
    pub property: String,
    /// The checkbox condition to apply.
    pub checkbox: CheckboxCondition,
}

/// A checkbox condition of a query filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckboxCondition {
    pub does_not_equal: bool,
}

impl QueryFilter {
    /// Builds a filter keeping rows whose checkbox field is not `value`.
    pub fn checkbox_not(property: impl Into<String>, value: bool) -> Self {
        Self {
            property: property.into(),
            checkbox: CheckboxCondition {
                does_not_equal: value,
            },
        }
    }
}

/// The body of a collection query request.
#[derive(Debug, Clone, Serialize)]
pub struct Query {
    /// Optional server-side filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<QueryFilter>,
    /// Cursor from the previous page, when resuming.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
    /// Fixed page size.
    pub page_size: usize,
}
