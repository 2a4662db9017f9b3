//! Content-block flattening.
//!
//! Walks a record's block tree depth-first and renders each block into one
//! line of plain text, preserving sibling order. Children are visited after
//! their parent's own line. Each level is paginated; pages are fetched
//! sequentially until the service reports no more.

use tracing::debug;

use crate::error::SourceResult;
use crate::live::client::CollectionClient;
use crate::live::wire::{rich_text_to_string, Block, BlockPayload};
use crate::source::BoxFuture;

/// The separator line a divider block renders to.
const DIVIDER_LINE: &str = "--------------------------";

/// Flattens a block tree into ordered plain-text lines.
pub struct ContentFlattener<'a> {
    client: &'a dyn CollectionClient,
    page_size: usize,
}

impl<'a> ContentFlattener<'a> {
    /// Creates a flattener reading through `client` with the given child
    /// page size.
    pub fn new(client: &'a dyn CollectionClient, page_size: usize) -> Self {
        Self { client, page_size }
    }

    /// Renders the block `root_id` and all of its descendants.
    ///
    /// The root itself is rendered unless it is a child-page block, which
    /// is the usual shape when the root is a record's own body.
    ///
    /// # Errors
    ///
    /// A fetch failure for any block or page aborts the walk; the error
    /// names the failing block id.
    pub async fn flatten(&self, root_id: &str) -> SourceResult<Vec<String>> {
        let block = self
            .client
            .find_block(root_id)
            .await
            .map_err(|e| e.context(format!("failed fetching block {root_id}")))?;

        debug!(block = %root_id, "fetched root block");

        let mut content = Vec::new();
        if !block.is_child_page() {
            content.push(render_block(&block));
        }

        if block.has_children {
            content.extend(self.children_lines(root_id).await?);
        }

        Ok(content)
    }

    /// Renders all children of `parent_id`, recursively, page by page.
    ///
    /// Boxed because async recursion needs a nameable future type.
    fn children_lines<'b>(&'b self, parent_id: &'b str) -> BoxFuture<'b, SourceResult<Vec<String>>> {
        Box::pin(async move {
            let mut content = Vec::new();
            let mut cursor: Option<String> = None;

            loop {
                let page = self
                    .client
                    .find_block_children(parent_id, cursor.as_deref(), self.page_size)
                    .await
                    .map_err(|e| {
                        e.context(format!("failed fetching child blocks for {parent_id}"))
                    })?;

                debug!(
                    parent = %parent_id,
                    count = page.results.len(),
                    has_more = page.has_more,
                    "fetched child blocks"
                );

                for block in &page.results {
                    // Child pages are separate documents, never inlined.
                    if block.is_child_page() {
                        continue;
                    }

                    content.push(render_block(block));

                    if block.has_children {
                        content.extend(self.children_lines(&block.id).await?);
                    }
                }

                if !page.has_more {
                    break;
                }
                cursor = page.next_cursor;
            }

            Ok(content)
        })
    }
}

/// Renders one block into its plain-text line.
///
/// The mapping from block type to text rule is fixed: structural blocks and
/// unrecognized types render empty lines so their position is kept.
pub fn render_block(block: &Block) -> String {
    match &block.payload {
        BlockPayload::Paragraph { rich_text } => rich_text_to_string(rich_text),
        BlockPayload::Heading1 { rich_text } => format!("# {}", rich_text_to_string(rich_text)),
        BlockPayload::Heading2 { rich_text } => format!("## {}", rich_text_to_string(rich_text)),
        BlockPayload::Heading3 { rich_text } => format!("### {}", rich_text_to_string(rich_text)),
        BlockPayload::BulletedListItem { rich_text } => {
            format!("- {}", rich_text_to_string(rich_text))
        }
        BlockPayload::NumberedListItem { rich_text } => {
            format!("* {}", rich_text_to_string(rich_text))
        }
        BlockPayload::ToDo { rich_text, checked } => {
            let marker = if *checked { "[x]" } else { "[ ]" };
            format!("{marker} {}", rich_text_to_string(rich_text))
        }
        BlockPayload::Toggle { rich_text } => format!("^ {}", rich_text_to_string(rich_text)),
        BlockPayload::Callout { rich_text } => format!("! {}", rich_text_to_string(rich_text)),
        BlockPayload::Quote { rich_text } => format!("> {}", rich_text_to_string(rich_text)),
        BlockPayload::Code { rich_text } => {
            format!("```\n{}\n```", rich_text_to_string(rich_text))
        }
        BlockPayload::Equation { expression } => format!("Expression: {expression}"),
        BlockPayload::Template { rich_text } => {
            format!("Template: {}", rich_text_to_string(rich_text))
        }
        BlockPayload::Embed { url } => format!("Embed: {url}"),
        BlockPayload::Bookmark { url } => format!("Bookmark: {url}"),
        BlockPayload::LinkPreview { url } => format!("Preview: {url}"),
        BlockPayload::Image { image } => format!("Image: {}", image.url()),
        BlockPayload::Audio { audio } => format!("Audio: {}", audio.url()),
        BlockPayload::Video { video } => format!("Video: {}", video.url()),
        BlockPayload::File { file } => format!("File: {}", file.url()),
        BlockPayload::Pdf { pdf } => format!("PDF: {}", pdf.url()),
        BlockPayload::LinkToPage { target } => format!("Link: {}", target.id()),
        BlockPayload::Divider => DIVIDER_LINE.to_string(),
        BlockPayload::Table { children } => children
            .iter()
            .map(render_block)
            .collect::<Vec<_>>()
            .join("\n"),
        BlockPayload::TableRow { cells } => cells
            .iter()
            .map(|cell| rich_text_to_string(cell))
            .collect::<Vec<_>>()
            .join(", "),
        BlockPayload::SyncedBlock { children } => children
            .iter()
            .map(render_block)
            .collect::<Vec<_>>()
            .join("\n\n"),
        BlockPayload::TableOfContents
        | BlockPayload::Breadcrumb
        | BlockPayload::ColumnList
        | BlockPayload::Column
        | BlockPayload::ChildPage { .. }
        | BlockPayload::Unsupported => String::new(),
    }
}
