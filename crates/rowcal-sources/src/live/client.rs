//! Collection service client.
//!
//! [`CollectionClient`] is the seam between the live source and the remote
//! service: four fallible, independently timeout-bounded operations. The
//! shipped implementation is [`HttpCollectionClient`] on reqwest; tests
//! substitute an in-memory fake.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::{SourceError, SourceResult};
use crate::live::config::LiveConfig;
use crate::live::wire::{Block, Collection, Page, Query, QueryFilter, Record};
use crate::source::BoxFuture;

/// The contract the live source consumes from the remote service.
///
/// Every operation is a single bounded network call; pagination is the
/// caller's loop, not the client's.
pub trait CollectionClient: Send + Sync {
    /// Resolves a collection by id, including its title and schema.
    fn find_collection<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SourceResult<Collection>>;

    /// Fetches one page of a collection query.
    fn query_collection<'a>(
        &'a self,
        id: &'a str,
        filter: Option<&'a QueryFilter>,
        cursor: Option<&'a str>,
        page_size: usize,
    ) -> BoxFuture<'a, SourceResult<Page<Record>>>;

    /// Fetches a single block by id.
    fn find_block<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SourceResult<Block>>;

    /// Fetches one page of a block's children.
    fn find_block_children<'a>(
        &'a self,
        parent_id: &'a str,
        cursor: Option<&'a str>,
        page_size: usize,
    ) -> BoxFuture<'a, SourceResult<Page<Block>>>;
}

/// HTTP implementation of [`CollectionClient`].
#[derive(Debug)]
pub struct HttpCollectionClient {
    http_client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl HttpCollectionClient {
    /// Creates a new client from the live configuration.
    ///
    /// The per-request timeout is baked into the underlying HTTP client, so
    /// every call through this client carries its own deadline.
    pub fn new(config: &LiveConfig) -> SourceResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SourceError::network("failed to create HTTP client").with_source(e))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.as_str().trim_end_matches('/').to_string();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, &str)],
    ) -> SourceResult<T> {
        let request = self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(query);

        debug!(url = %url, "GET");
        let response = request.send().await.map_err(map_transport_error)?;
        decode_response(response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: String,
        body: &impl Serialize,
    ) -> SourceResult<T> {
        let request = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body);

        debug!(url = %url, "POST");
        let response = request.send().await.map_err(map_transport_error)?;
        decode_response(response).await
    }
}

fn map_transport_error(e: reqwest::Error) -> SourceError {
    if e.is_timeout() {
        SourceError::network("request timeout")
    } else if e.is_connect() {
        SourceError::network(format!("connection failed: {e}"))
    } else {
        SourceError::network(format!("request failed: {e}"))
    }
}

async fn decode_response<T: DeserializeOwned>(response: reqwest::Response) -> SourceResult<T> {
    let status = response.status();

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(SourceError::not_found("resource not found"));
    }
    if !status.is_success() {
        return Err(SourceError::network(format!("service returned {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| SourceError::network(format!("failed reading response body: {e}")))?;

    serde_json::from_str(&body)
        .map_err(|e| SourceError::invalid_response(format!("failed to decode response: {e}")))
}

impl CollectionClient for HttpCollectionClient {
    fn find_collection<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SourceResult<Collection>> {
        Box::pin(async move {
            let url = self.endpoint(&["collections", id]);
            self.get_json(url, &[]).await
        })
    }

    fn query_collection<'a>(
        &'a self,
        id: &'a str,
        filter: Option<&'a QueryFilter>,
        cursor: Option<&'a str>,
        page_size: usize,
    ) -> BoxFuture<'a, SourceResult<Page<Record>>> {
        Box::pin(async move {
            let url = self.endpoint(&["collections", id, "query"]);
            let query = Query {
                filter: filter.cloned(),
                start_cursor: cursor.map(String::from),
                page_size,
            };
            self.post_json(url, &query).await
        })
    }

    fn find_block<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SourceResult<Block>> {
        Box::pin(async move {
            let url = self.endpoint(&["blocks", id]);
            self.get_json(url, &[]).await
        })
    }

    fn find_block_children<'a>(
        &'a self,
        parent_id: &'a str,
        cursor: Option<&'a str>,
        page_size: usize,
    ) -> BoxFuture<'a, SourceResult<Page<Block>>> {
        Box::pin(async move {
            let url = self.endpoint(&["blocks", parent_id, "children"]);
            let page_size = page_size.to_string();
            let mut query: Vec<(&str, &str)> = vec![("page_size", page_size.as_str())];
            if let Some(cursor) = cursor {
                query.push(("start_cursor", cursor));
            }
            self.get_json(url, &query).await
        })
    }
}
