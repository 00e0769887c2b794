use std::collections::HashMap;
use std::sync::Arc;

use futures::future::FutureExt;
use futures::stream::{self, StreamExt};
use leo_core::{cache_key, retry_with_backoff, ttl, CacheManager, Document, RetryPolicy, Value};
use reqwest::Client;

use crate::crawler::{http_client, try_fetch};
use crate::html::html_to_text;
use crate::{IngestionError, RecursiveCharacterTextSplitter};

pub const MAX_CONCURRENT_FETCHES: usize = 8;

/// Fetches pages, extracts their text and splits it into chunks.
pub struct DocumentParser {
    client: Client,
    splitter: RecursiveCharacterTextSplitter,
    cache: Option<Arc<CacheManager>>,
    retry: RetryPolicy,
}

impl DocumentParser {
    pub fn new(splitter: RecursiveCharacterTextSplitter) -> Result<Self, IngestionError> {
        Ok(Self {
            client: http_client()?,
            splitter,
            cache: None,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Backoff for pages that are temporarily unavailable. Defaults to 3
    /// attempts, 4 s to 10 s apart.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn page(&self, url: &str) -> Option<String> {
        let fetched = retry_with_backoff(
            &self.retry,
            || try_fetch(&self.client, url),
            IngestionError::is_transient,
        )
        .await;
        match fetched {
            Ok(html) => Some(html),
            Err(err) => {
                tracing::error!(url, error = %err, "failed to fetch page");
                None
            }
        }
    }

    async fn parse_single_url(&self, url: &str) -> Vec<Document> {
        tracing::info!(url, "parsing and chunking");
        let Some(html) = self.page(url).await else {
            return Vec::new();
        };
        let text = html_to_text(&html).text;
        if text.trim().is_empty() {
            tracing::warn!(url, "no text content found");
            return Vec::new();
        }

        let doc = Document::new(text).with_metadata("source", Value::String(url.to_string()));
        let doc = Document {
            id: url.to_string(),
            ..doc
        };
        let chunks = self.splitter.split_documents(&[doc]);
        tracing::info!(url, chunks = chunks.len(), "created chunks");
        chunks
    }

    /// Chunks of every page in `urls`, in input order. Pages that fail to load
    /// contribute nothing. A URL listed twice is fetched once per call.
    pub async fn parse_and_chunk(&self, urls: &[String]) -> Vec<Document> {
        if urls.is_empty() {
            return Vec::new();
        }

        let key = cache_key("parsed_documents", urls);
        if let Some(cache) = &self.cache {
            if let Some(docs) = cache.get_as::<Vec<Document>>(&key) {
                tracing::info!(chunks = docs.len(), "using cached parsed documents");
                return docs;
            }
        }

        let mut unique: Vec<&str> = Vec::with_capacity(urls.len());
        for url in urls {
            if !unique.contains(&url.as_str()) {
                unique.push(url);
            }
        }

        tracing::info!(count = unique.len(), "starting parallel parsing");
        let parsed: HashMap<&str, Vec<Document>> = stream::iter(unique)
            .map(|url| async move { (url, self.parse_single_url(url).await) })
            .buffered(MAX_CONCURRENT_FETCHES)
            .collect::<HashMap<&str, Vec<Document>>>()
            .boxed()
            .await;
        let chunks: Vec<Document> = urls
            .iter()
            .filter_map(|url| parsed.get(url.as_str()))
            .flatten()
            .cloned()
            .collect();
        tracing::info!(chunks = chunks.len(), "parallel parsing completed");

        if let Some(cache) = &self.cache {
            cache.set_as(key, &chunks, Some(ttl::PARSED_DOCUMENTS));
        }
        chunks
    }
}
