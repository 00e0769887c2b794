//! `POST /api/ingest`: researches a topic, prepares Leo's first message and
//! indexes any supplied page or file.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use leo_core::Document;
use leo_retrieval::{SimpleCrawler, DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES};
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IngestResponse {
    pub topic: String,
    pub prompt: String,
    pub key_concepts: Vec<String>,
    pub concept_explanations: BTreeMap<String, String>,
    pub learning_suggestions: Vec<String>,
    pub concept_summary: String,
    pub leo_first_message: String,
    pub pages_crawled: usize,
    pub chunks_indexed: usize,
    pub namespace: String,
}

#[derive(Default)]
struct IngestForm {
    topic: Option<String>,
    prompt: Option<String>,
    url: Option<String>,
    file: Option<(String, Vec<u8>)>,
}

async fn read_form(mut multipart: Multipart) -> Result<IngestForm, ApiError> {
    let mut form = IngestForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "topic" => form.topic = Some(field.text().await?),
            "prompt" => form.prompt = Some(field.text().await?),
            "url" => {
                let url = field.text().await?;
                form.url = Some(url).filter(|url| !url.trim().is_empty());
            }
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    form.file = Some((filename, bytes.to_vec()));
                }
            }
            other => tracing::debug!(field = other, "ignoring multipart field"),
        }
    }
    Ok(form)
}

async fn parse_file(state: &AppState, file: Option<(String, Vec<u8>)>) -> Vec<Document> {
    let Some((filename, bytes)) = file else {
        return Vec::new();
    };
    let parser = state.file_parser.clone();
    let name = filename.clone();
    match tokio::task::spawn_blocking(move || parser.parse_upload(&name, &bytes)).await {
        Ok(chunks) => {
            tracing::info!(filename = %filename, chunks = chunks.len(), "parsed uploaded file");
            chunks
        }
        Err(err) => {
            tracing::error!(filename = %filename, error = %err, "file parsing task failed");
            Vec::new()
        }
    }
}

/// Crawls from `url` and chunks every page found. Returns the page count and chunks.
async fn crawl(state: &AppState, url: &str) -> (usize, Vec<Document>) {
    let crawler = match SimpleCrawler::new(DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES) {
        Ok(crawler) => crawler.with_cache(Arc::clone(&state.cache)),
        Err(err) => {
            tracing::error!(error = %err, "failed to build crawler");
            return (0, Vec::new());
        }
    };
    let urls = match crawler.crawl(url).await {
        Ok(urls) => urls,
        Err(err) => {
            tracing::warn!(url, error = %err, "crawl failed");
            return (0, Vec::new());
        }
    };
    let chunks = state.page_parser.parse_and_chunk(&urls).await;
    tracing::info!(url, pages = urls.len(), chunks = chunks.len(), "crawled site");
    (urls.len(), chunks)
}

async fn index_chunks(state: &AppState, chunks: &[Document]) -> usize {
    if chunks.is_empty() {
        return 0;
    }
    let Some(index) = &state.index else {
        tracing::warn!(chunks = chunks.len(), "no document index configured; chunks not stored");
        return 0;
    };
    match index.index(chunks, &state.settings.pinecone_namespace).await {
        Ok(count) => count,
        Err(err) => {
            tracing::error!(error = %err, "failed to index chunks");
            0
        }
    }
}

pub async fn ingest(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<IngestResponse>, ApiError> {
    let form = read_form(multipart).await?;
    let topic = form.topic.ok_or(ApiError::MissingField("topic"))?;
    let prompt = form.prompt.ok_or(ApiError::MissingField("prompt"))?;
    tracing::info!(topic = %topic, url = ?form.url, has_file = form.file.is_some(), "ingest request");

    let research = async {
        match state.research.key_concepts(&topic, &prompt).await {
            Ok(concepts) => concepts,
            Err(err) => {
                tracing::warn!(error = %err, "key concept research failed");
                Vec::new()
            }
        }
    };
    let (key_concepts, file_chunks) = tokio::join!(research, parse_file(&state, form.file));

    let (concept_explanations, concept_summary) = tokio::join!(
        state
            .learning
            .concept_explanations(&key_concepts, &topic, &prompt),
        state.learning.concept_summary(&key_concepts, &topic, &prompt),
    );
    let (learning_suggestions, leo_first_message) = tokio::join!(
        state
            .learning
            .learning_suggestions(&concept_explanations, &topic, &prompt),
        state
            .leo
            .generate_first_message(&concept_summary, &key_concepts, &topic),
    );

    let (pages_crawled, mut chunks) = match &form.url {
        Some(url) => crawl(&state, url).await,
        None => (0, Vec::new()),
    };
    chunks.extend(file_chunks);
    let chunks_indexed = index_chunks(&state, &chunks).await;

    Ok(Json(IngestResponse {
        topic,
        prompt,
        key_concepts,
        concept_explanations,
        learning_suggestions,
        concept_summary,
        leo_first_message,
        pages_crawled,
        chunks_indexed,
        namespace: state.settings.pinecone_namespace.clone(),
    }))
}
