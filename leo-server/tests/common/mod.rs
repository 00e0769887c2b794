#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use clap::Parser;
use http_body_util::BodyExt;
use leo_core::{CacheManager, Document, StoreError};
use leo_server::{router, AppState, DocumentIndex, Settings};
use tower::ServiceExt;

/// Settings with every provider disabled, whatever the environment says.
pub fn offline_settings() -> Settings {
    let mut settings = Settings::parse_from(["leo-server"]);
    settings.openrouter_api_key = None;
    settings.perplexity_api_key = None;
    settings.openai_api_key = None;
    settings.anthropic_api_key = None;
    settings.pinecone_api_key = None;
    settings.pinecone_namespace = "default_docs".to_string();
    settings
}

pub fn openrouter_settings(base_url: &str) -> Settings {
    let mut settings = offline_settings();
    settings.openrouter_api_key = Some("or-test-key".to_string());
    settings.openrouter_base_url = base_url.to_string();
    settings
}

pub fn app(settings: Settings, index: Option<Arc<dyn DocumentIndex>>) -> (Router, Arc<CacheManager>) {
    let cache = Arc::new(CacheManager::default());
    let mut state = AppState::new(settings, Arc::clone(&cache)).expect("state");
    if let Some(index) = index {
        state = state.with_index(index);
    }
    (router(Arc::new(state)), cache)
}

pub async fn send(app: &Router, request: Request<Body>) -> (u16, String) {
    let response: Response = app.clone().oneshot(request).await.expect("response");
    let status = response.status().as_u16();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    (status, String::from_utf8(bytes.to_vec()).expect("utf8 body"))
}

pub fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn sse(chunks: &[serde_json::Value]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

pub fn lines(body: &str) -> Vec<serde_json::Value> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect()
}

#[derive(Default)]
pub struct FakeIndex {
    pub documents: Vec<Document>,
    pub searches: Mutex<Vec<(String, String, usize)>>,
    pub indexed: Mutex<Vec<(usize, String)>>,
}

impl FakeIndex {
    pub fn with_documents(documents: Vec<Document>) -> Arc<Self> {
        Arc::new(Self {
            documents,
            ..Self::default()
        })
    }
}

#[async_trait]
impl DocumentIndex for FakeIndex {
    async fn search(
        &self,
        query: &str,
        namespace: &str,
        top_k: usize,
    ) -> Result<Vec<Document>, StoreError> {
        self.searches
            .lock()
            .unwrap()
            .push((query.to_string(), namespace.to_string(), top_k));
        Ok(self.documents.iter().take(top_k).cloned().collect())
    }

    async fn index(&self, documents: &[Document], namespace: &str) -> Result<usize, StoreError> {
        self.indexed
            .lock()
            .unwrap()
            .push((documents.len(), namespace.to_string()));
        Ok(documents.len())
    }
}
