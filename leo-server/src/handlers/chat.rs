//! `POST /api/chat`: streams Leo's answer as newline-delimited JSON.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use leo_core::{ttl, ChatEvent, Document};
use leo_llm::select_optimal_model;
use serde::Deserialize;

use crate::leo::{should_use_rag, should_use_web_search, ChatTurn};
use crate::state::AppState;

const TIME_SENSITIVE_KEYWORDS: &[&str] =
    &["current", "latest", "now", "today", "recent", "2024", "2025"];
const MIN_CACHEABLE_CHARS: usize = 10;

#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Empty lets the server pick a model for the message.
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub use_rag: bool,
    #[serde(default)]
    pub use_web_search: bool,
}

fn default_top_k() -> usize {
    4
}

fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// md5 of `"{message}:{model}:{use_rag}:{use_web_search}"`, booleans spelled `True`/`False`.
pub fn chat_cache_key(message: &str, model: &str, use_rag: bool, use_web_search: bool) -> String {
    let raw = format!(
        "{message}:{model}:{}:{}",
        py_bool(use_rag),
        py_bool(use_web_search)
    );
    format!("{:x}", md5::compute(raw.as_bytes()))
}

/// Short and time-sensitive messages are never cached.
pub fn should_cache_response(message: &str) -> bool {
    if message.chars().count() < MIN_CACHEABLE_CHARS {
        return false;
    }
    let message = message.to_lowercase();
    !TIME_SENSITIVE_KEYWORDS
        .iter()
        .any(|keyword| message.contains(keyword))
}

fn ndjson(body: Body) -> Response {
    ([(CONTENT_TYPE, "application/json")], body).into_response()
}

async fn retrieve(state: &AppState, query: &str, top_k: usize) -> Vec<Document> {
    let Some(index) = &state.index else {
        tracing::debug!("no document index configured");
        return Vec::new();
    };
    match index
        .search(query, &state.settings.pinecone_namespace, top_k)
        .await
    {
        Ok(documents) => documents,
        Err(err) => {
            tracing::warn!(error = %err, "document retrieval failed");
            Vec::new()
        }
    }
}

/// Bookkeeping that runs when the response stream ends or is dropped.
struct ChatRecorder {
    state: Arc<AppState>,
    model: String,
    cache_key: Option<String>,
    started: Instant,
    lines: Vec<String>,
    completed: bool,
}

impl ChatRecorder {
    fn observe(&mut self, event: &ChatEvent, line: &str) {
        if let ChatEvent::Error(message) = event {
            self.state.monitor.record_error(&self.model, message);
        }
        self.lines.push(line.to_string());
    }
}

impl Drop for ChatRecorder {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        self.state.monitor.record_response_time(&self.model, elapsed);
        tracing::info!(
            model = %self.model,
            elapsed_secs = elapsed.as_secs_f64(),
            completed = self.completed,
            "chat completed"
        );

        if !self.completed || self.lines.is_empty() {
            return;
        }
        if let Some(key) = self.cache_key.take() {
            let body = self.lines.join("\n");
            self.state.cache.set(key.clone(), body.into(), Some(ttl::CHAT_RESPONSE));
            tracing::info!(key = %&key[..8], "cached chat response");
        }
    }
}

pub async fn chat(State(state): State<Arc<AppState>>, Json(request): Json<ChatRequest>) -> Response {
    let started = Instant::now();
    tracing::info!(message = %request.message, model = %request.model, "received chat request");

    let model = select_optimal_model(&request.message, &request.model);
    if model != request.model {
        tracing::info!(selected = %model, requested = %request.model, "selected optimal model");
    }

    let key = chat_cache_key(
        &request.message,
        &model,
        request.use_rag,
        request.use_web_search,
    );
    let cacheable = should_cache_response(&request.message);
    if cacheable {
        if let Some(cached) = state.cache.get_as::<String>(&key) {
            tracing::info!(key = %&key[..8], "cache hit for chat request");
            return ndjson(Body::from(cached));
        }
    }

    let decisions = async {
        (
            should_use_rag(&request.message, request.use_rag),
            should_use_web_search(&request.message) || request.use_web_search,
        )
    };
    let retrieval = async {
        if request.use_rag || should_use_rag(&request.message, request.use_rag) {
            retrieve(&state, &request.message, request.top_k).await
        } else {
            Vec::new()
        }
    };
    let ((rag_decided, use_web_search), documents) = tokio::join!(decisions, retrieval);
    let use_rag = rag_decided && !documents.is_empty();
    tracing::info!(
        use_rag,
        use_web_search,
        documents = documents.len(),
        "chat decisions ready"
    );

    let events = state.leo.chat(ChatTurn {
        message: request.message,
        model: model.clone(),
        documents,
        use_rag,
        use_web_search,
    });

    let recorder = ChatRecorder {
        state: Arc::clone(&state),
        model,
        cache_key: cacheable.then_some(key),
        started,
        lines: Vec::new(),
        completed: false,
    };

    let body = stream::unfold((events, recorder), |(mut events, mut recorder)| async move {
        match events.next().await {
            Some(event) => {
                let line = event.to_line();
                recorder.observe(&event, &line);
                let chunk = Bytes::from(format!("{line}\n"));
                Some((Ok::<_, Infallible>(chunk), (events, recorder)))
            }
            None => {
                recorder.completed = true;
                None
            }
        }
    });

    ndjson(Body::from_stream(body))
}
