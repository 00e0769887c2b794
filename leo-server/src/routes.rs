use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use futures::StreamExt;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Counts a request until its body has been sent or dropped, so streamed
/// chat answers stay counted while they are open.
async fn track_in_flight(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let guard = InFlight::enter(&state.in_flight);
    let (parts, body) = next.run(request).await.into_parts();
    let body = body.into_data_stream().map(move |chunk| {
        let _held = &guard;
        chunk
    });
    Response::from_parts(parts, Body::from_stream(body))
}

fn cors(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(origin = %origin, error = %err, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    // credentials rule out wildcards, so methods and headers mirror the request
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

pub fn router(state: Arc<AppState>) -> Router<()> {
    // chat streams line by line, so it stays out of the gzip layer
    let streaming = Router::new().route("/api/chat", post(handlers::chat));
    let buffered = Router::new()
        .route("/api/performance", get(handlers::performance))
        .route("/api/cache/clear", post(handlers::clear_cache))
        .route("/api/ingest", post(handlers::ingest))
        .route("/health", get(handlers::health))
        .layer(CompressionLayer::new());

    streaming
        .merge(buffered)
        .layer(middleware::from_fn_with_state(Arc::clone(&state), track_in_flight))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors(&state.settings.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
