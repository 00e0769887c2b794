mod common;

use common::{app, json_post, lines, openrouter_settings, send, sse, FakeIndex};
use leo_core::Document;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn event_stream(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

fn content_chunk(text: &str) -> serde_json::Value {
    json!({"choices": [{"delta": {"content": text}}]})
}

fn tool_chunk(id: Option<&str>, name: Option<&str>, arguments: &str) -> serde_json::Value {
    let mut call = json!({"index": 0, "function": {"arguments": arguments}});
    if let Some(id) = id {
        call["id"] = json!(id);
        call["type"] = json!("function");
    }
    if let Some(name) = name {
        call["function"]["name"] = json!(name);
    }
    json!({"choices": [{"delta": {"tool_calls": [call]}}]})
}

#[tokio::test]
async fn streams_content_and_tool_calls_then_serves_repeats_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer or-test-key"))
        .and(body_string_contains("\"stream\":true"))
        .respond_with(event_stream(sse(&[
            content_chunk("Here is "),
            content_chunk("an example."),
            tool_chunk(Some("call_1"), Some("write_code"), "{\"language\":\"python\","),
            tool_chunk(None, None, "\"code\":\"print(1)\"}"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (app, _) = app(openrouter_settings(&server.uri()), None);
    let request = json!({"message": "Explain ownership in Rust please", "model": "openai/gpt-5"});

    let (status, first) = send(&app, json_post("/api/chat", request.clone())).await;
    assert_eq!(status, 200);
    assert_eq!(
        lines(&first),
        vec![
            json!({"content": "Here is "}),
            json!({"content": "an example."}),
            json!({"tool_call": {
                "name": "write_code",
                "arguments": {"language": "python", "code": "print(1)"}
            }}),
        ]
    );

    let (status, second) = send(&app, json_post("/api/chat", request)).await;
    assert_eq!(status, 200);
    assert_eq!(lines(&second), lines(&first));
}

#[tokio::test]
async fn time_sensitive_messages_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(event_stream(sse(&[content_chunk("Fresh answer")])))
        .expect(2)
        .mount(&server)
        .await;

    let (app, cache) = app(openrouter_settings(&server.uri()), None);
    let request = json!({"message": "What is the latest Rust release?", "model": "openai/gpt-5"});

    for _ in 0..2 {
        let (_, body) = send(&app, json_post("/api/chat", request.clone())).await;
        assert_eq!(lines(&body), vec![json!({"content": "Fresh answer"})]);
    }
    assert_eq!(cache.stats().total_entries, 0);
}

#[tokio::test]
async fn upstream_failure_becomes_an_error_line() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let (app, _) = app(openrouter_settings(&server.uri()), None);
    let request = json!({"message": "Explain ownership in Rust please", "model": "openai/gpt-5"});
    let (status, body) = send(&app, json_post("/api/chat", request)).await;

    assert_eq!(status, 200);
    assert_eq!(lines(&body), vec![json!({"error": "API error: 500"})]);

    let (status, performance) = send(
        &app,
        axum::http::Request::get("/api/performance")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, 200);
    let report: serde_json::Value = serde_json::from_str(&performance).unwrap();
    assert_eq!(report["monitor"]["error_counts"]["openai/gpt-5"]["API error: 500"], 1);
    assert_eq!(report["monitor"]["by_model"]["openai/gpt-5"]["request_count"], 1);
}

#[tokio::test]
async fn rag_context_reaches_the_model_and_search_results_are_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Additional context from uploaded documents"))
        .and(body_string_contains("Source: notes.md"))
        .respond_with(event_stream(sse(&[tool_chunk(
            Some("call_rag"),
            Some("use_rag_search"),
            "{\"query\":\"ownership\",\"reason\":\"asked about the notes\"}",
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let index = FakeIndex::with_documents(vec![Document::new(
        "Ownership moves values between bindings.",
    )
    .with_metadata("source", json!("notes.md"))]);
    let (app, _) = app(openrouter_settings(&server.uri()), Some(index.clone()));

    let request = json!({
        "message": "Summarize the document about ownership",
        "model": "openai/gpt-5",
        "use_rag": true,
        "top_k": 2,
    });
    let (status, body) = send(&app, json_post("/api/chat", request)).await;

    assert_eq!(status, 200);
    assert_eq!(
        lines(&body),
        vec![json!({"tool_call": {
            "name": "use_rag_search",
            "arguments": {"query": "ownership", "reason": "asked about the notes"},
            "result": "Found 1 relevant documents for query: 'ownership'"
        }})]
    );

    let searches = index.searches.lock().unwrap().clone();
    assert_eq!(
        searches,
        vec![(
            "Summarize the document about ownership".to_string(),
            "default_docs".to_string(),
            2
        )]
    );
}

#[tokio::test]
async fn rag_tool_calls_are_dropped_without_retrieved_documents() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(event_stream(sse(&[
            content_chunk("Nothing uploaded yet."),
            tool_chunk(Some("call_rag"), Some("use_rag_search"), "{\"query\":\"x\"}"),
        ])))
        .mount(&server)
        .await;

    let (app, _) = app(
        openrouter_settings(&server.uri()),
        Some(FakeIndex::with_documents(Vec::new())),
    );
    let request = json!({
        "message": "Summarize the document please",
        "model": "openai/gpt-5",
        "use_rag": true,
    });
    let (_, body) = send(&app, json_post("/api/chat", request)).await;

    assert_eq!(lines(&body), vec![json!({"content": "Nothing uploaded yet."})]);
}

#[tokio::test]
async fn web_search_without_perplexity_reports_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(event_stream(sse(&[tool_chunk(
            Some("call_web"),
            Some("use_web_search"),
            "{\"query\":\"rust release\",\"reason\":\"current info\"}",
        )])))
        .mount(&server)
        .await;

    let (app, _) = app(openrouter_settings(&server.uri()), None);
    let request = json!({"message": "Any news about Rust today?", "model": "openai/gpt-5"});
    let (_, body) = send(&app, json_post("/api/chat", request)).await;

    assert_eq!(
        lines(&body),
        vec![json!({"tool_call": {
            "name": "use_web_search",
            "arguments": {"query": "rust release", "reason": "current info"},
            "result": "Web search not available - API key not configured"
        }})]
    );
}
