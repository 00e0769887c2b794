use std::time::Duration;

use futures::StreamExt;
use httpmock::prelude::*;
use leo_llm::{
    LlmError, LlmRequest, Message, OpenAiCompatibleClient, RequestOptions, StreamEvent, ToolSpec,
};
use serde_json::json;

fn client(server: &MockServer) -> OpenAiCompatibleClient {
    OpenAiCompatibleClient::builder()
        .base_url(&server.url("/api/v1"))
        .unwrap()
        .api_key("test-key")
        .default_model("google/gemma-2-9b-it")
        .header("http-referer", "https://docs-wiki.vercel.app")
        .header("x-title", "Docs Wiki - Leo AI Assistant")
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[tokio::test]
async fn complete_sends_headers_and_maps_tool_calls() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/chat/completions")
            .header("authorization", "Bearer test-key")
            .header("http-referer", "https://docs-wiki.vercel.app")
            .header("x-title", "Docs Wiki - Leo AI Assistant")
            .json_body_partial(
                json!({
                    "model": "google/gemma-2-9b-it",
                    "stream": false,
                    "tool_choice": "auto",
                    "tools": [{"type": "function", "function": {"name": "write_code"}}]
                })
                .to_string(),
            );
        then.status(200).json_body(json!({
            "id": "gen-1",
            "model": "google/gemma-2-9b-it",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "write_code", "arguments": "{\"language\":\"python\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }));
    });

    let request = LlmRequest::new("", vec![Message::user("show me code")]).with_tools(vec![
        ToolSpec {
            name: "write_code".to_string(),
            description: "Generate code".to_string(),
            parameters: json!({"type": "object"}),
        },
    ]);

    let response = client(&server)
        .complete(request, RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(response.content, "");
    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].id, "call_1");
    assert_eq!(response.tool_calls[0].args, json!({"language": "python"}));
    mock.assert();
}

#[tokio::test]
async fn complete_maps_error_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/chat/completions");
        then.status(401)
            .json_body(json!({"error": {"message": "No auth credentials found", "code": 401}}));
    });

    let err = client(&server)
        .complete(
            LlmRequest::new("openai/gpt-5", vec![Message::user("hi")]),
            RequestOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LlmError::Api { status: 401, ref message } if message == "No auth credentials found"
    ));
}

#[tokio::test]
async fn stream_yields_content_then_done() {
    let server = MockServer::start();
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: [DONE]\n\n"
    );
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/chat/completions")
            .json_body_partial(json!({"stream": true, "max_tokens": 1500}).to_string());
        then.status(200)
            .header("content-type", "text/event-stream")
            .body(body);
    });

    let request =
        LlmRequest::new("google/gemma-2-9b-it", vec![Message::user("hi")]).with_max_tokens(1500);
    let events: Vec<_> = client(&server)
        .stream(request, RequestOptions::with_timeout(Duration::from_secs(5)))
        .collect()
        .await;

    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], Ok(StreamEvent::Content(ref text)) if text == "Hel"));
    assert!(matches!(events[1], Ok(StreamEvent::Content(ref text)) if text == "lo"));
    assert!(matches!(events[2], Ok(StreamEvent::Done { ref tool_calls }) if tool_calls.is_empty()));
    mock.assert();
}

#[tokio::test]
async fn stream_reports_upstream_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/chat/completions");
        then.status(503).body("overloaded");
    });

    let events: Vec<_> = client(&server)
        .stream(
            LlmRequest::new("openai/gpt-5", vec![Message::user("hi")]),
            RequestOptions::default(),
        )
        .collect()
        .await;

    assert_eq!(events.len(), 1);
    let err = events.into_iter().next().unwrap().unwrap_err();
    assert_eq!(err.status(), Some(503));
}

#[test]
fn builder_requires_base_url_and_model() {
    assert!(matches!(
        OpenAiCompatibleClient::builder().default_model("m").build(),
        Err(LlmError::Config(_))
    ));
    assert!(OpenAiCompatibleClient::builder().base_url("not a url").is_err());
}
