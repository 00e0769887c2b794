use httpmock::prelude::*;
use leo_llm::{AnthropicClient, CompletionProvider, LlmError, OpenAiCompletion};
use serde_json::json;

#[tokio::test]
async fn anthropic_returns_first_text_block() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/messages")
            .header("x-api-key", "sk-ant")
            .header("anthropic-version", "2023-06-01")
            .json_body(json!({
                "model": "claude-3-haiku-20240307",
                "max_tokens": 300,
                "messages": [{"role": "user", "content": "summarize"}]
            }));
        then.status(200).json_body(json!({
            "content": [{"type": "text", "text": "  A summary.  "}]
        }));
    });

    let client = AnthropicClient::new("sk-ant").unwrap().with_base_url(server.url(""));
    assert_eq!(client.complete("summarize", 300).await.unwrap(), "A summary.");
    mock.assert();
}

#[tokio::test]
async fn anthropic_maps_error_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/messages");
        then.status(400).json_body(json!({
            "type": "error",
            "error": {"type": "invalid_request_error", "message": "max_tokens too large"}
        }));
    });

    let client = AnthropicClient::new("sk-ant").unwrap().with_base_url(server.url(""));
    let err = client.complete("x", 999_999).await.unwrap_err();
    assert!(matches!(err, LlmError::Api { status: 400, ref message } if message == "max_tokens too large"));
}

#[tokio::test]
async fn openai_completion_uses_gpt_35_turbo() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .json_body_partial(json!({"model": "gpt-3.5-turbo", "max_tokens": 150}).to_string());
        then.status(200).json_body(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-3.5-turbo",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": " Ownership is... "},
                "finish_reason": "stop",
                "logprobs": null
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }));
    });

    let client = OpenAiCompletion::with_api_base("sk-test", server.url("/v1"));
    assert_eq!(client.complete("explain ownership", 150).await.unwrap(), "Ownership is...");
    mock.assert();
}
