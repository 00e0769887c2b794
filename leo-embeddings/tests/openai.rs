use async_openai::config::OpenAIConfig;
use async_openai::Client;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use leo_core::{Embedding, EmbeddingError};
use leo_embeddings::OpenAiEmbedding;

fn embedder(server: &MockServer, dimension: usize) -> OpenAiEmbedding {
    let config = OpenAIConfig::new()
        .with_api_key("test-key")
        .with_api_base(format!("{}/v1", server.uri()));
    OpenAiEmbedding::with_client(Client::with_config(config), "text-embedding-ada-002", dimension)
}

#[tokio::test]
async fn openai_embedding_maps_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "text-embedding-ada-002"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"embedding": [0.1, 0.2, 0.3], "index": 0, "object": "embedding"}
            ],
            "model": "text-embedding-ada-002",
            "object": "list",
            "usage": {"prompt_tokens": 1, "total_tokens": 1}
        })))
        .mount(&server)
        .await;

    let out = embedder(&server, 3).embed("hello").await.unwrap();
    assert_eq!(out, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn openai_embedding_rejects_wrong_dimension() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"embedding": [0.1, 0.2], "index": 0, "object": "embedding"}
            ],
            "model": "text-embedding-ada-002",
            "object": "list",
            "usage": {"prompt_tokens": 1, "total_tokens": 1}
        })))
        .mount(&server)
        .await;

    let err = embedder(&server, 1536).embed("hello").await.unwrap_err();
    assert!(matches!(err, EmbeddingError::InvalidResponse(ref m) if m.contains("1536")));
}

#[tokio::test]
async fn openai_batch_checks_count() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"embedding": [1.0], "index": 0, "object": "embedding"}
            ],
            "model": "text-embedding-ada-002",
            "object": "list",
            "usage": {"prompt_tokens": 2, "total_tokens": 2}
        })))
        .mount(&server)
        .await;

    let err = embedder(&server, 1)
        .embed_batch(&["a".to_string(), "b".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, EmbeddingError::InvalidResponse(_)));
}

#[test]
fn default_model_is_ada_002() {
    assert_eq!(OpenAiEmbedding::new("key").dimension(), 1536);
}

#[tokio::test]
async fn batch_results_follow_input_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_partial_json(json!({"input": ["first", "second"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"embedding": [2.0], "index": 1, "object": "embedding"},
                {"embedding": [1.0], "index": 0, "object": "embedding"}
            ],
            "model": "text-embedding-ada-002",
            "object": "list",
            "usage": {"prompt_tokens": 2, "total_tokens": 2}
        })))
        .mount(&server)
        .await;

    let vectors = embedder(&server, 1)
        .embed_batch(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();
    assert_eq!(vectors, vec![vec![1.0], vec![2.0]]);
}

#[tokio::test]
async fn empty_batch_skips_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    assert!(embedder(&server, 3).embed_batch(&[]).await.unwrap().is_empty());
}
