use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use leo_pinecone::{CreateIndexRequest, PineconeControlPlane};

fn request() -> CreateIndexRequest {
    CreateIndexRequest::serverless("docs-wiki-index", 1536, "us-east-1")
}

#[tokio::test]
async fn lists_indexes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes"))
        .and(header("Api-Key", "key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "indexes": [{"name": "a", "host": "a-123.svc.pinecone.io", "dimension": 1536, "metric": "cosine"}]
        })))
        .mount(&server)
        .await;

    let control = PineconeControlPlane::with_base_url("key", server.uri()).unwrap();
    let indexes = control.list_indexes().await.unwrap();
    assert_eq!(indexes.len(), 1);
    assert_eq!(indexes[0].dimension, Some(1536));
}

#[tokio::test]
async fn create_tolerates_existing_index() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {"code": "ALREADY_EXISTS", "message": "Resource already exists"},
            "status": 409
        })))
        .mount(&server)
        .await;

    let control = PineconeControlPlane::with_base_url("key", server.uri()).unwrap();
    control.create_index(&request()).await.unwrap();
}

#[tokio::test]
async fn create_propagates_other_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": "FORBIDDEN", "message": "quota exceeded"}
        })))
        .mount(&server)
        .await;

    let control = PineconeControlPlane::with_base_url("key", server.uri()).unwrap();
    let err = control.create_index(&request()).await.unwrap_err();
    assert!(err.to_string().contains("quota exceeded"));
}

#[tokio::test]
async fn ensure_index_creates_missing_index_and_returns_host() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"indexes": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/indexes"))
        .and(body_partial_json(json!({
            "name": "docs-wiki-index",
            "dimension": 1536,
            "metric": "cosine",
            "spec": {"serverless": {"cloud": "aws", "region": "us-east-1"}}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"name": "docs-wiki-index"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/indexes/docs-wiki-index"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "docs-wiki-index",
            "host": "docs-wiki-index-abc.svc.pinecone.io"
        })))
        .mount(&server)
        .await;

    let control = PineconeControlPlane::with_base_url("key", server.uri()).unwrap();
    let host = control.ensure_index(&request()).await.unwrap();
    assert_eq!(host, "https://docs-wiki-index-abc.svc.pinecone.io");
}

#[tokio::test]
async fn ensure_index_skips_creation_when_present() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "indexes": [{"name": "docs-wiki-index"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/indexes/docs-wiki-index"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "docs-wiki-index",
            "host": "https://idx.example"
        })))
        .mount(&server)
        .await;

    let control = PineconeControlPlane::with_base_url("key", server.uri()).unwrap();
    assert_eq!(control.ensure_index(&request()).await.unwrap(), "https://idx.example");
}
