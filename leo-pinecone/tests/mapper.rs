use leo_core::Document;
use leo_pinecone::mapper::{document_from_match, vector_metadata};
use leo_pinecone::PineconeStoreError;
use serde_json::json;

#[test]
fn chunk_text_is_stored_under_the_text_key() {
    let doc = Document::new("Ownership moves values.")
        .with_metadata("source", "notes.pdf")
        .with_metadata("chunk_index", 2)
        .with_metadata("tags", json!(["rust", "memory"]));

    let metadata = vector_metadata(&doc, "text");
    assert_eq!(metadata["text"], json!("Ownership moves values."));
    assert_eq!(metadata["source"], json!("notes.pdf"));
    assert_eq!(metadata["chunk_index"], json!(2));
    assert_eq!(metadata["tags"], json!(["rust", "memory"]));
}

#[test]
fn unsupported_metadata_is_stringified_or_dropped() {
    let doc = Document::new("body")
        .with_metadata("extra", json!({"a": 1}))
        .with_metadata("mixed", json!([1, "two"]))
        .with_metadata("missing", json!(null));

    let metadata = vector_metadata(&doc, "text");
    assert_eq!(metadata["extra"], json!("{\"a\":1}"));
    assert_eq!(metadata["mixed"], json!("[1,\"two\"]"));
    assert!(!metadata.contains_key("missing"));
}

#[test]
fn matches_become_documents_without_the_text_field() {
    let doc = document_from_match("physics-0", &json!({"text": "body", "source": "wiki"}), "text")
        .unwrap();
    assert_eq!(doc.id, "physics-0");
    assert_eq!(doc.content, "body");
    assert_eq!(doc.source(), Some("wiki"));
    assert!(!doc.metadata.contains_key("text"));
}

#[test]
fn matches_without_text_or_object_metadata_are_rejected() {
    let err = document_from_match("id-1", &json!({"source": "wiki"}), "text").unwrap_err();
    assert!(matches!(err, PineconeStoreError::MissingTextKey { .. }));

    let err = document_from_match("id-1", &json!("flat"), "text").unwrap_err();
    assert!(matches!(err, PineconeStoreError::Malformed(_)));
}
