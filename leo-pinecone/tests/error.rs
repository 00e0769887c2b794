use leo_core::StoreError;
use leo_pinecone::PineconeStoreError;

fn api_error(status: u16, code: Option<&str>, message: &str) -> PineconeStoreError {
    PineconeStoreError::Api {
        status,
        message: message.to_string(),
        code: code.map(str::to_string),
        namespace: None,
    }
}

#[test]
fn store_errors_wrap_pinecone_failures() {
    let store_err: StoreError = PineconeStoreError::Transport("connection reset".to_string()).into();
    assert_eq!(
        store_err.to_string(),
        "Store error: could not reach pinecone: connection reset"
    );
}

#[test]
fn dimension_mismatch_keeps_its_shape() {
    let store_err: StoreError = PineconeStoreError::DimensionMismatch { expected: 1536, got: 3 }.into();
    assert!(matches!(
        store_err,
        StoreError::DimensionMismatch { expected: 1536, got: 3 }
    ));
}

#[test]
fn api_error_reads_status_and_message() {
    assert_eq!(
        api_error(429, None, "rate limited").to_string(),
        "pinecone returned 429: rate limited"
    );
}

#[test]
fn only_conflicts_marked_already_exists_are_tolerated() {
    assert!(api_error(409, Some("ALREADY_EXISTS"), "Resource already exists").is_already_exists());
    assert!(api_error(409, None, "ALREADY_EXISTS: docs-wiki-index").is_already_exists());
    assert!(!api_error(409, Some("CONFLICT"), "quota").is_already_exists());
    assert!(!api_error(400, Some("ALREADY_EXISTS"), "bad").is_already_exists());
}

#[test]
fn outages_and_throttling_are_transient() {
    assert!(PineconeStoreError::Transport("timed out".to_string()).is_transient());
    assert!(api_error(503, None, "unavailable").is_transient());
    assert!(api_error(429, None, "rate limited").is_transient());
    assert!(!api_error(403, Some("FORBIDDEN"), "quota exceeded").is_transient());
    assert!(!PineconeStoreError::Config("bad key".to_string()).is_transient());
}
