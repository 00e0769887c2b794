use async_trait::async_trait;
use serde::Serialize;

use crate::{Document, StoreError};

/// A stored document and its similarity to the query, higher is closer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchResult {
    pub document: Document,
    pub score: f32,
}

/// Storage addressed by raw vectors. Text queries go through an [`crate::Embedding`] first.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn add(&self, docs: Vec<Document>) -> Result<(), StoreError>;

    async fn search(&self, query_embedding: &[f32], top_k: usize)
        -> Result<Vec<SearchResult>, StoreError>;

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError>;
}
