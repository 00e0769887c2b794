use std::sync::Arc;

use leo_core::{
    cache_key, ttl, CacheManager, Document, Embedding, SearchResult, StoreError, VectorStore,
};
use serde_json::{json, Value};
use tracing::Instrument;

use crate::client::PineconeHttpClient;
use crate::config::PineconeStoreBuilder;
use crate::mapper::{document_from_match, vector_metadata};
use crate::types::{DeleteRequest, IndexStats, QueryRequest, QueryResponse, UpsertRequest, Vector};
use crate::PineconeStoreError;

pub const DEFAULT_UPSERT_BATCH: usize = 100;

/// One Pinecone index, with the embedder that produced its vectors.
///
/// Namespaces are chosen per call; the builder's namespace only serves the
/// [`VectorStore`] impl.
pub struct PineconeVectorStore<E> {
    pub(crate) embedder: E,
    pub(crate) client: PineconeHttpClient,
    pub(crate) namespace: Option<String>,
    pub(crate) text_key: String,
    pub(crate) index_name: Option<String>,
    pub(crate) batch_size: usize,
    pub(crate) cache: Option<Arc<CacheManager>>,
}

impl<E> PineconeVectorStore<E>
where
    E: Embedding + Send + Sync,
{
    pub fn builder(embedder: E) -> PineconeStoreBuilder<E> {
        PineconeStoreBuilder::new(embedder)
    }

    pub fn text_key(&self) -> &str {
        &self.text_key
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Compares the index dimension with the embedder's. Only warns.
    pub(crate) async fn check_index_dimension(&self) {
        let stats: Result<IndexStats, _> = self
            .client
            .post("/describe_index_stats", &json!({}), None)
            .await;
        let expected = self.embedder.dimension();
        match stats {
            Ok(IndexStats {
                dimension: Some(dimension),
            }) if dimension != expected => tracing::warn!(
                index_name = ?self.index_name,
                index_dimension = dimension,
                embedder_dimension = expected,
                "index dimension does not match the embedder"
            ),
            Ok(IndexStats { dimension: None }) => {
                tracing::warn!(index_name = ?self.index_name, "index stats carry no dimension")
            }
            Ok(_) => tracing::debug!(index_name = ?self.index_name, "index dimension verified"),
            Err(err) => tracing::warn!(error = %err, "could not read index stats"),
        }
    }

    fn vectors(
        &self,
        docs: &[Document],
        embeddings: Vec<Vec<f32>>,
        namespace: &str,
    ) -> Result<Vec<Vector>, PineconeStoreError> {
        if embeddings.len() != docs.len() {
            return Err(PineconeStoreError::BatchMismatch {
                docs: docs.len(),
                embeddings: embeddings.len(),
            });
        }
        let expected = self.embedder.dimension();
        docs.iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (doc, values))| {
                if values.len() != expected {
                    return Err(PineconeStoreError::DimensionMismatch {
                        expected,
                        got: values.len(),
                    });
                }
                Ok(Vector {
                    id: format!("{namespace}-{i}"),
                    values,
                    metadata: vector_metadata(doc, &self.text_key),
                })
            })
            .collect()
    }

    async fn embed_documents(
        &self,
        docs: &[Document],
        namespace: &str,
    ) -> Result<Vec<Vector>, StoreError> {
        let texts: Vec<String> = docs.iter().map(|doc| doc.content.clone()).collect();
        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|err| StoreError::Internal(Box::new(err)))?;
        Ok(self.vectors(docs, embeddings, namespace)?)
    }

    async fn upsert_batches(&self, vectors: &[Vector], namespace: &str) -> usize {
        let batches = vectors.len().div_ceil(self.batch_size);
        let mut stored = 0;
        for (batch, chunk) in vectors.chunks(self.batch_size).enumerate() {
            let request = UpsertRequest {
                vectors: chunk,
                namespace,
            };
            let result: Result<Value, _> = self
                .client
                .post("/vectors/upsert", &request, Some(namespace))
                .await;
            match result {
                Ok(_) => stored += chunk.len(),
                Err(err) => tracing::error!(
                    batch = batch + 1,
                    batches,
                    size = chunk.len(),
                    error = %err,
                    "upsert batch rejected"
                ),
            }
        }
        stored
    }

    /// Embeds `docs` and stores them in `namespace` under ids `"{namespace}-{i}"`.
    ///
    /// A rejected batch is logged and skipped. Returns how many vectors were stored.
    pub async fn upsert_documents(
        &self,
        docs: &[Document],
        namespace: &str,
    ) -> Result<usize, StoreError> {
        if docs.is_empty() {
            return Ok(0);
        }
        let span = tracing::info_span!("pinecone_upsert", namespace, documents = docs.len());
        let vectors = self
            .embed_documents(docs, namespace)
            .instrument(span.clone())
            .await?;
        let stored = self
            .upsert_batches(&vectors, namespace)
            .instrument(span)
            .await;
        tracing::info!(namespace, stored, "upserted documents");
        Ok(stored)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: Option<&str>,
    ) -> Result<Vec<SearchResult>, StoreError> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            namespace,
        };
        let response: QueryResponse = self
            .client
            .post("/query", &request, namespace)
            .instrument(tracing::info_span!("pinecone_query", ?namespace, top_k))
            .await?;

        let mut results = Vec::with_capacity(response.matches.len());
        for found in response.matches {
            let Some(metadata) = found.metadata else {
                continue;
            };
            match document_from_match(&found.id, &metadata, &self.text_key) {
                Ok(document) => results.push(SearchResult {
                    document,
                    score: found.score,
                }),
                Err(PineconeStoreError::MissingTextKey { .. }) => {
                    tracing::debug!(id = %found.id, "match has no text, skipping");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(results)
    }

    /// Nearest documents to `query` with their scores.
    pub async fn scored_search(
        &self,
        query: &str,
        namespace: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, StoreError> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|err| StoreError::Internal(Box::new(err)))?;
        self.query(&vector, top_k, Some(namespace)).await
    }

    /// Nearest documents to `query`. Non-empty results are cached for 30 minutes.
    pub async fn similarity_search(
        &self,
        query: &str,
        namespace: &str,
        top_k: usize,
    ) -> Result<Vec<Document>, StoreError> {
        let key = cache_key(
            "similarity_search",
            &json!({ "query": query, "namespace": namespace, "top_k": top_k }),
        );
        if let Some(docs) = self
            .cache
            .as_ref()
            .and_then(|cache| cache.get_as::<Vec<Document>>(&key))
        {
            tracing::info!(query, namespace, "similarity search served from cache");
            return Ok(docs);
        }

        let docs: Vec<Document> = self
            .scored_search(query, namespace, top_k)
            .await?
            .into_iter()
            .map(|result| result.document)
            .collect();
        tracing::info!(query, namespace, top_k, found = docs.len(), "similarity search");

        if let (Some(cache), false) = (&self.cache, docs.is_empty()) {
            cache.set_as(key, &docs, Some(ttl::SIMILARITY_SEARCH));
        }
        Ok(docs)
    }

    pub async fn delete_ids(&self, ids: &[String], namespace: Option<&str>) -> Result<(), StoreError> {
        let request = DeleteRequest { ids, namespace };
        let _: Value = self
            .client
            .post("/vectors/delete", &request, namespace)
            .instrument(tracing::info_span!("pinecone_delete", ?namespace, ids = ids.len()))
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<E> VectorStore for PineconeVectorStore<E>
where
    E: Embedding + Send + Sync,
{
    async fn add(&self, docs: Vec<Document>) -> Result<(), StoreError> {
        let namespace = self.namespace.as_deref().unwrap_or_default();
        self.upsert_documents(&docs, namespace).await.map(|_| ())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>, StoreError> {
        self.query(query_embedding, top_k, self.namespace.as_deref())
            .await
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        self.delete_ids(ids, self.namespace.as_deref()).await
    }
}
