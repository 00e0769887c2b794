use std::sync::Arc;

use leo_core::{CacheManager, Embedding};

use crate::client::PineconeHttpClient;
use crate::store::{PineconeVectorStore, DEFAULT_UPSERT_BATCH};
use crate::PineconeStoreError;

/// Builder for [`PineconeVectorStore`]. `base_url` and `api_key` are required.
pub struct PineconeStoreBuilder<E> {
    embedder: E,
    base_url: Option<String>,
    api_key: Option<String>,
    namespace: Option<String>,
    text_key: String,
    index_name: Option<String>,
    validate_dimension: bool,
    batch_size: usize,
    cache: Option<Arc<CacheManager>>,
}

impl<E> PineconeStoreBuilder<E>
where
    E: Embedding + Send + Sync,
{
    pub fn new(embedder: E) -> Self {
        Self {
            embedder,
            base_url: None,
            api_key: None,
            namespace: None,
            text_key: "text".to_string(),
            index_name: None,
            validate_dimension: false,
            batch_size: DEFAULT_UPSERT_BATCH,
            cache: None,
        }
    }

    /// Index host as returned by the control plane, e.g. `https://docs-wiki-index-abc.svc.pinecone.io`.
    pub fn base_url(self, base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..self
        }
    }

    pub fn api_key(self, api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..self
        }
    }

    pub fn namespace(self, namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..self
        }
    }

    /// Metadata field holding the chunk text. Defaults to `text`.
    pub fn text_key(self, text_key: impl Into<String>) -> Self {
        Self {
            text_key: text_key.into(),
            ..self
        }
    }

    pub fn index_name(self, index_name: impl Into<String>) -> Self {
        Self {
            index_name: Some(index_name.into()),
            ..self
        }
    }

    /// Reads the index stats on build and warns when the dimension differs from the embedder's.
    pub fn validate_dimension(self, validate_dimension: bool) -> Self {
        Self {
            validate_dimension,
            ..self
        }
    }

    /// Vectors per upsert request. Defaults to 100.
    pub fn max_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    pub fn cache(self, cache: Arc<CacheManager>) -> Self {
        Self {
            cache: Some(cache),
            ..self
        }
    }

    pub async fn build(self) -> Result<PineconeVectorStore<E>, PineconeStoreError> {
        let missing = |field: &str| PineconeStoreError::Config(format!("{field} is required"));
        let base_url = self.base_url.ok_or_else(|| missing("base_url"))?;
        let api_key = self.api_key.ok_or_else(|| missing("api_key"))?;
        if self.batch_size == 0 {
            return Err(PineconeStoreError::Config(
                "batch size must be at least 1".to_string(),
            ));
        }

        let store = PineconeVectorStore {
            embedder: self.embedder,
            client: PineconeHttpClient::new(base_url, api_key)?,
            namespace: self.namespace,
            text_key: self.text_key,
            index_name: self.index_name,
            batch_size: self.batch_size,
            cache: self.cache,
        };
        if self.validate_dimension {
            store.check_index_dimension().await;
        }
        Ok(store)
    }
}
