use std::sync::Arc;

use async_trait::async_trait;
use leo_core::{cache_key, ttl, CacheManager, Embedding, EmbeddingError};

/// Caches embeddings of any provider in the shared [`CacheManager`].
pub struct CachedEmbedding<E> {
    inner: E,
    cache: Arc<CacheManager>,
}

impl<E: Embedding> CachedEmbedding<E> {
    pub fn new(inner: E, cache: Arc<CacheManager>) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: Embedding> Embedding for CachedEmbedding<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        batch
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("missing embedding".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let key = cache_key("embeddings", texts);
        if let Some(cached) = self.cache.get_as::<Vec<Vec<f32>>>(&key) {
            return Ok(cached);
        }

        let embeddings = self.inner.embed_batch(texts).await?;
        self.cache.set_as(key, &embeddings, Some(ttl::EMBEDDINGS));
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}
