use std::sync::Arc;

use leo_core::{cache_key, ttl, CacheManager};
use leo_llm::{LlmError, PerplexityClient};
use serde_json::json;

/// Key-concept research backed by Perplexity.
#[derive(Clone)]
pub struct ResearchService {
    perplexity: Option<PerplexityClient>,
    cache: Arc<CacheManager>,
}

impl ResearchService {
    pub fn new(perplexity: Option<PerplexityClient>, cache: Arc<CacheManager>) -> Self {
        Self { perplexity, cache }
    }

    pub fn is_configured(&self) -> bool {
        self.perplexity.is_some()
    }

    pub async fn key_concepts(&self, topic: &str, prompt: &str) -> Result<Vec<String>, LlmError> {
        let perplexity = self
            .perplexity
            .as_ref()
            .ok_or(LlmError::MissingApiKey("PERPLEXITY_API_KEY"))?;

        let key = cache_key(
            "perplexity_key_concepts",
            &json!({ "topic": topic, "prompt": prompt }),
        );
        if let Some(concepts) = self.cache.get_as::<Vec<String>>(&key) {
            tracing::info!(topic, "using cached key concepts");
            return Ok(concepts);
        }

        let concepts = perplexity.key_concepts(topic, prompt).await?;
        if !concepts.is_empty() {
            self.cache.set_as(key, &concepts, Some(ttl::KEY_CONCEPTS));
        }
        Ok(concepts)
    }
}
