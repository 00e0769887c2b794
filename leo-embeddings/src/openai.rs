//! OpenAI embeddings through `async-openai`.

use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_openai::Client;
use async_trait::async_trait;
use leo_core::{Embedding, EmbeddingError};

use crate::EmbeddingProviderError;

pub const ADA_002: &str = "text-embedding-ada-002";
pub const ADA_002_DIMENSION: usize = 1536;

#[derive(Clone)]
pub struct OpenAiEmbedding {
    client: Client<OpenAIConfig>,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedding {
    /// `text-embedding-ada-002`, the model the document index is built with.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_config(OpenAIConfig::default().with_api_key(api_key))
    }

    /// ada-002 behind another OpenAI-compatible base such as `http://host/v1`.
    pub fn with_api_base(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self::with_config(
            OpenAIConfig::default()
                .with_api_key(api_key)
                .with_api_base(api_base),
        )
    }

    fn with_config(config: OpenAIConfig) -> Self {
        Self::with_client(Client::with_config(config), ADA_002, ADA_002_DIMENSION)
    }

    pub fn with_client(
        client: Client<OpenAIConfig>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            dimension,
        }
    }

    /// Embeds `input`, returning `expected` vectors in input order.
    async fn create(
        &self,
        input: EmbeddingInput,
        expected: usize,
    ) -> Result<Vec<Vec<f32>>, EmbeddingProviderError> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(input)
            .build()
            .map_err(|err| EmbeddingProviderError::Request(err.to_string()))?;
        let mut data = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|err| EmbeddingProviderError::Request(err.to_string()))?
            .data;

        if data.len() != expected {
            return Err(EmbeddingProviderError::Count {
                expected,
                got: data.len(),
            });
        }
        data.sort_by_key(|item| item.index);

        let vectors: Vec<Vec<f32>> = data.into_iter().map(|item| item.embedding).collect();
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(EmbeddingProviderError::Dimension {
                expected: self.dimension,
                got: bad.len(),
            });
        }
        tracing::debug!(count = vectors.len(), model = %self.model, "created embeddings");
        Ok(vectors)
    }
}

#[async_trait]
impl Embedding for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self
            .create(EmbeddingInput::String(text.to_string()), 1)
            .await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingProviderError::InvalidResponse("missing embedding".to_string()).into())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .create(EmbeddingInput::StringArray(texts.to_vec()), texts.len())
            .await?)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
