use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use leo_core::{retry_with_backoff, CacheManager, Document, Embedding, RetryPolicy, StoreError};
use leo_embeddings::{CachedEmbedding, OpenAiEmbedding, ADA_002_DIMENSION};
use leo_llm::models::DEFAULT_CHAT_MODEL;
use leo_llm::{
    AnthropicClient, CompletionProvider, OpenAiCompatibleClient, OpenAiCompletion,
    PerplexityClient,
};
use leo_pinecone::{CreateIndexRequest, PineconeControlPlane, PineconeStoreError, PineconeVectorStore};
use leo_retrieval::{DocumentParser, FileParser, RecursiveCharacterTextSplitter};

use crate::config::{non_empty, Settings};
use crate::learning::LearningContent;
use crate::leo::LeoService;
use crate::monitor::PerformanceMonitor;
use crate::research::ResearchService;
use crate::system::SystemProbe;

/// Upper bound for a whole streamed answer; per-chunk stalls are bounded by the model timeout.
const OPENROUTER_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Where ingested chunks go and where chat retrieval reads from.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    async fn search(&self, query: &str, namespace: &str, top_k: usize)
        -> Result<Vec<Document>, StoreError>;

    /// Returns how many chunks were stored.
    async fn index(&self, documents: &[Document], namespace: &str) -> Result<usize, StoreError>;
}

#[async_trait]
impl<E> DocumentIndex for PineconeVectorStore<E>
where
    E: Embedding + Send + Sync,
{
    async fn search(
        &self,
        query: &str,
        namespace: &str,
        top_k: usize,
    ) -> Result<Vec<Document>, StoreError> {
        self.similarity_search(query, namespace, top_k).await
    }

    async fn index(&self, documents: &[Document], namespace: &str) -> Result<usize, StoreError> {
        self.upsert_documents(documents, namespace).await
    }
}

pub struct AppState {
    pub settings: Settings,
    pub cache: Arc<CacheManager>,
    pub leo: LeoService,
    pub learning: LearningContent,
    pub research: ResearchService,
    pub index: Option<Arc<dyn DocumentIndex>>,
    pub file_parser: FileParser,
    pub page_parser: DocumentParser,
    pub monitor: PerformanceMonitor,
    pub system: SystemProbe,
    pub in_flight: Arc<AtomicUsize>,
}

impl AppState {
    /// Builds every service from `settings`. Missing keys disable the
    /// features that need them; they never fail startup.
    pub fn new(settings: Settings, cache: Arc<CacheManager>) -> anyhow::Result<Self> {
        let openrouter = OpenAiCompatibleClient::builder()
            .base_url(&settings.openrouter_base_url)?
            .maybe_api_key(settings.openrouter_api_key.clone())
            .default_model(DEFAULT_CHAT_MODEL)
            .timeout(OPENROUTER_REQUEST_TIMEOUT)
            .header("HTTP-Referer", settings.app_url.clone())
            .header("X-Title", settings.app_title.clone())
            .build()
            .context("failed to build the OpenRouter client")?;

        let perplexity = non_empty(&settings.perplexity_api_key)
            .map(|key| PerplexityClient::with_base_url(key, &settings.perplexity_base_url))
            .transpose()
            .context("failed to build the Perplexity client")?;

        let mut providers: Vec<Arc<dyn CompletionProvider>> = Vec::new();
        if let Some(key) = non_empty(&settings.openai_api_key) {
            let openai = match &settings.openai_base_url {
                Some(base) => OpenAiCompletion::with_api_base(key, base.clone()),
                None => OpenAiCompletion::new(key),
            };
            providers.push(Arc::new(openai));
        }
        if let Some(key) = non_empty(&settings.anthropic_api_key) {
            let anthropic = AnthropicClient::new(key)?.with_base_url(settings.anthropic_base_url.clone());
            providers.push(Arc::new(anthropic));
        }

        let page_parser = DocumentParser::new(RecursiveCharacterTextSplitter::default())?
            .with_cache(Arc::clone(&cache));
        let in_flight = Arc::new(AtomicUsize::new(0));

        Ok(Self {
            leo: LeoService::new(openrouter, perplexity.clone()),
            learning: LearningContent::new(providers, Arc::clone(&cache)),
            research: ResearchService::new(perplexity, Arc::clone(&cache)),
            index: None,
            file_parser: FileParser::default(),
            page_parser,
            monitor: PerformanceMonitor::new(),
            system: SystemProbe::new(Arc::clone(&in_flight)),
            in_flight,
            cache,
            settings,
        })
    }

    pub fn with_index(mut self, index: Arc<dyn DocumentIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Connects to Pinecone when both Pinecone and OpenAI keys are present,
    /// creating the index on first use.
    pub async fn connect_index(&self) -> anyhow::Result<Option<Arc<dyn DocumentIndex>>> {
        self.connect_index_with(&RetryPolicy::default()).await
    }

    /// [`connect_index`](Self::connect_index) with an explicit backoff for
    /// control plane outages.
    pub async fn connect_index_with(
        &self,
        retry: &RetryPolicy,
    ) -> anyhow::Result<Option<Arc<dyn DocumentIndex>>> {
        let settings = &self.settings;
        let (Some(pinecone_key), Some(openai_key)) = (
            non_empty(&settings.pinecone_api_key),
            non_empty(&settings.openai_api_key),
        ) else {
            tracing::warn!("Pinecone or OpenAI key missing; document retrieval is disabled");
            return Ok(None);
        };

        let control = PineconeControlPlane::with_base_url(pinecone_key, &settings.pinecone_control_url)?;
        let request = CreateIndexRequest::serverless(
            &settings.pinecone_index,
            ADA_002_DIMENSION,
            &settings.pinecone_environment,
        );
        let host = retry_with_backoff(
            retry,
            || control.ensure_index(&request),
            PineconeStoreError::is_transient,
        )
        .await
        .with_context(|| format!("failed to prepare index {}", settings.pinecone_index))?;

        let embedder = match &settings.openai_base_url {
            Some(base) => OpenAiEmbedding::with_api_base(openai_key, base.clone()),
            None => OpenAiEmbedding::new(openai_key),
        };
        let store = PineconeVectorStore::builder(CachedEmbedding::new(embedder, Arc::clone(&self.cache)))
            .base_url(host)
            .api_key(pinecone_key)
            .namespace(settings.pinecone_namespace.clone())
            .index_name(settings.pinecone_index.clone())
            .validate_dimension(true)
            .cache(Arc::clone(&self.cache))
            .build()
            .await?;
        tracing::info!(index = %settings.pinecone_index, "connected to Pinecone");
        Ok(Some(Arc::new(store)))
    }
}
