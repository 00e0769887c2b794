mod cache;
mod document;
mod embedding;
mod error;
mod event;
mod llm;
mod parallel;
mod retry;
mod value;
mod vector_store;

pub use cache::{cache_key, ttl, CacheManager, CacheStats};
pub use document::Document;
pub use embedding::Embedding;
pub use error::{EmbeddingError, LeoError, StoreError};
pub use event::{ChatEvent, ToolCallEvent};
pub use llm::{LlmRequest, LlmResponse, Message, Role, ToolCall, ToolSpec};
pub use parallel::{run_parallel, TaskOutcome, DEFAULT_MAX_CONCURRENT, DEFAULT_TASK_TIMEOUT};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use value::Value;
pub use vector_store::{SearchResult, VectorStore};
