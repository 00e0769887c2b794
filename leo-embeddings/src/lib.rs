mod cached;
mod error;
mod openai;

pub use cached::CachedEmbedding;
pub use error::EmbeddingProviderError;
pub use openai::{OpenAiEmbedding, ADA_002, ADA_002_DIMENSION};
