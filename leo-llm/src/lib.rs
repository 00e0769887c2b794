mod anthropic;
mod error;
mod openai;
mod provider;

pub mod models;
pub mod openai_compatible;
pub mod perplexity;

pub use anthropic::{AnthropicClient, ANTHROPIC_BASE_URL, HAIKU_MODEL};
pub use error::LlmError;
pub use leo_core::{LlmRequest, LlmResponse, Message, Role, ToolCall, ToolSpec};
pub use models::{
    model_config, select_from_available, select_optimal_model, ModelConfig, Priority,
    MODEL_CONFIGS,
};
pub use openai::{OpenAiCompletion, GPT_35_TURBO};
pub use openai_compatible::{
    ChatCompletionRequest, OpenAiCompatibleBuilder, OpenAiCompatibleClient, RequestOptions,
    SseDecoder, StreamEvent, ToolCallAccumulator,
};
pub use perplexity::{parse_concepts, PerplexityClient, PERPLEXITY_BASE_URL};
pub use provider::CompletionProvider;
