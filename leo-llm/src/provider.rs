use async_trait::async_trait;

use crate::LlmError;

/// A provider that turns a single prompt into a single completion.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError>;
}
