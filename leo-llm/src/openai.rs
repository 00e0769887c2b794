//! OpenAI chat completions through `async-openai`.

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::{CompletionProvider, LlmError};

pub const GPT_35_TURBO: &str = "gpt-3.5-turbo";

const EDUCATIONAL_SYSTEM_PROMPT: &str =
    "You are a helpful educational assistant that provides clear, concise explanations.";

#[derive(Clone)]
pub struct OpenAiCompletion {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiCompletion {
    pub fn new(api_key: impl Into<String>) -> Self {
        let config = OpenAIConfig::default().with_api_key(api_key);
        Self::with_client(Client::with_config(config))
    }

    /// Points the client at another OpenAI-compatible base, e.g. `http://host/v1`.
    pub fn with_api_base(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        let config = OpenAIConfig::default()
            .with_api_key(api_key)
            .with_api_base(api_base);
        Self::with_client(Client::with_config(config))
    }

    pub fn with_client(client: Client<OpenAIConfig>) -> Self {
        Self {
            client,
            model: GPT_35_TURBO.to_string(),
            temperature: 0.7,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletion {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(EDUCATIONAL_SYSTEM_PROMPT)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?
                    .into(),
            ])
            .max_tokens(max_tokens)
            .temperature(self.temperature)
            .build()?;

        let response = self.client.chat().create(request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| LlmError::InvalidResponse("missing completion content".to_string()))
    }
}
