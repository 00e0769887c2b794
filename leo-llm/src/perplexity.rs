//! Perplexity Sonar research client.

use std::time::Duration;

use crate::openai_compatible::{OpenAiCompatibleClient, RequestOptions};
use crate::LlmError;
use leo_core::{LlmRequest, Message};

pub const PERPLEXITY_BASE_URL: &str = "https://api.perplexity.ai";
pub const SONAR_MODEL: &str = "sonar";

const MAX_CONCEPTS: usize = 8;

const CONCEPTS_SYSTEM_PROMPT: &str = "You are a knowledgeable educational assistant that helps \
identify key learning concepts. Provide clear, concise responses.";
const SEARCH_SYSTEM_PROMPT: &str =
    "You are a helpful research assistant. Provide concise, accurate information.";

#[derive(Clone, Debug)]
pub struct PerplexityClient {
    client: OpenAiCompatibleClient,
}

impl PerplexityClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_base_url(api_key, PERPLEXITY_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Result<Self, LlmError> {
        let client = OpenAiCompatibleClient::builder()
            .base_url(base_url)?
            .api_key(api_key)
            .default_model(SONAR_MODEL)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }

    async fn ask(&self, system: &str, user: String) -> Result<String, LlmError> {
        let request = LlmRequest::new(
            SONAR_MODEL,
            vec![Message::system(system), Message::user(user)],
        )
        .with_max_tokens(500)
        .with_temperature(0.3);
        let response = self
            .client
            .complete(request, RequestOptions::default())
            .await?;
        Ok(response.content)
    }

    /// Six to eight key concepts for learning `topic` towards `prompt`.
    pub async fn key_concepts(&self, topic: &str, prompt: &str) -> Result<Vec<String>, LlmError> {
        let query = format!(
            "Based on the topic \"{topic}\" and the learning goal \"{prompt}\", \
identify 6-8 key concepts that are essential for understanding this subject.\n\n\
Please provide a concise list of the most important concepts, principles, \
or skills that someone should learn to master this topic.\n\n\
Format your response as a simple list, one concept per line."
        );
        let content = self.ask(CONCEPTS_SYSTEM_PROMPT, query).await?;
        let concepts = parse_concepts(&content);
        tracing::info!(count = concepts.len(), "retrieved concepts from Perplexity");
        Ok(concepts)
    }

    pub async fn web_search(&self, query: &str) -> Result<String, LlmError> {
        self.ask(SEARCH_SYSTEM_PROMPT, query.to_string()).await
    }
}

/// Extracts list items: headings and `*` lines are skipped, numbering and bullets stripped.
pub fn parse_concepts(content: &str) -> Vec<String> {
    content
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('*'))
        .map(|line| {
            line.trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, '.' | '-' | '*' | ' '))
                .trim()
        })
        .filter(|concept| concept.chars().count() > 3)
        .take(MAX_CONCEPTS)
        .map(str::to_string)
        .collect()
}
