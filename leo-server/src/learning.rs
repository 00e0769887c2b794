//! Learning content generated around a topic: per-concept explanations, a
//! summary for Leo's first message and study suggestions.
//!
//! Providers are tried in order (OpenAI, then Anthropic). When none answers,
//! every operation falls back to template text, so callers never see an error.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use leo_core::{cache_key, run_parallel, ttl, CacheManager, DEFAULT_MAX_CONCURRENT, DEFAULT_TASK_TIMEOUT};
use leo_llm::CompletionProvider;
use serde_json::json;

const MAX_SUGGESTIONS: usize = 6;
const MIN_SUGGESTION_CHARS: usize = 10;

#[derive(Clone)]
pub struct LearningContent {
    providers: Vec<Arc<dyn CompletionProvider>>,
    cache: Arc<CacheManager>,
}

impl LearningContent {
    pub fn new(providers: Vec<Arc<dyn CompletionProvider>>, cache: Arc<CacheManager>) -> Self {
        Self { providers, cache }
    }

    /// First non-empty answer from the configured providers.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Option<String> {
        for provider in &self.providers {
            match provider.complete(prompt, max_tokens).await {
                Ok(text) if !text.trim().is_empty() => return Some(text.trim().to_string()),
                Ok(_) => tracing::warn!(provider = provider.name(), "empty completion"),
                Err(err) => tracing::error!(provider = provider.name(), error = %err, "completion failed"),
            }
        }
        None
    }

    /// Explanation per concept, at most five generated at once. A concept whose
    /// providers fail or take longer than 30 s gets template text.
    pub async fn concept_explanations(
        &self,
        key_concepts: &[String],
        topic: &str,
        prompt: &str,
    ) -> BTreeMap<String, String> {
        let key = cache_key(
            "llm_concept_explanations",
            &json!({ "key_concepts": key_concepts, "topic": topic, "prompt": prompt }),
        );
        if let Some(cached) = self.cache.get_as(&key) {
            return cached;
        }

        let tasks: Vec<(String, BoxFuture<'_, Result<String, String>>)> = key_concepts
            .iter()
            .map(|concept| {
                let task = async move {
                    self.complete(&explanation_prompt(concept, topic, prompt), 150)
                        .await
                        .ok_or_else(|| format!("no explanation for {concept}"))
                };
                (concept.clone(), task.boxed())
            })
            .collect();
        let explanations: BTreeMap<String, String> =
            run_parallel(tasks, DEFAULT_MAX_CONCURRENT, DEFAULT_TASK_TIMEOUT)
                .await
                .into_iter()
                .map(|(concept, outcome)| {
                    let explanation = outcome
                        .ok()
                        .unwrap_or_else(|| fallback_explanation(&concept, topic, prompt));
                    (concept, explanation)
                })
                .collect();

        self.cache.set_as(key, &explanations, Some(ttl::LLM_CONTENT));
        explanations
    }

    /// Two or three paragraphs introducing the topic.
    pub async fn concept_summary(&self, key_concepts: &[String], topic: &str, prompt: &str) -> String {
        let key = cache_key(
            "llm_concept_summary",
            &json!({ "key_concepts": key_concepts, "topic": topic, "prompt": prompt }),
        );
        if let Some(cached) = self.cache.get_as(&key) {
            return cached;
        }

        let summary_prompt = format!(
            "Based on the following learning context:\n\
- Topic: {topic}\n\
- Learning Goal: {prompt}\n\
- Key Concepts: {concepts}\n\n\
Create a comprehensive 2-3 paragraph summary that:\n\
1. Introduces the topic and its importance\n\
2. Explains how the key concepts relate to the learning goal\n\
3. Sets up an engaging learning journey\n\n\
This summary will be used by an AI assistant (Leo) to start a conversation with a learner.\n\
Make it encouraging, informative, and set up the learner for success.\n\
Keep it conversational and engaging.",
            concepts = key_concepts.join(", ")
        );
        let summary = self
            .complete(&summary_prompt, 300)
            .await
            .unwrap_or_else(|| fallback_summary(topic, prompt, key_concepts));

        self.cache.set_as(key, &summary, Some(ttl::LLM_CONTENT));
        summary
    }

    pub async fn learning_suggestions(
        &self,
        concept_explanations: &BTreeMap<String, String>,
        topic: &str,
        prompt: &str,
    ) -> Vec<String> {
        let key = cache_key(
            "llm_learning_suggestions",
            &json!({ "concept_explanations": concept_explanations, "topic": topic, "prompt": prompt }),
        );
        if let Some(cached) = self.cache.get_as(&key) {
            return cached;
        }

        let concepts = concept_explanations
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let suggestions_prompt = format!(
            "Based on the following learning context:\n\
- Topic: {topic}\n\
- Learning Goal: {prompt}\n\
- Key Concepts: {concepts}\n\n\
Generate 6 personalized learning suggestions that will help someone effectively learn this topic.\n\
Focus on practical, actionable advice that considers the specific concepts and learning goal.\n\n\
Format as a numbered list of suggestions."
        );
        let suggestions = match self.complete(&suggestions_prompt, 400).await {
            Some(response) => {
                let mut parsed = parse_suggestions(&response);
                parsed.truncate(MAX_SUGGESTIONS);
                parsed
            }
            None => fallback_suggestions(topic),
        };

        self.cache.set_as(key, &suggestions, Some(ttl::LLM_CONTENT));
        suggestions
    }
}

fn explanation_prompt(concept: &str, topic: &str, prompt: &str) -> String {
    format!(
        "Provide a clear, concise explanation of \"{concept}\" in the context of learning {topic}.\n\n\
The learner's goal is: {prompt}\n\n\
Write 2-3 sentences that:\n\
1. Define what {concept} is\n\
2. Explain why it's important for this learning goal\n\
3. Give a brief practical context\n\n\
Keep it educational but accessible."
    )
}

pub fn fallback_explanation(concept: &str, topic: &str, prompt: &str) -> String {
    format!(
        "Brief explanation of {concept} in the context of {topic}. This concept is fundamental \
to understanding {prompt} and provides the foundation for advanced learning in this area."
    )
}

pub fn fallback_summary(topic: &str, prompt: &str, key_concepts: &[String]) -> String {
    let concepts = key_concepts
        .iter()
        .take(3)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Welcome to your learning journey in {topic}! \n\n\
This is an exciting field that will help you achieve your goal: {prompt}. We've identified key \
concepts like {concepts} that are essential for mastering this topic. These concepts form the \
foundation of your learning path and will guide you toward success.\n\n\
I'm here to help you explore these concepts, answer your questions, and provide hands-on examples. \
How would you like to start learning? Would you prefer to dive into the fundamentals, work on a \
practical project, or explore a specific concept that interests you most?"
    )
}

pub fn fallback_suggestions(topic: &str) -> Vec<String> {
    vec![
        format!("Start with the fundamentals of {topic} to build a strong foundation"),
        "Practice with hands-on coding exercises and projects".to_string(),
        "Join online communities and forums for peer learning".to_string(),
        "Create a personal project to apply what you learn".to_string(),
        "Set up a study schedule with regular review sessions".to_string(),
        "Find a mentor or study group for guidance and motivation".to_string(),
    ]
}

/// Numbered or bulleted lines, markers stripped, short items dropped.
pub fn parse_suggestions(content: &str) -> Vec<String> {
    content
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| {
            line.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '*')
        })
        .map(|line| {
            line.trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, '.' | '-' | '*' | ' '))
                .trim()
        })
        .filter(|suggestion| suggestion.chars().count() > MIN_SUGGESTION_CHARS)
        .map(str::to_string)
        .collect()
}
