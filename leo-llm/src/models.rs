//! Per-model generation settings and model routing.

use std::time::Duration;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    UltraHigh,
    High,
    Medium,
    Low,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
    pub priority: Priority,
}

impl ModelConfig {
    const fn new(max_tokens: u32, temperature: f32, timeout_secs: u64, priority: Priority) -> Self {
        Self {
            max_tokens,
            temperature,
            timeout: Duration::from_secs(timeout_secs),
            priority,
        }
    }
}

/// Settings used for models missing from [`MODEL_CONFIGS`].
pub const DEFAULT_MODEL_CONFIG: ModelConfig = ModelConfig::new(2000, 0.7, 60, Priority::Medium);

pub const DEFAULT_CHAT_MODEL: &str = "google/gemma-2-9b-it";
pub const FALLBACK_MODEL: &str = "openai/gpt-5";

pub const MODEL_CONFIGS: &[(&str, ModelConfig)] = &[
    // Groq-served models
    ("moonshotai/kimi-k2-0905", ModelConfig::new(2000, 0.6, 8, Priority::UltraHigh)),
    ("openai/gpt-oss-120b", ModelConfig::new(2000, 0.7, 10, Priority::High)),
    ("meta-llama/llama-guard-4-12b", ModelConfig::new(1500, 0.5, 6, Priority::UltraHigh)),
    ("deepseek/deepseek-r1-distill-llama-70b", ModelConfig::new(2000, 0.6, 8, Priority::High)),
    ("google/gemma-2-9b-it", ModelConfig::new(1500, 0.6, 5, Priority::UltraHigh)),
    // slower fallbacks
    ("deepseek/deepseek-chat-v3.1", ModelConfig::new(1500, 0.6, 30, Priority::Medium)),
    ("openai/gpt-5", ModelConfig::new(2000, 0.7, 45, Priority::Medium)),
    ("anthropic/claude-sonnet-4", ModelConfig::new(2000, 0.7, 50, Priority::Low)),
    ("google/gemini-2.5-pro", ModelConfig::new(1500, 0.6, 60, Priority::Low)),
    ("qwen/qwen3-coder", ModelConfig::new(1800, 0.6, 40, Priority::Medium)),
    ("x-ai/grok-code-fast-1", ModelConfig::new(1500, 0.6, 35, Priority::Medium)),
];

pub fn model_config(model: &str) -> ModelConfig {
    MODEL_CONFIGS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, config)| *config)
        .unwrap_or(DEFAULT_MODEL_CONFIG)
}

const CODE_KEYWORDS: &[&str] = &["code", "function", "program", "script", "algorithm", "debug", "error"];
const MATH_KEYWORDS: &[&str] = &["solve", "calculate", "equation", "math", "derivative", "integral", "algebra"];
const CREATIVE_KEYWORDS: &[&str] = &["write", "create", "story", "poem", "creative", "imagine"];
const SAFETY_KEYWORDS: &[&str] = &["security", "safety", "guard", "filter", "moderate"];

fn mentions_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

/// Picks the chat model. An explicitly requested model always wins.
pub fn select_optimal_model(message: &str, requested: &str) -> String {
    if !requested.is_empty() {
        return requested.to_string();
    }

    let message = message.to_lowercase();
    let model = if mentions_any(&message, CODE_KEYWORDS) {
        "google/gemma-2-9b-it"
    } else if mentions_any(&message, MATH_KEYWORDS) {
        "deepseek/deepseek-r1-distill-llama-70b"
    } else if mentions_any(&message, CREATIVE_KEYWORDS) {
        "moonshotai/kimi-k2-0905"
    } else if mentions_any(&message, SAFETY_KEYWORDS) {
        "meta-llama/llama-guard-4-12b"
    } else {
        DEFAULT_CHAT_MODEL
    };
    model.to_string()
}

const GENERAL_PRIORITY: &[&str] = &[
    "deepseek/deepseek-chat-v3.1",
    "openai/gpt-5",
    "x-ai/grok-code-fast-1",
    "anthropic/claude-sonnet-4",
    "qwen/qwen3-coder",
    "google/gemini-2.5-pro",
];

/// Picks one of `available` for `prompt`.
pub fn select_from_available(prompt: &str, available: &[&str]) -> String {
    let prompt = prompt.to_lowercase();
    let has = |model: &str| available.iter().any(|candidate| *candidate == model);

    if mentions_any(&prompt, &["code", "function", "program", "script", "algorithm"]) {
        for model in ["deepseek/deepseek-chat-v3.1", "qwen/qwen3-coder"] {
            if has(model) {
                return model.to_string();
            }
        }
    }

    if mentions_any(&prompt, &["solve", "calculate", "equation", "math", "derivative"]) {
        for model in ["openai/gpt-5", "anthropic/claude-sonnet-4"] {
            if has(model) {
                return model.to_string();
            }
        }
    }

    GENERAL_PRIORITY
        .iter()
        .find(|model| has(**model))
        .or_else(|| available.first())
        .copied()
        .unwrap_or(FALLBACK_MODEL)
        .to_string()
}
