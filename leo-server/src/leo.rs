//! Leo, the learning assistant: system prompt, tools, routing heuristics and
//! the streaming chat turn.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use leo_core::{ChatEvent, Document, LlmRequest, Message, ToolCall, ToolSpec};
use leo_llm::models::{model_config, DEFAULT_CHAT_MODEL};
use leo_llm::{LlmError, OpenAiCompatibleClient, PerplexityClient, RequestOptions, StreamEvent};
use serde_json::json;
use tracing::Instrument;

pub const SYSTEM_PROMPT: &str = r#"You are Leo, an AI assistant specialized in helping people learn programming, mathematics/STEM, and software engineering concepts.
You are knowledgeable, patient, and encouraging.

## Core Behavior
- Always explain concepts in a clear, step-by-step way with practical examples.
- Be supportive and conversational to keep learners engaged.
- When appropriate, call one of your tools instead of generating plain text.
- After calling a tool, explain the result to the learner in natural language.

## Available Tools
1. `write_code(language, code, explanation, use_case)` - generate code with comments and explanations
2. `write_math(formula, explanation, steps, context)` - return math in LaTeX with reasoning
3. `write_diagrams(diagram_type, mermaid_code, description, learning_points)` - create visual diagrams in Mermaid
4. `write_quiz(question, options, correct_answer, explanation, difficulty)` - create quizzes with multiple choice answers
5. `use_rag_search(query, reason)` - search in uploaded documents
6. `use_web_search(query, reason)` - search the web for current information

## How to Decide When to Use Tools
- If the user asks for code → call `write_code`
- If the user asks to solve or explain a math problem → call `write_math`
- If the user asks for a diagram, flowchart, or visualization → call `write_diagrams`
- If the user asks for practice questions, tests, or quizzes → call `write_quiz`
- If the user refers to uploaded files or documents → call `use_rag_search`
- If the user asks about real-time info, news, or the "latest" version of something → call `use_web_search`
- Always prefer tools when they add clarity, structure, or interactivity to the learning process.

## Examples
**Example 1 - Code**
User: "Can you show me a Python function that reverses a string?"
Assistant: (call `write_code` with language="python", code="...", explanation="...", use_case="...")

**Example 2 - Math**
User: "How do I solve quadratic equations?"
Assistant: (call `write_math` with formula="x = (-b ± √(b^2 - 4ac)) / 2a", explanation="...", steps="...", context="...")

**Example 3 - Diagram**
User: "Can you draw me a flowchart for a login process?"
Assistant: (call `write_diagrams` with diagram_type="flowchart", mermaid_code="...", description="...", learning_points="...")

**Example 4 - Quiz**
User: "Give me a quiz question about binary search."
Assistant: (call `write_quiz` with question="...", options=["A", "B", "C", "D"], correct_answer="B", explanation="...", difficulty="intermediate")

**Example 5 - RAG Search**
User: "What did the uploaded document say about climate policy?"
Assistant: (call `use_rag_search` with query="climate policy", reason="The user asked about content inside uploaded documents.")

**Example 6 - Web Search**
User: "What's the latest version of Python right now?"
Assistant: (call `use_web_search` with query="latest version of Python", reason="The user asked for current info.")

---

Remember: Always respond in a warm, encouraging way, and after a tool call, explain the results in natural language so the learner understands them.
"#;

const FIRST_MESSAGE_SYSTEM_PROMPT: &str =
    "You are Leo, an enthusiastic AI learning assistant. Be encouraging, helpful, and conversational.";

/// Tools whose arguments are forwarded to the client untouched.
pub const CONTENT_TOOLS: &[&str] = &["write_code", "write_math", "write_diagrams", "write_quiz"];

const RAG_KEYWORDS: &[&str] = &[
    "document",
    "file",
    "uploaded",
    "reference",
    "according to",
    "based on",
    "from the",
    "in the document",
    "what does it say",
    "summarize",
    "extract",
    "find in",
    "search in",
];

const WEB_KEYWORDS: &[&str] = &[
    "current",
    "latest",
    "recent",
    "today",
    "now",
    "2024",
    "2025",
    "news",
    "update",
    "what's new",
    "recently",
    "latest version",
    "current state",
    "nowadays",
    "these days",
];

const RAG_CONTEXT_DOCS: usize = 5;
const RAG_CONTEXT_CHARS: usize = 500;

fn mentions_any(message: &str, keywords: &[&str]) -> bool {
    let message = message.to_lowercase();
    keywords.iter().any(|keyword| message.contains(keyword))
}

/// Whether the message refers to uploaded material. Always false without uploads.
pub fn should_use_rag(message: &str, has_uploaded_files: bool) -> bool {
    has_uploaded_files && mentions_any(message, RAG_KEYWORDS)
}

pub fn should_use_web_search(message: &str) -> bool {
    mentions_any(message, WEB_KEYWORDS)
}

fn tool(name: &str, description: &str, parameters: serde_json::Value) -> ToolSpec {
    ToolSpec {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
    }
}

pub fn leo_tools() -> Vec<ToolSpec> {
    vec![
        tool(
            "write_code",
            "Generate code snippets in any programming language with explanations and comments",
            json!({
                "type": "object",
                "properties": {
                    "language": {"type": "string", "description": "Programming language (e.g., python, javascript, java, c++, etc.)"},
                    "code": {"type": "string", "description": "The code snippet to generate"},
                    "explanation": {"type": "string", "description": "Explanation of what the code does and how it works"},
                    "use_case": {"type": "string", "description": "When and why you would use this code"}
                },
                "required": ["language", "code", "explanation"]
            }),
        ),
        tool(
            "write_math",
            "Generate mathematical formulas and work in LaTeX format with proper rendering",
            json!({
                "type": "object",
                "properties": {
                    "formula": {"type": "string", "description": "The mathematical formula or equation in LaTeX format"},
                    "explanation": {"type": "string", "description": "Explanation of the mathematical concept and how to solve it"},
                    "steps": {"type": "string", "description": "Step-by-step solution process (optional)"},
                    "context": {"type": "string", "description": "When and where this mathematical concept is used"}
                },
                "required": ["formula", "explanation"]
            }),
        ),
        tool(
            "write_diagrams",
            "Create diagrams using Mermaid syntax for visual learning",
            json!({
                "type": "object",
                "properties": {
                    "diagram_type": {"type": "string", "description": "Type of diagram (flowchart, sequence, class, etc.)"},
                    "mermaid_code": {"type": "string", "description": "Mermaid diagram code"},
                    "description": {"type": "string", "description": "Description of what the diagram shows"},
                    "learning_points": {"type": "string", "description": "Key learning points from the diagram"}
                },
                "required": ["diagram_type", "mermaid_code", "description"]
            }),
        ),
        tool(
            "write_quiz",
            "Generate quizzes with questions and multiple choice answers",
            json!({
                "type": "object",
                "properties": {
                    "question": {"type": "string", "description": "The quiz question"},
                    "options": {"type": "array", "items": {"type": "string"}, "description": "Multiple choice options (A, B, C, D)"},
                    "correct_answer": {"type": "string", "description": "The correct answer (A, B, C, or D)"},
                    "explanation": {"type": "string", "description": "Explanation of why the correct answer is right"},
                    "difficulty": {"type": "string", "enum": ["beginner", "intermediate", "advanced"], "description": "Difficulty level of the question"}
                },
                "required": ["question", "options", "correct_answer", "explanation"]
            }),
        ),
        tool(
            "use_rag_search",
            "Search through uploaded documents/files for relevant information",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search query for the RAG system"},
                    "reason": {"type": "string", "description": "Why you need to search the uploaded documents"}
                },
                "required": ["query", "reason"]
            }),
        ),
        tool(
            "use_web_search",
            "Search the web for current information using Perplexity",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search query for web search"},
                    "reason": {"type": "string", "description": "Why you need current web information"}
                },
                "required": ["query", "reason"]
            }),
        ),
    ]
}

/// `Source: ...\nContent: ...\n` blocks for the first few documents.
pub fn format_rag_context(documents: &[Document]) -> String {
    documents
        .iter()
        .take(RAG_CONTEXT_DOCS)
        .enumerate()
        .map(|(i, doc)| {
            let content: String = doc.content.chars().take(RAG_CONTEXT_CHARS).collect();
            let source = doc
                .source()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Document {}", i + 1));
            format!("Source: {source}\nContent: {content}\n")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Counts documents containing any word of `query`.
pub fn keyword_search(query: &str, documents: &[Document]) -> String {
    let words: Vec<String> = query.to_lowercase().split_whitespace().map(str::to_string).collect();
    let found = documents
        .iter()
        .filter(|doc| {
            let content = doc.content.to_lowercase();
            words.iter().any(|word| content.contains(word.as_str()))
        })
        .count();

    if found > 0 {
        format!("Found {found} relevant documents for query: '{query}'")
    } else {
        format!("No relevant documents found for query: '{query}'")
    }
}

pub fn fallback_first_message(topic: &str, key_concepts: &[String]) -> String {
    let concepts = key_concepts
        .iter()
        .take(3)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Hi there! I'm Leo, your AI learning assistant. I'm excited to help you explore {topic}! \
I've identified some key concepts like {concepts} that we can dive into. \
How would you like to start your learning journey?"
    )
}

/// One chat turn as decided by the chat handler.
#[derive(Clone, Debug, Default)]
pub struct ChatTurn {
    pub message: String,
    pub model: String,
    pub documents: Vec<Document>,
    pub use_rag: bool,
    pub use_web_search: bool,
}

impl ChatTurn {
    fn messages(&self) -> Vec<Message> {
        let mut messages = vec![Message::system(SYSTEM_PROMPT), Message::user(&self.message)];
        if self.use_rag && !self.documents.is_empty() {
            let context = format_rag_context(&self.documents);
            if !context.is_empty() {
                messages.push(Message::system(format!(
                    "Additional context from uploaded documents:\n\n{context}"
                )));
            }
        }
        messages
    }
}

enum Upstream {
    Event(Result<StreamEvent, LlmError>),
    Stalled(Duration),
}

#[derive(Clone)]
pub struct LeoService {
    openrouter: OpenAiCompatibleClient,
    perplexity: Option<PerplexityClient>,
}

impl LeoService {
    pub fn new(openrouter: OpenAiCompatibleClient, perplexity: Option<PerplexityClient>) -> Self {
        Self {
            openrouter,
            perplexity,
        }
    }

    pub async fn web_search(&self, query: &str) -> String {
        let Some(perplexity) = &self.perplexity else {
            return "Web search not available - API key not configured".to_string();
        };
        match perplexity.web_search(query).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::error!(error = %err, "web search failed");
                match err.status() {
                    Some(status) => format!("Web search error: {status}"),
                    None => format!("Web search error: {err}"),
                }
            }
        }
    }

    /// Streams Leo's answer. Content arrives as it is generated; tool calls
    /// are emitted once the upstream stream ends.
    pub fn chat(&self, turn: ChatTurn) -> BoxStream<'static, ChatEvent> {
        if !self.openrouter.has_api_key() {
            tracing::error!("chat requested without an OpenRouter key");
            let err = LlmError::MissingApiKey("OPENROUTER_API_KEY");
            return stream::iter([ChatEvent::error(err.to_string())]).boxed();
        }

        let config = model_config(&turn.model);
        let request = LlmRequest::new(turn.model.clone(), turn.messages())
            .with_tools(leo_tools())
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens);
        let span = tracing::info_span!("leo_chat", model = %turn.model);

        // the model timeout bounds the wait for each chunk, not the whole answer
        let idle = config.timeout;
        let upstream = self.openrouter.stream(request, RequestOptions::default());
        let upstream = stream::unfold(Some(upstream), move |state| async move {
            let mut upstream = state?;
            match tokio::time::timeout(idle, upstream.next()).await {
                Ok(Some(item)) => Some((Upstream::Event(item), Some(upstream))),
                Ok(None) => None,
                Err(_) => Some((Upstream::Stalled(idle), None)),
            }
        });

        let service = self.clone();
        let turn = Arc::new(turn);
        upstream
            .then(move |item| {
                let service = service.clone();
                let turn = Arc::clone(&turn);
                let span = span.clone();
                async move {
                    match item {
                        Upstream::Event(Ok(StreamEvent::Content(text))) => {
                            vec![ChatEvent::content(text)]
                        }
                        Upstream::Event(Ok(StreamEvent::Done { tool_calls })) => {
                            service.resolve_tool_calls(tool_calls, &turn).await
                        }
                        Upstream::Event(Ok(_)) => Vec::new(),
                        Upstream::Event(Err(err)) => {
                            tracing::error!(error = %err, "error streaming chat response");
                            vec![ChatEvent::error(stream_error_message(&err))]
                        }
                        Upstream::Stalled(after) => {
                            tracing::error!(timeout_secs = after.as_secs(), "chat stream stalled");
                            vec![ChatEvent::error(format!(
                                "Request timed out after {}s",
                                after.as_secs()
                            ))]
                        }
                    }
                }
                .instrument(span)
            })
            .flat_map(stream::iter)
            .boxed()
    }

    async fn resolve_tool_calls(&self, tool_calls: Vec<ToolCall>, turn: &ChatTurn) -> Vec<ChatEvent> {
        let mut events = Vec::with_capacity(tool_calls.len());
        for call in tool_calls {
            let query = call
                .args
                .get("query")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string();
            match call.name.as_str() {
                name if CONTENT_TOOLS.contains(&name) => {
                    events.push(ChatEvent::tool_call(name, call.args.clone(), None));
                }
                "use_rag_search" if turn.use_rag && !turn.documents.is_empty() => {
                    let result = keyword_search(&query, &turn.documents);
                    events.push(ChatEvent::tool_call("use_rag_search", call.args.clone(), Some(result)));
                }
                "use_web_search" if turn.use_web_search => {
                    let result = self.web_search(&query).await;
                    events.push(ChatEvent::tool_call("use_web_search", call.args.clone(), Some(result)));
                }
                other => tracing::debug!(tool = other, "dropping inactive tool call"),
            }
        }
        events
    }

    /// Leo's greeting after ingestion. Falls back to a template when the model is unavailable.
    pub async fn generate_first_message(
        &self,
        concept_summary: &str,
        key_concepts: &[String],
        topic: &str,
    ) -> String {
        if !self.openrouter.has_api_key() {
            return fallback_first_message(topic, key_concepts);
        }

        let prompt = format!(
            "You are Leo, an AI learning assistant. Based on this research summary about {topic}:\n\n\
{concept_summary}\n\n\
Key concepts identified: {concepts}\n\n\
Generate a warm, engaging first message to start a learning conversation. The message should:\n\
1. Acknowledge the learner's interest in {topic}\n\
2. Reference the key concepts naturally\n\
3. Ask how they'd like to continue learning\n\
4. Be encouraging and supportive\n\
5. Keep it conversational and not too long (2-3 sentences)\n\n\
Make it feel like you're excited to help them learn!",
            concepts = key_concepts.join(", ")
        );
        let request = LlmRequest::new(
            DEFAULT_CHAT_MODEL,
            vec![Message::system(FIRST_MESSAGE_SYSTEM_PROMPT), Message::user(prompt)],
        )
        .with_max_tokens(150)
        .with_temperature(0.8);

        match self
            .openrouter
            .complete(request, RequestOptions::with_timeout(Duration::from_secs(30)))
            .await
        {
            Ok(response) if !response.content.trim().is_empty() => {
                response.content.trim().to_string()
            }
            Ok(_) => fallback_first_message(topic, key_concepts),
            Err(err) => {
                tracing::error!(error = %err, "error generating first message");
                fallback_first_message(topic, key_concepts)
            }
        }
    }
}

fn stream_error_message(err: &LlmError) -> String {
    match err {
        LlmError::Api { status, .. } => format!("API error: {status}"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str, source: Option<&str>) -> Document {
        let doc = Document::new(content);
        match source {
            Some(source) => doc.with_metadata("source", source),
            None => doc,
        }
    }

    #[test]
    fn rag_needs_uploads_and_a_keyword() {
        assert!(!should_use_rag("summarize the document", false));
        assert!(should_use_rag("Summarize the document", true));
        assert!(!should_use_rag("what is recursion", true));
    }

    #[test]
    fn web_search_keywords() {
        assert!(should_use_web_search("What's the LATEST Rust release?"));
        assert!(!should_use_web_search("explain ownership"));
    }

    #[test]
    fn rag_context_keeps_five_documents_and_truncates() {
        let long = "x".repeat(900);
        let docs: Vec<Document> = (0..7)
            .map(|i| doc(&long, if i == 0 { Some("https://a.test") } else { None }))
            .collect();
        let context = format_rag_context(&docs);
        assert_eq!(context.matches("Source: ").count(), 5);
        assert!(context.starts_with("Source: https://a.test\nContent: "));
        assert!(context.contains("Source: Document 2\n"));
        assert!(!context.contains(&"x".repeat(501)));
    }

    #[test]
    fn keyword_search_counts_matching_documents() {
        let docs = vec![doc("Ownership rules", None), doc("borrowing", None), doc("traits", None)];
        assert_eq!(
            keyword_search("ownership borrowing", &docs),
            "Found 2 relevant documents for query: 'ownership borrowing'"
        );
        assert_eq!(
            keyword_search("lifetimes", &docs),
            "No relevant documents found for query: 'lifetimes'"
        );
    }

    #[test]
    fn six_tools_are_offered() {
        let names: Vec<String> = leo_tools().into_iter().map(|tool| tool.name).collect();
        assert_eq!(
            names,
            [
                "write_code",
                "write_math",
                "write_diagrams",
                "write_quiz",
                "use_rag_search",
                "use_web_search"
            ]
        );
    }

    #[test]
    fn rag_context_is_only_added_when_active() {
        let mut turn = ChatTurn {
            message: "hi".into(),
            model: DEFAULT_CHAT_MODEL.into(),
            documents: vec![doc("content", Some("notes.md"))],
            use_rag: false,
            use_web_search: false,
        };
        assert_eq!(turn.messages().len(), 2);
        turn.use_rag = true;
        let messages = turn.messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[2]
            .content
            .starts_with("Additional context from uploaded documents:\n\nSource: notes.md"));
    }

    #[test]
    fn fallback_greeting_names_three_concepts() {
        let concepts: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let message = fallback_first_message("Rust", &concepts);
        assert!(message.contains("explore Rust!"));
        assert!(message.contains("key concepts like a, b, c that"));
    }
}
