//! Generic OpenAI-compatible chat client
//!
//! Used for OpenRouter (Leo's chat models) and Perplexity Sonar, both of which speak
//! the OpenAI chat completions format.

use std::collections::BTreeMap;
use std::time::Duration;

use bytes::BytesMut;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use crate::LlmError;
use leo_core::{LlmRequest, LlmResponse, Message, ToolCall, ToolSpec};

/// Request body for chat completions endpoint
#[derive(Serialize, Debug, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WireTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: WireFunction,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WireFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl From<&ToolSpec> for WireTool {
    fn from(tool: &ToolSpec) -> Self {
        Self {
            kind: "function".to_string(),
            function: WireFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }
}

/// Non-streaming response from chat completions
#[derive(Deserialize, Debug, Clone)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResponseMessage {
    #[serde(default)]
    pub role: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResponseToolCall {
    #[serde(default)]
    pub id: String,
    pub function: ResponseFunction,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResponseFunction {
    pub name: String,
    /// Usually a JSON-encoded string; some providers send an object.
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Streaming chunk (server-sent events)
#[derive(Deserialize, Debug, Clone)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Delta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallChunk>>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ToolCallChunk {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionChunk>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct FunctionChunk {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// OpenAI-style error response
#[derive(Deserialize, Debug, Clone)]
pub struct OpenAiError {
    pub error: ErrorDetail,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub code: Option<Value>,
}

/// Events produced while reading a streamed completion.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    Content(String),
    ToolCallStart { index: usize, id: String, name: String },
    ToolCallArguments { index: usize, delta: String },
    /// End of stream, with every tool call assembled from its deltas.
    Done { tool_calls: Vec<ToolCall> },
}

/// Per-request overrides.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

#[derive(Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Merges streamed tool-call fragments by their `index`.
#[derive(Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<usize, PartialToolCall>,
}

impl ToolCallAccumulator {
    /// Applies one fragment and returns the events it produces.
    pub fn push(&mut self, chunk: &ToolCallChunk) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        let call = self.calls.entry(chunk.index).or_default();

        if let Some(id) = chunk.id.as_deref().filter(|id| !id.is_empty()) {
            if call.id.is_empty() {
                call.id = id.to_string();
            }
        }

        let Some(function) = &chunk.function else {
            return events;
        };

        if let Some(name) = function.name.as_deref().filter(|name| !name.is_empty()) {
            if call.name.is_empty() {
                call.name = name.to_string();
                events.push(StreamEvent::ToolCallStart {
                    index: chunk.index,
                    id: call.id.clone(),
                    name: call.name.clone(),
                });
            }
        }

        if let Some(arguments) = function.arguments.as_deref().filter(|args| !args.is_empty()) {
            call.arguments.push_str(arguments);
            events.push(StreamEvent::ToolCallArguments {
                index: chunk.index,
                delta: arguments.to_string(),
            });
        }

        events
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Completed calls in index order. Unnamed fragments are dropped and
    /// unparseable arguments become `{}`.
    pub fn finish(&mut self) -> Vec<ToolCall> {
        std::mem::take(&mut self.calls)
            .into_iter()
            .filter(|(_, call)| !call.name.is_empty())
            .map(|(index, call)| ToolCall {
                id: if call.id.is_empty() {
                    format!("call_{index}")
                } else {
                    call.id
                },
                args: parse_arguments(&call.arguments),
                name: call.name,
            })
            .collect()
    }
}

fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "tool call arguments are not valid JSON");
            json!({})
        }
    }
}

fn parse_sse_line(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix("data:")
        .map(str::trim_start)
}

/// Incremental decoder for `text/event-stream` chat completion bodies.
#[derive(Default)]
pub struct SseDecoder {
    buffer: BytesMut,
    tools: ToolCallAccumulator,
    finished: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feeds raw bytes; complete lines are decoded, partial ones stay buffered.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(pos + 1);
            let line = String::from_utf8_lossy(&line);
            if self.decode_line(&line, &mut events) {
                break;
            }
        }
        events
    }

    /// Flushes a trailing unterminated line and closes the stream.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let rest = self.buffer.split();
            let line = String::from_utf8_lossy(&rest);
            if self.decode_line(&line, &mut events) {
                return events;
            }
        }
        events.push(self.done());
        events
    }

    fn done(&mut self) -> StreamEvent {
        self.finished = true;
        StreamEvent::Done {
            tool_calls: self.tools.finish(),
        }
    }

    /// Returns true once `[DONE]` has been seen.
    fn decode_line(&mut self, line: &str, events: &mut Vec<StreamEvent>) -> bool {
        let Some(data) = parse_sse_line(line) else {
            return false;
        };
        if data == "[DONE]" {
            events.push(self.done());
            return true;
        }

        let chunk = match serde_json::from_str::<ChatCompletionChunk>(data) {
            Ok(chunk) => chunk,
            Err(err) => {
                tracing::debug!(error = %err, "skipping malformed stream chunk");
                return false;
            }
        };

        let Some(choice) = chunk.choices.into_iter().next() else {
            return false;
        };
        // a delta carrying tool calls is a tool delta; any content beside them is dropped
        if let Some(tool_calls) = &choice.delta.tool_calls {
            for tool_call in tool_calls {
                events.extend(self.tools.push(tool_call));
            }
        } else if let Some(content) = choice.delta.content.filter(|content| !content.is_empty()) {
            events.push(StreamEvent::Content(content));
        }
        false
    }
}

fn parse_stream_response(
    response: reqwest::Response,
) -> BoxStream<'static, Result<StreamEvent, LlmError>> {
    let bytes = response.bytes_stream().boxed();

    stream::unfold(
        (bytes, SseDecoder::new()),
        |(mut bytes, mut decoder)| async move {
            if decoder.is_finished() {
                return None;
            }
            let events: Vec<Result<StreamEvent, LlmError>> = match bytes.next().await {
                Some(Ok(chunk)) => decoder.feed(&chunk).into_iter().map(Ok).collect(),
                Some(Err(err)) => {
                    let _ = decoder.finish();
                    vec![Err(LlmError::Http(err))]
                }
                None => decoder.finish().into_iter().map(Ok).collect(),
            };
            Some((stream::iter(events), (bytes, decoder)))
        },
    )
    .flatten()
    .boxed()
}

async fn error_from_response(response: reqwest::Response) -> LlmError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<OpenAiError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    LlmError::Api {
        status: status.as_u16(),
        message,
    }
}

fn response_into_llm(response: ChatCompletionResponse) -> Result<LlmResponse, LlmError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, call)| ToolCall {
            id: if call.id.is_empty() {
                format!("call_{index}")
            } else {
                call.id
            },
            name: call.function.name,
            args: match call.function.arguments {
                Value::String(raw) => parse_arguments(&raw),
                Value::Null => json!({}),
                other => other,
            },
        })
        .collect();

    Ok(LlmResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
    })
}

#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    default_model: String,
    headers: HeaderMap,
}

impl std::fmt::Debug for OpenAiCompatibleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleClient")
            .field("base_url", &self.base_url.as_str())
            .field("default_model", &self.default_model)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl OpenAiCompatibleClient {
    pub fn builder() -> OpenAiCompatibleBuilder {
        OpenAiCompatibleBuilder::default()
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.base_url.as_str().trim_end_matches('/')
        )
    }

    fn build_request(&self, request: LlmRequest, stream: bool) -> ChatCompletionRequest {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model
        };
        let (tools, tool_choice) = if request.tools.is_empty() {
            (None, None)
        } else {
            (
                Some(request.tools.iter().map(WireTool::from).collect()),
                Some("auto".to_string()),
            )
        };
        ChatCompletionRequest {
            model,
            messages: request.messages,
            tools,
            tool_choice,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        }
    }

    async fn send(
        &self,
        body: &ChatCompletionRequest,
        options: &RequestOptions,
    ) -> Result<reqwest::Response, LlmError> {
        let mut builder = self
            .http
            .post(self.completions_url())
            .headers(self.headers.clone())
            .json(body);
        if let Some(api_key) = &self.api_key {
            builder = builder.header(AUTHORIZATION, format!("Bearer {api_key}"));
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let err = error_from_response(response).await;
            tracing::error!(model = %body.model, error = %err, "chat completion request failed");
            return Err(err);
        }
        Ok(response)
    }

    /// Non-streaming completion.
    pub async fn complete(
        &self,
        request: LlmRequest,
        options: RequestOptions,
    ) -> Result<LlmResponse, LlmError> {
        let body = self.build_request(request, false);
        tracing::debug!(model = %body.model, "chat completion");
        let response = self.send(&body, &options).await?;
        let response = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|err| LlmError::InvalidResponse(err.to_string()))?;
        response_into_llm(response)
    }

    /// Streaming completion. A failed request yields a single error item.
    pub fn stream(
        &self,
        request: LlmRequest,
        options: RequestOptions,
    ) -> BoxStream<'static, Result<StreamEvent, LlmError>> {
        let body = self.build_request(request, true);
        let client = self.clone();

        stream::once(async move {
            tracing::debug!(model = %body.model, "streaming chat completion");
            client.send(&body, &options).await
        })
        .flat_map(|result| match result {
            Ok(response) => parse_stream_response(response),
            Err(err) => stream::iter(vec![Err(err)]).boxed(),
        })
        .boxed()
    }
}

pub struct OpenAiCompatibleBuilder {
    base_url: Option<Url>,
    api_key: Option<String>,
    default_model: Option<String>,
    timeout: Duration,
    headers: Vec<(String, String)>,
}

impl Default for OpenAiCompatibleBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            default_model: None,
            timeout: Duration::from_secs(60),
            headers: Vec::new(),
        }
    }
}

impl OpenAiCompatibleBuilder {
    pub fn base_url(mut self, base_url: &str) -> Result<Self, LlmError> {
        let url = Url::parse(base_url)
            .map_err(|err| LlmError::Config(format!("invalid base url {base_url}: {err}")))?;
        self.base_url = Some(url);
        Ok(self)
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn maybe_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.is_empty());
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn build(self) -> Result<OpenAiCompatibleClient, LlmError> {
        let base_url = self
            .base_url
            .ok_or_else(|| LlmError::Config("base_url is required".to_string()))?;
        let default_model = self
            .default_model
            .ok_or_else(|| LlmError::Config("default_model is required".to_string()))?;

        let mut headers = HeaderMap::new();
        for (name, value) in self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| LlmError::Config(format!("invalid header name {name}: {err}")))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|err| LlmError::Config(format!("invalid header value: {err}")))?;
            headers.insert(name, value);
        }

        let http = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|err| LlmError::Config(err.to_string()))?;

        Ok(OpenAiCompatibleClient {
            http,
            base_url,
            api_key: self.api_key,
            default_model,
            headers,
        })
    }
}
