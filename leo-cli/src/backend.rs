//! Thin client over the two endpoints the deployment checks exercise.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Serialize)]
pub struct ChatProbe<'a> {
    pub message: &'a str,
    pub model: &'a str,
}

/// Outcome of a chat request: status, the first lines of the stream and how long it took.
#[derive(Clone, Debug)]
pub struct ChatOutcome {
    pub status: StatusCode,
    pub lines: Vec<String>,
    pub elapsed: Duration,
}

#[derive(Clone, Debug)]
pub struct Backend {
    http: reqwest::Client,
    base_url: String,
}

impl Backend {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET /api/performance`. Returns the status and, when it parses, the JSON body.
    pub async fn performance(&self, timeout: Duration) -> Result<(StatusCode, Option<Value>)> {
        let url = self.url("/api/performance");
        tracing::debug!(%url, "requesting performance report");
        let response = self
            .http
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;
        let status = response.status();
        let body = response.json::<Value>().await.ok();
        Ok((status, body))
    }

    /// `POST /api/chat`, reading at most `max_lines` non-empty lines of the stream.
    pub async fn chat(
        &self,
        probe: &ChatProbe<'_>,
        timeout: Duration,
        max_lines: usize,
    ) -> Result<ChatOutcome> {
        let url = self.url("/api/chat");
        tracing::debug!(%url, model = probe.model, "sending chat request");
        let started = Instant::now();
        let response = self
            .http
            .post(&url)
            .json(probe)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;
        let status = response.status();

        let mut lines = Vec::new();
        if status.is_success() {
            let mut pending = String::new();
            let mut body = response.bytes_stream();
            'read: while let Some(chunk) = body.next().await {
                let chunk = chunk.context("chat stream interrupted")?;
                pending.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(end) = pending.find('\n') {
                    let line: String = pending.drain(..=end).collect();
                    let line = line.trim();
                    if !line.is_empty() {
                        lines.push(line.to_string());
                        if lines.len() >= max_lines {
                            break 'read;
                        }
                    }
                }
            }
            let rest = pending.trim();
            if lines.len() < max_lines && !rest.is_empty() {
                lines.push(rest.to_string());
            }
        }

        Ok(ChatOutcome {
            status,
            lines,
            elapsed: started.elapsed(),
        })
    }
}
