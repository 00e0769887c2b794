//! Checks a deployed backend: performance endpoint, a chat round trip and chat latency.

use std::fmt;
use std::time::Duration;

use anyhow::{bail, Result};
use colored::Colorize;

use crate::backend::{Backend, ChatProbe};

const PERFORMANCE_TIMEOUT: Duration = Duration::from_secs(10);
const CHAT_TIMEOUT: Duration = Duration::from_secs(30);
const LATENCY_TIMEOUT: Duration = Duration::from_secs(60);
const PREVIEW_LINES: usize = 3;

pub const GREETING: ChatProbe<'static> = ChatProbe {
    message: "Hello, how are you?",
    model: "openai/gpt-5",
};

pub const LATENCY_PROBE: ChatProbe<'static> = ChatProbe {
    message: "Write a simple Python function",
    model: "deepseek/deepseek-chat-v3.1",
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grade {
    Excellent,
    Good,
    CouldImprove,
}

impl Grade {
    pub fn of(elapsed: Duration) -> Self {
        if elapsed < Duration::from_secs(10) {
            Grade::Excellent
        } else if elapsed < Duration::from_secs(20) {
            Grade::Good
        } else {
            Grade::CouldImprove
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::Excellent => write!(f, "excellent performance"),
            Grade::Good => write!(f, "good performance"),
            Grade::CouldImprove => write!(f, "performance could be improved"),
        }
    }
}

/// Runs every check in order and stops at the first failure.
pub async fn run(base_url: &str) -> Result<Grade> {
    let backend = Backend::new(base_url)?;
    println!("{}", format!("Testing deployment at {}", backend.base_url()).cyan());

    check_performance(&backend).await?;
    check_chat(&backend).await?;
    let grade = check_latency(&backend).await?;

    println!("{}", "All checks passed".green());
    Ok(grade)
}

pub async fn check_performance(backend: &Backend) -> Result<()> {
    println!("1. Performance endpoint");
    let (status, body) = backend.performance(PERFORMANCE_TIMEOUT).await?;
    if status.as_u16() != 200 {
        bail!("performance endpoint returned {status}");
    }
    let body = body.unwrap_or_default();
    println!("   status: {}", body["status"].as_str().unwrap_or("unknown"));
    if let Some(optimizations) = body["optimizations"].as_object() {
        for (name, state) in optimizations {
            println!("   {name}: {}", state.as_str().unwrap_or_default());
        }
    }
    println!("   {}", "ok".green());
    Ok(())
}

pub async fn check_chat(backend: &Backend) -> Result<Vec<String>> {
    println!("2. Chat endpoint");
    let outcome = backend.chat(&GREETING, CHAT_TIMEOUT, PREVIEW_LINES).await?;
    if outcome.status.as_u16() != 200 {
        bail!("chat endpoint returned {}", outcome.status);
    }
    println!("   received {} line(s)", outcome.lines.len());
    for line in &outcome.lines {
        println!("   {line}");
    }
    println!("   {}", "ok".green());
    Ok(outcome.lines)
}

pub async fn check_latency(backend: &Backend) -> Result<Grade> {
    println!("3. Chat latency");
    let outcome = backend
        .chat(&LATENCY_PROBE, LATENCY_TIMEOUT, usize::MAX)
        .await?;
    if outcome.status.as_u16() != 200 {
        bail!("latency probe returned {}", outcome.status);
    }
    let grade = Grade::of(outcome.elapsed);
    let line = format!(
        "   {:.2}s: {grade}",
        outcome.elapsed.as_secs_f64()
    );
    match grade {
        Grade::Excellent => println!("{}", line.green()),
        Grade::Good => println!("{}", line.yellow()),
        Grade::CouldImprove => println!("{}", line.red()),
    }
    Ok(grade)
}
