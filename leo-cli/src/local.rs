//! Builds the backend image, runs it locally and checks it answers.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tokio::process::Command;

use crate::backend::{Backend, ChatProbe};

const STARTUP_ATTEMPTS: usize = 30;
const STARTUP_INTERVAL: Duration = Duration::from_secs(2);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const CHAT_TIMEOUT: Duration = Duration::from_secs(30);
const CONTAINER_PORT: u16 = 8000;

const HELLO: ChatProbe<'static> = ChatProbe {
    message: "Hello",
    model: "openai/gpt-5",
};

#[derive(Args, Clone, Debug)]
pub struct LocalTest {
    /// Image tag to build
    #[arg(long, default_value = "docs-wiki-backend")]
    pub image: String,

    /// Name of the throwaway container
    #[arg(long, default_value = "docs-wiki-test")]
    pub container: String,

    /// Host port mapped to the container's 8000
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Docker build context
    #[arg(long, default_value = ".")]
    pub context: PathBuf,
}

async fn docker(args: &[&str]) -> Result<String> {
    tracing::debug!(?args, "running docker");
    let output = Command::new("docker")
        .args(args)
        .output()
        .await
        .with_context(|| format!("failed to run docker {}", args.join(" ")))?;
    if !output.status.success() {
        bail!(
            "docker {} failed: {}",
            args.first().copied().unwrap_or_default(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Polls the performance endpoint until it answers 200.
pub async fn wait_until_ready(
    backend: &Backend,
    attempts: usize,
    interval: Duration,
) -> Result<usize> {
    for attempt in 1..=attempts {
        match backend.performance(PROBE_TIMEOUT).await {
            Ok((status, _)) if status.is_success() => return Ok(attempt),
            Ok((status, _)) => tracing::debug!(attempt, %status, "backend not ready"),
            Err(err) => tracing::debug!(attempt, error = %err, "backend not reachable"),
        }
        if attempt < attempts {
            tokio::time::sleep(interval).await;
        }
    }
    bail!("backend did not become ready after {attempts} attempts")
}

/// Performance must answer 200. Chat may answer 500 when no provider keys are set.
pub async fn check_endpoints(backend: &Backend) -> Result<()> {
    let (status, _) = backend.performance(PROBE_TIMEOUT).await?;
    if status.as_u16() != 200 {
        bail!("performance endpoint returned {status}");
    }
    println!("   performance endpoint: {}", "ok".green());

    let outcome = backend.chat(&HELLO, CHAT_TIMEOUT, 1).await?;
    match outcome.status.as_u16() {
        200 | 500 => {
            println!("   chat endpoint: {} ({})", "ok".green(), outcome.status);
            Ok(())
        }
        _ => bail!("chat endpoint returned {}", outcome.status),
    }
}

impl LocalTest {
    pub async fn run(&self) -> Result<()> {
        let version = docker(&["--version"])
            .await
            .context("docker is not available")?;
        println!("{}", version.cyan());

        let context = self.context.to_string_lossy();
        println!("Building image {}...", self.image);
        docker(&["build", "-t", &self.image, &context]).await?;

        // a leftover container from an earlier run would block the name
        let _ = docker(&["rm", "-f", &self.container]).await;

        let ports = format!("{}:{CONTAINER_PORT}", self.port);
        println!("Starting container {}...", self.container);
        docker(&[
            "run", "-d", "--name", &self.container, "-p", &ports, &self.image,
        ])
        .await?;

        let result = self.check_container().await;
        if result.is_err() {
            match docker(&["logs", &self.container]).await {
                Ok(logs) => println!("{}\n{logs}", "Container logs:".yellow()),
                Err(err) => tracing::warn!(error = %err, "could not read container logs"),
            }
        }
        self.cleanup().await;
        result
    }

    async fn check_container(&self) -> Result<()> {
        let backend = Backend::new(&format!("http://localhost:{}", self.port))?;
        let attempt = wait_until_ready(&backend, STARTUP_ATTEMPTS, STARTUP_INTERVAL).await?;
        println!("Backend ready after {attempt} attempt(s)");
        check_endpoints(&backend).await
    }

    async fn cleanup(&self) {
        let name = self.container.as_str();
        for args in [["stop", name], ["rm", name]] {
            if let Err(err) = docker(&args).await {
                tracing::warn!(error = %err, "container cleanup failed");
            }
        }
    }
}
