use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, BoxFuture};
use tokio::sync::Semaphore;

pub const DEFAULT_MAX_CONCURRENT: usize = 5;
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq)]
pub enum TaskOutcome<T> {
    Completed(T),
    TimedOut,
    Failed(String),
}

impl<T> TaskOutcome<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            TaskOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed(_))
    }
}

/// Runs named tasks with at most `max_concurrent` in flight, each bounded by `timeout`.
///
/// One task failing or timing out never cancels the others.
pub async fn run_parallel<T, E>(
    tasks: Vec<(String, BoxFuture<'_, Result<T, E>>)>,
    max_concurrent: usize,
    timeout: Duration,
) -> BTreeMap<String, TaskOutcome<T>>
where
    E: std::fmt::Display,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));

    let running = tasks.into_iter().map(|(name, task)| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            let outcome = match semaphore.acquire_owned().await {
                Ok(_permit) => bounded(task, timeout).await,
                Err(err) => TaskOutcome::Failed(err.to_string()),
            };
            match &outcome {
                TaskOutcome::TimedOut => {
                    tracing::warn!(task = %name, timeout_secs = timeout.as_secs(), "task timed out")
                }
                TaskOutcome::Failed(error) => tracing::error!(task = %name, %error, "task failed"),
                TaskOutcome::Completed(_) => {}
            }
            (name, outcome)
        }
    });

    join_all(running).await.into_iter().collect()
}

async fn bounded<T, E, F>(task: F, timeout: Duration) -> TaskOutcome<T>
where
    E: std::fmt::Display,
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(value)) => TaskOutcome::Completed(value),
        Ok(Err(error)) => TaskOutcome::Failed(error.to_string()),
        Err(_) => TaskOutcome::TimedOut,
    }
}
