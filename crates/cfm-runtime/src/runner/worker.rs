//! One-shot worker threads.
//!
//! Every call gets its own thread; nothing is pooled, so no state leaks
//! between calls. The request is encoded with the worker protocol, the
//! reply is awaited against a hard timeout. On timeout the worker is
//! cancelled: if it has not started it never evaluates, and any reply it
//! produces is dropped.
//!
//! If a thread can't be spawned the call is evaluated in-process instead.
//! That fallback is silent to callers apart from a warning in the logs.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cfm_core::{Evaluator, ValidationOptions, ValidationResult};
use tokio::sync::oneshot;

use super::protocol::{self, WorkerRequest, WorkerResponse};
use super::{EvaluationRunner, InProcessRunner};
use crate::RuntimeError;

/// Work handed to a spawned worker.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Starts a job on a new worker. Errors mean no worker could be created.
pub type Spawner = Arc<dyn Fn(Job) -> io::Result<()> + Send + Sync>;

/// Spawner backed by named OS threads.
pub fn thread_spawner() -> Spawner {
    Arc::new(|job: Job| -> io::Result<()> {
        std::thread::Builder::new()
            .name("cfm-worker".to_string())
            .spawn(job)
            .map(|_| ())
    })
}

/// Runs each evaluation on its own worker thread.
pub struct WorkerRunner {
    timeout: Duration,
    spawner: Spawner,
    fallback: InProcessRunner,
}

impl WorkerRunner {
    pub fn new(timeout: Duration) -> Self {
        Self::with_spawner(timeout, thread_spawner())
    }

    /// Use a custom spawner (tests, embedding in a foreign thread pool).
    pub fn with_spawner(timeout: Duration, spawner: Spawner) -> Self {
        Self {
            timeout,
            spawner,
            fallback: InProcessRunner::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a request to a fresh worker and await its reply.
    ///
    /// Returns `Ok(None)` when no worker could be spawned.
    async fn dispatch(&self, request: WorkerRequest) -> Result<Option<WorkerResponse>, RuntimeError> {
        let id = request.id();
        let payload = serde_json::to_string(&request)?;
        let (tx, rx) = oneshot::channel::<Result<String, String>>();
        let cancelled = Arc::new(AtomicBool::new(false));

        let worker_cancelled = Arc::clone(&cancelled);
        let job: Job = Box::new(move || {
            if worker_cancelled.load(Ordering::Acquire) {
                return;
            }
            let reply = protocol::handle_message(&Evaluator::new(), &payload)
                .map_err(|e| e.to_string());
            // The receiver is gone if the caller timed out.
            let _ = tx.send(reply);
        });

        if let Err(e) = (self.spawner)(job) {
            tracing::warn!(
                error = %RuntimeError::WorkerUnavailable(e.to_string()),
                "Falling back to in-process evaluation"
            );
            return Ok(None);
        }

        let raw = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(Ok(raw))) => raw,
            Ok(Ok(Err(e))) => return Err(RuntimeError::Protocol(e)),
            Ok(Err(_)) => {
                return Err(RuntimeError::WorkerFailed(
                    "worker exited without responding".to_string(),
                ))
            }
            Err(_) => {
                cancelled.store(true, Ordering::Release);
                tracing::warn!(request_id = id, timeout = ?self.timeout, "Worker timed out");
                return Err(RuntimeError::ValidationTimeout(self.timeout));
            }
        };

        let response: WorkerResponse = serde_json::from_str(&raw)?;
        if response.id != id {
            return Err(RuntimeError::WorkerFailed(format!(
                "response id {} does not match request id {}",
                response.id, id
            )));
        }
        if !response.success {
            return Err(RuntimeError::WorkerFailed(
                response.error.unwrap_or_else(|| "unknown worker error".to_string()),
            ));
        }
        Ok(Some(response))
    }
}

#[async_trait]
impl EvaluationRunner for WorkerRunner {
    fn name(&self) -> &str {
        "worker"
    }

    async fn run(
        &self,
        content: &str,
        options: &ValidationOptions,
    ) -> Result<ValidationResult, RuntimeError> {
        let request = WorkerRequest::validate(content, options.clone());
        match self.dispatch(request).await? {
            Some(response) => response
                .result
                .ok_or_else(|| RuntimeError::WorkerFailed("response carried no result".into())),
            None => Ok(self.fallback.evaluate(content, options)),
        }
    }

    async fn run_batch(
        &self,
        contents: &[String],
        options: &ValidationOptions,
    ) -> Result<Vec<ValidationResult>, RuntimeError> {
        let request = WorkerRequest::batch_validate(contents.to_vec(), options.clone());
        match self.dispatch(request).await? {
            Some(response) => {
                let results = response.results.ok_or_else(|| {
                    RuntimeError::WorkerFailed("response carried no results".into())
                })?;
                if results.len() != contents.len() {
                    return Err(RuntimeError::WorkerFailed(format!(
                        "expected {} results, got {}",
                        contents.len(),
                        results.len()
                    )));
                }
                Ok(results)
            }
            None => Ok(contents
                .iter()
                .map(|content| self.fallback.evaluate(content, options))
                .collect()),
        }
    }
}
