//! Execution strategies for the evaluator.
//!
//! The strategy is picked once, at construction, from settings. Both
//! strategies return the same `ValidationResult` shape, so callers can't
//! tell them apart from output alone.

pub mod protocol;
mod worker;

use std::sync::Arc;

use async_trait::async_trait;
use cfm_core::{Evaluator, ValidationOptions, ValidationResult};

use crate::config::{ComplianceSettings, RunnerKind};
use crate::RuntimeError;

pub use worker::{thread_spawner, Job, Spawner, WorkerRunner};

/// Runs the evaluator somewhere.
#[async_trait]
pub trait EvaluationRunner: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn run(
        &self,
        content: &str,
        options: &ValidationOptions,
    ) -> Result<ValidationResult, RuntimeError>;

    /// Evaluate several documents, in order.
    async fn run_batch(
        &self,
        contents: &[String],
        options: &ValidationOptions,
    ) -> Result<Vec<ValidationResult>, RuntimeError> {
        let mut results = Vec::with_capacity(contents.len());
        for content in contents {
            results.push(self.run(content, options).await?);
        }
        Ok(results)
    }
}

/// Evaluates on the calling task.
#[derive(Default)]
pub struct InProcessRunner {
    evaluator: Evaluator,
}

impl InProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous evaluation, shared with the worker fallback path.
    pub fn evaluate(&self, content: &str, options: &ValidationOptions) -> ValidationResult {
        self.evaluator.evaluate(content, options)
    }
}

#[async_trait]
impl EvaluationRunner for InProcessRunner {
    fn name(&self) -> &str {
        "in_process"
    }

    async fn run(
        &self,
        content: &str,
        options: &ValidationOptions,
    ) -> Result<ValidationResult, RuntimeError> {
        Ok(self.evaluate(content, options))
    }
}

/// Build the runner selected by `settings.runner`.
pub fn build_runner(settings: &ComplianceSettings) -> Arc<dyn EvaluationRunner> {
    match settings.runner {
        RunnerKind::InProcess => Arc::new(InProcessRunner::new()),
        RunnerKind::Worker => Arc::new(WorkerRunner::new(settings.worker_timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_process_runner() {
        let runner = InProcessRunner::new();
        let result = runner
            .run("Tome este remédio duas vezes ao dia.", &ValidationOptions::default())
            .await
            .unwrap();
        assert_eq!(result.score, 25);
    }

    #[tokio::test]
    async fn test_default_run_batch_keeps_order() {
        let runner = InProcessRunner::new();
        let contents = vec![
            String::new(),
            "Este conteúdo não substitui consulta médica. CRM-MG 69.870.".to_string(),
        ];
        let results = runner
            .run_batch(&contents, &ValidationOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].score, 0);
        assert_eq!(results[1].score, 100);
    }

    #[test]
    fn test_build_runner_from_settings() {
        let mut settings = ComplianceSettings::default();
        assert_eq!(build_runner(&settings).name(), "worker");

        settings.runner = RunnerKind::InProcess;
        assert_eq!(build_runner(&settings).name(), "in_process");
    }
}
