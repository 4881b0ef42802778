//! Compliance service facade.
//!
//! Wires settings, execution strategy and cache together. Settings can be
//! replaced at any time; every call takes a snapshot when it starts, so an
//! update affects the next call and never one already in flight. The
//! runner (and with it `runner` and `worker_timeout`) is fixed at
//! construction.

use std::sync::Arc;

use cfm_core::{generate_audit_report, AuditReport, ValidationOptions, ValidationResult};
use parking_lot::RwLock;
use tokio::task::JoinHandle;

use crate::batch::batch_validate;
use crate::cache::{CacheConfig, CacheStats, ResultCache};
use crate::config::{ComplianceSettings, ConfigError};
use crate::runner::{build_runner, EvaluationRunner};
use crate::RuntimeError;

/// Entry point for validating content.
pub struct ComplianceService {
    settings: RwLock<ComplianceSettings>,
    runner: Arc<dyn EvaluationRunner>,
    cache: Arc<ResultCache>,
}

impl ComplianceService {
    /// Create a service with the runner selected by `settings.runner`.
    pub fn new(settings: ComplianceSettings) -> Result<Self, ConfigError> {
        ComplianceServiceBuilder::new().settings(settings).build()
    }

    pub fn builder() -> ComplianceServiceBuilder {
        ComplianceServiceBuilder::new()
    }

    /// Snapshot of current settings.
    pub fn settings(&self) -> ComplianceSettings {
        self.settings.read().clone()
    }

    /// Replace settings; applies from the next call.
    pub fn update_settings(&self, settings: ComplianceSettings) -> Result<(), ConfigError> {
        settings.validate()?;
        self.cache.reconfigure(CacheConfig::from(&settings));
        *self.settings.write() = settings;
        tracing::info!("Compliance settings updated");
        Ok(())
    }

    pub fn runner_name(&self) -> &str {
        self.runner.name()
    }

    /// Validate with options derived from current settings.
    pub async fn validate(&self, content: &str) -> Result<ValidationResult, RuntimeError> {
        let options = self.settings.read().validation_options();
        self.validate_with(content, &options).await
    }

    /// Validate with explicit options.
    pub async fn validate_with(
        &self,
        content: &str,
        options: &ValidationOptions,
    ) -> Result<ValidationResult, RuntimeError> {
        self.cache
            .get_or_evaluate(content, options, self.runner.as_ref())
            .await
    }

    /// Validate in response to an edit. `None` when `auto_validate` is off.
    pub async fn validate_on_change(
        &self,
        content: &str,
    ) -> Option<Result<ValidationResult, RuntimeError>> {
        if !self.settings.read().auto_validate {
            return None;
        }
        Some(self.validate(content).await)
    }

    /// Validate many documents; one result per input, in input order.
    pub async fn validate_batch(&self, contents: &[String]) -> Vec<ValidationResult> {
        let (options, batch) = {
            let settings = self.settings.read();
            (settings.validation_options(), settings.batch)
        };
        tracing::debug!(count = contents.len(), concurrency = batch.concurrency, "Batch validation");
        batch_validate(&self.cache, self.runner.as_ref(), contents, &options, batch).await
    }

    /// Aggregate results into an audit report. `None` when reporting is off.
    pub fn audit(&self, results: &[ValidationResult]) -> Option<AuditReport> {
        if !self.settings.read().enable_reporting {
            return None;
        }
        let report = generate_audit_report(results);
        tracing::info!(
            total = report.total_content,
            compliant = report.compliant_content,
            overall_score = report.overall_score,
            "Audit report generated"
        );
        Some(report)
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Start the periodic cache sweep. Requires a tokio runtime.
    pub fn start_sweeper(&self) -> JoinHandle<()> {
        self.cache.spawn_sweeper()
    }
}

/// Builder for ComplianceService.
pub struct ComplianceServiceBuilder {
    settings: ComplianceSettings,
    runner: Option<Arc<dyn EvaluationRunner>>,
}

impl ComplianceServiceBuilder {
    pub fn new() -> Self {
        Self {
            settings: ComplianceSettings::default(),
            runner: None,
        }
    }

    pub fn settings(mut self, settings: ComplianceSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use a custom runner instead of the one `settings.runner` selects.
    pub fn runner(mut self, runner: Arc<dyn EvaluationRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn build(self) -> Result<ComplianceService, ConfigError> {
        self.settings.validate()?;
        let runner = self
            .runner
            .unwrap_or_else(|| build_runner(&self.settings));
        let cache = Arc::new(ResultCache::from_settings(&self.settings));

        tracing::debug!(runner = runner.name(), "Compliance service built");
        Ok(ComplianceService {
            settings: RwLock::new(self.settings),
            runner,
            cache,
        })
    }
}

impl Default for ComplianceServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
