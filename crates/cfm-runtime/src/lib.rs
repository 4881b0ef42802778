//! # cfm-runtime
//!
//! Execution layer around the deterministic `cfm-core` evaluator.
//!
//! This crate provides:
//! - Execution strategies: in-process or on a one-shot worker thread with a
//!   hard timeout
//! - A content-hash keyed, time-bound result cache
//! - Batch validation with bounded concurrency and cooperative yielding
//! - [`ComplianceService`], a facade wiring settings, runner and cache together
//!
//! The evaluator itself never fails. Errors in this crate come only from
//! the execution strategy (timeouts, worker failures).
//!
//! ## Example
//!
//! ```rust,ignore
//! use cfm_runtime::{ComplianceService, ComplianceSettings};
//!
//! let service = ComplianceService::new(ComplianceSettings::default())?;
//! let result = service.validate("Texto do artigo...").await?;
//! println!("{} ({})", result.score, result.level.as_str());
//! ```

use std::time::Duration;

use thiserror::Error;

pub mod batch;
pub mod cache;
pub mod config;
pub mod runner;
pub mod service;

pub use batch::batch_validate;
pub use cache::{CacheKey, CacheStats, ResultCache};
pub use config::{BatchOptions, ComplianceSettings, ConfigError, RunnerKind};
pub use runner::{build_runner, EvaluationRunner, InProcessRunner, WorkerRunner};
pub use service::{ComplianceService, ComplianceServiceBuilder};

/// Errors from the execution layer.
///
/// `Clone` so a single failure can be shared by callers that were
/// collapsed onto the same in-flight evaluation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Validation timed out after {0:?}")]
    ValidationTimeout(Duration),

    #[error("Worker unavailable: {0}")]
    WorkerUnavailable(String),

    #[error("Worker failed: {0}")]
    WorkerFailed(String),

    #[error("Worker protocol error: {0}")]
    Protocol(String),
}

impl From<serde_json::Error> for RuntimeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Protocol(e.to_string())
    }
}
