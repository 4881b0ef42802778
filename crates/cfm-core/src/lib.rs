//! # cfm-core
//!
//! Deterministic CFM compliance evaluation for patient-facing medical content.
//!
//! This crate answers, for a piece of text:
//! - Does it carry the mandatory medical disclaimer and CRM identification?
//! - Does it leak identifiable patient data (LGPD)?
//! - Does it give individualized medical advice or mishandle emergencies?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output (except `timestamp`)
//! 2. **Infallible**: Malformed input degrades to an `invalid_content` result
//! 3. **Traceable**: Every violation cites its legal reference
//! 4. **Thread-safe**: No shared mutable state; the catalog is read-only
//!
//! ## Example
//!
//! ```rust
//! use cfm_core::{evaluate, ComplianceLevel, ValidationOptions};
//!
//! let result = evaluate(
//!     "Este conteúdo é apenas informativo e não substitui consulta médica. CRM-MG 69.870.",
//!     &ValidationOptions::default(),
//! );
//! assert_eq!(result.score, 100);
//! assert_eq!(result.level, ComplianceLevel::Excellent);
//! ```

pub mod catalog;
pub mod evaluator;
pub mod report;
pub mod templates;
pub mod types;

// Re-export main types at crate root
pub use catalog::{Matcher, Rule, RuleId, RuleKind, CATALOG_VERSION};
pub use evaluator::{evaluate, Evaluator, RuleOutcome};
pub use report::{generate_audit_report, AuditReport};
pub use templates::{get_template, Template, TemplateError, TemplateType};
pub use types::{
    ComplianceLevel, LevelThresholds, Recommendation, Severity, ValidationOptions,
    ValidationResult, Violation, ViolationType, MAX_SCORE,
};
