//! Audit reports over many validation results.
//!
//! Pure reduction; reports are derived on demand and never persisted here.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Recommendation, Severity, ValidationResult, ViolationType};

/// Aggregate over a set of validation results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Mean score; 0 for an empty set
    pub overall_score: f64,

    pub total_content: usize,

    /// Results with `valid == true`
    pub compliant_content: usize,

    /// `compliant_content / total_content`; 0 for an empty set
    pub compliance_rate: f64,

    pub violations_by_type: BTreeMap<ViolationType, usize>,
    pub violations_by_severity: BTreeMap<Severity, usize>,
    pub recommendations: Vec<Recommendation>,
    pub generated_at: DateTime<Utc>,
}

impl AuditReport {
    pub fn total_violations(&self) -> usize {
        self.violations_by_type.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_content == 0
    }
}

/// Reduce results into an audit report.
pub fn generate_audit_report(results: &[ValidationResult]) -> AuditReport {
    let total_content = results.len();
    let compliant_content = results.iter().filter(|r| r.valid).count();

    let mut violations_by_type = BTreeMap::new();
    let mut violations_by_severity = BTreeMap::new();
    let mut recommendations = Vec::new();
    let mut score_sum: u64 = 0;

    for result in results {
        score_sum += u64::from(result.score);
        for violation in &result.violations {
            *violations_by_type.entry(violation.kind).or_insert(0) += 1;
            *violations_by_severity.entry(violation.severity).or_insert(0) += 1;
        }
        recommendations.extend(result.recommendations.iter().cloned());
    }

    let (overall_score, compliance_rate) = if total_content == 0 {
        (0.0, 0.0)
    } else {
        (
            score_sum as f64 / total_content as f64,
            compliant_content as f64 / total_content as f64,
        )
    };

    AuditReport {
        overall_score,
        total_content,
        compliant_content,
        compliance_rate,
        violations_by_type,
        violations_by_severity,
        recommendations,
        generated_at: Utc::now(),
    }
}
