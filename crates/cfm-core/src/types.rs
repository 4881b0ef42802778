//! Core types for compliance evaluation.
//!
//! Results are created fresh per evaluation and never mutated afterwards.
//! `valid` and `level` are always derived from `score`; there is no way to
//! construct a result that sets them independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::templates::TemplateType;

/// Maximum (and starting) compliance score.
pub const MAX_SCORE: u8 = 100;

/// Severity of a single violation.
///
/// Ordered from most to least severe so histograms list critical first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Kind of rule failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    /// Empty input; no rules were run.
    InvalidContent,
    DisclaimerMissing,
    CrmMissing,
    PrivacyViolation,
    UnauthorizedAdvice,
    EmergencyGuidance,
    /// Evaluation could not complete (timeout, worker failure).
    ValidationFailed,
}

impl ViolationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidContent => "invalid_content",
            Self::DisclaimerMissing => "disclaimer_missing",
            Self::CrmMissing => "crm_missing",
            Self::PrivacyViolation => "privacy_violation",
            Self::UnauthorizedAdvice => "unauthorized_advice",
            Self::EmergencyGuidance => "emergency_guidance",
            Self::ValidationFailed => "validation_failed",
        }
    }
}

/// Coarse compliance band derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceLevel {
    Inadequate,
    Acceptable,
    Good,
    Excellent,
}

impl ComplianceLevel {
    /// Map a score onto a level using the given thresholds.
    pub fn from_score(score: u8, thresholds: &LevelThresholds) -> Self {
        if score >= thresholds.excellent {
            Self::Excellent
        } else if score >= thresholds.good {
            Self::Good
        } else if score >= thresholds.acceptable {
            Self::Acceptable
        } else {
            Self::Inadequate
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inadequate => "inadequate",
            Self::Acceptable => "acceptable",
            Self::Good => "good",
            Self::Excellent => "excellent",
        }
    }
}

/// Score boundaries for levels and for the `valid` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelThresholds {
    pub excellent: u8,
    pub good: u8,
    pub acceptable: u8,

    /// Minimum score for `valid` in normal mode
    pub pass: u8,

    /// Minimum score for `valid` in strict mode
    pub strict_pass: u8,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            excellent: 90,
            good: 70,
            acceptable: 50,
            pass: 70,
            strict_pass: 90,
        }
    }
}

/// Caller-supplied evaluation options.
///
/// Options are part of the cache key, so two calls with different options
/// never share a cached result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationOptions {
    #[serde(default)]
    pub strict_mode: bool,

    #[serde(default)]
    pub thresholds: LevelThresholds,
}

impl ValidationOptions {
    pub fn strict() -> Self {
        Self {
            strict_mode: true,
            ..Default::default()
        }
    }

    /// Score required for a result to be `valid`.
    pub fn pass_threshold(&self) -> u8 {
        if self.strict_mode {
            self.thresholds.strict_pass
        } else {
            self.thresholds.pass
        }
    }
}

/// One failed compliance rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: ViolationType,

    pub severity: Severity,

    /// Human-readable message (pt-BR)
    pub message: String,

    pub legal_reference: String,

    /// Points deducted
    pub weight: u32,

    /// Occurrence count for multi-match rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

/// Suggested remediation for a violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: ViolationType,

    pub message: String,

    /// Boilerplate text to insert, see [`crate::templates::get_template`]
    pub template: TemplateType,
}

/// Output of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub score: u8,
    pub violations: Vec<Violation>,
    pub recommendations: Vec<Recommendation>,
    pub level: ComplianceLevel,
    pub timestamp: DateTime<Utc>,
    pub content_length: usize,
}

impl ValidationResult {
    /// Build a result from an unclamped score.
    ///
    /// The score is clamped to `[0, 100]`; `valid` and `level` follow from it.
    pub fn from_score(
        raw_score: i64,
        violations: Vec<Violation>,
        recommendations: Vec<Recommendation>,
        content_length: usize,
        options: &ValidationOptions,
    ) -> Self {
        let score = raw_score.clamp(0, i64::from(MAX_SCORE)) as u8;
        Self {
            valid: score >= options.pass_threshold(),
            score,
            violations,
            recommendations,
            level: ComplianceLevel::from_score(score, &options.thresholds),
            timestamp: Utc::now(),
            content_length,
        }
    }

    /// Result for empty input. No rules are run.
    ///
    /// Always invalid and inadequate, whatever thresholds the caller uses.
    pub fn invalid_content() -> Self {
        let violation = Violation {
            kind: ViolationType::InvalidContent,
            severity: Severity::Critical,
            message: "Conteúdo inválido ou vazio para validação".to_string(),
            legal_reference: String::new(),
            weight: u32::from(MAX_SCORE),
            count: None,
        };
        Self::rejected(violation, 0)
    }

    /// Error-state result used when evaluation could not complete.
    ///
    /// Shaped like [`ValidationResult::invalid_content`] so batch output keeps
    /// one entry per input.
    pub fn validation_failed(content_length: usize, reason: impl Into<String>) -> Self {
        let violation = Violation {
            kind: ViolationType::ValidationFailed,
            severity: Severity::High,
            message: format!("Validação indisponível: {}", reason.into()),
            legal_reference: String::new(),
            weight: u32::from(MAX_SCORE),
            count: None,
        };
        Self::rejected(violation, content_length)
    }

    fn rejected(violation: Violation, content_length: usize) -> Self {
        Self {
            valid: false,
            score: 0,
            violations: vec![violation],
            recommendations: Vec::new(),
            level: ComplianceLevel::Inadequate,
            timestamp: Utc::now(),
            content_length,
        }
    }

    /// Whether any violation has the given type.
    pub fn has_violation(&self, kind: ViolationType) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}
