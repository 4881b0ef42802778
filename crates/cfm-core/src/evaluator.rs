//! The compliance evaluator.
//!
//! A pure function of `(content, options)` and the static catalog: no I/O,
//! no shared mutable state, safe to call from any number of threads.
//!
//! ## Scoring
//!
//! | Rule | Fails when | Severity | Weight |
//! |------|------------|----------|--------|
//! | disclaimer | no disclaimer phrase | critical | 30 |
//! | crm_identification | no CRM registration | high | 20 |
//! | patient_privacy | first matching privacy pattern | critical | 40 |
//! | medical_advice | first matching prescriptive pattern | high | 25 |
//! | emergency_guidance | "emergência" without 192/SAMU guidance | medium | 10 |
//!
//! The score starts at 100 and is clamped at 0. Violations are appended in
//! catalog order, which only affects display.

use crate::catalog::{self, Rule, RuleKind};
use crate::types::{Recommendation, ValidationOptions, ValidationResult, Violation, MAX_SCORE};

/// Outcome of a single rule against one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Pass,

    /// The rule does not apply to this content.
    Skipped,

    /// The rule failed; `count` is set for pattern rules.
    Violated { count: Option<usize> },
}

/// Applies the rule catalog to content.
pub struct Evaluator {
    rules: &'static [Rule],
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            rules: catalog::rules(),
        }
    }

    /// Evaluate content. Never fails; empty input yields an
    /// `invalid_content` result.
    pub fn evaluate(&self, content: &str, options: &ValidationOptions) -> ValidationResult {
        if content.is_empty() {
            tracing::debug!("Empty content, skipping rules");
            return ValidationResult::invalid_content();
        }

        let lowered = content.to_lowercase();
        let mut score = i64::from(MAX_SCORE);
        let mut violations = Vec::new();
        let mut recommendations = Vec::new();

        for rule in self.rules {
            let outcome = self.check_rule(rule, content, &lowered);
            tracing::trace!(rule = rule.id.as_str(), outcome = ?outcome, "Rule evaluated");

            if let RuleOutcome::Violated { count } = outcome {
                score -= i64::from(rule.weight);
                violations.push(Violation {
                    kind: rule.violation,
                    severity: rule.severity,
                    message: rule.message.to_string(),
                    legal_reference: rule.legal_reference.to_string(),
                    weight: rule.weight,
                    count,
                });
                recommendations.push(Recommendation {
                    kind: rule.violation,
                    message: rule.recommendation.to_string(),
                    template: rule.template,
                });
            }
        }

        ValidationResult::from_score(
            score,
            violations,
            recommendations,
            content.chars().count(),
            options,
        )
    }

    /// Apply one rule.
    pub fn check_rule(&self, rule: &Rule, content: &str, lowered: &str) -> RuleOutcome {
        match &rule.kind {
            RuleKind::RequiredPresence => {
                if rule.matchers.iter().any(|m| m.is_match(content, lowered)) {
                    RuleOutcome::Pass
                } else {
                    RuleOutcome::Violated { count: None }
                }
            }
            RuleKind::ForbiddenPattern => {
                // One incident, one deduction: stop at the first pattern that hits.
                for matcher in &rule.matchers {
                    let count = matcher.count(content, lowered);
                    if count > 0 {
                        tracing::debug!(
                            rule = rule.id.as_str(),
                            pattern = matcher.label(),
                            count,
                            "Forbidden pattern matched"
                        );
                        return RuleOutcome::Violated { count: Some(count) };
                    }
                }
                RuleOutcome::Pass
            }
            RuleKind::ConditionalPresence { triggers } => {
                if !triggers.iter().any(|t| t.is_match(content, lowered)) {
                    return RuleOutcome::Skipped;
                }
                if rule.matchers.iter().any(|m| m.is_match(content, lowered)) {
                    RuleOutcome::Pass
                } else {
                    RuleOutcome::Violated { count: None }
                }
            }
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluate content against the default catalog.
pub fn evaluate(content: &str, options: &ValidationOptions) -> ValidationResult {
    Evaluator::new().evaluate(content, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{rule, RuleId};
    use crate::templates::TemplateType;
    use crate::types::{ComplianceLevel, LevelThresholds, Severity, ViolationType};
    use proptest::prelude::*;

    const DISCLAIMER: &str = "Este conteúdo não substitui consulta médica.";
    const CRM: &str = "Dr. Philipe Saraiva Cruz - CRM-MG 69.870.";

    fn opts() -> ValidationOptions {
        ValidationOptions::default()
    }

    fn clean(body: &str) -> String {
        format!("{} {} {}", body, DISCLAIMER, CRM)
    }

    #[test]
    fn test_compliant_content() {
        let content =
            "Este conteúdo é apenas informativo e não substitui consulta médica. CRM-MG 69.870.";
        let result = evaluate(content, &opts());

        assert!(result.violations.is_empty());
        assert!(result.recommendations.is_empty());
        assert_eq!(result.score, 100);
        assert_eq!(result.level, ComplianceLevel::Excellent);
        assert!(result.valid);
        assert_eq!(result.content_length, content.chars().count());
    }

    #[test]
    fn test_prescriptive_content() {
        let result = evaluate("Tome este remédio duas vezes ao dia.", &opts());

        let kinds: Vec<ViolationType> = result.violations.iter().map(|v| v.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ViolationType::DisclaimerMissing,
                ViolationType::CrmMissing,
                ViolationType::UnauthorizedAdvice,
            ]
        );
        assert_eq!(result.score, 25);
        assert_eq!(result.level, ComplianceLevel::Inadequate);
        assert!(!result.valid);
    }

    #[test]
    fn test_empty_content() {
        let result = evaluate("", &opts());
        assert!(!result.valid);
        assert_eq!(result.score, 0);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].kind, ViolationType::InvalidContent);
        assert!(result.recommendations.is_empty());
        assert_eq!(result.level, ComplianceLevel::Inadequate);
    }

    #[test]
    fn test_empty_content_ignores_lax_thresholds() {
        let lax = ValidationOptions {
            strict_mode: false,
            thresholds: LevelThresholds {
                acceptable: 0,
                pass: 0,
                ..Default::default()
            },
        };
        let result = evaluate("", &lax);
        assert!(!result.valid);
        assert_eq!(result.level, ComplianceLevel::Inadequate);
        assert!(result.has_violation(ViolationType::InvalidContent));
    }

    #[test]
    fn test_whitespace_only_runs_rules() {
        let result = evaluate("   \n\t", &opts());
        let kinds: Vec<_> = result.violations.iter().map(|v| v.kind).collect();
        assert_eq!(
            kinds,
            vec![ViolationType::DisclaimerMissing, ViolationType::CrmMissing]
        );
        assert_eq!(result.score, 50);
        assert_eq!(result.level, ComplianceLevel::Acceptable);
        assert!(!result.valid);
        assert_eq!(result.content_length, 5);
    }

    #[test]
    fn test_missing_disclaimer() {
        let result = evaluate(&format!("Catarata tem tratamento. {}", CRM), &opts());
        let v = &result.violations[0];
        assert_eq!(v.kind, ViolationType::DisclaimerMissing);
        assert_eq!(v.severity, Severity::Critical);
        assert_eq!(v.weight, 30);
        assert_eq!(result.score, 70);
        assert_eq!(result.recommendations[0].template, TemplateType::MedicalDisclaimer);
    }

    #[test]
    fn test_disclaimer_case_insensitive() {
        let content = format!("CONSULTE UM MÉDICO antes de qualquer tratamento. {}", CRM);
        let result = evaluate(&content, &opts());
        assert!(!result.has_violation(ViolationType::DisclaimerMissing));
    }

    #[test]
    fn test_missing_crm_costs_twenty() {
        let with_crm = evaluate(&clean("Cuidados com lentes de contato."), &opts());
        let without_crm = evaluate(
            &format!("Cuidados com lentes de contato. {}", DISCLAIMER),
            &opts(),
        );
        assert_eq!(with_crm.score - without_crm.score, 20);
        assert!(without_crm.has_violation(ViolationType::CrmMissing));
    }

    #[test]
    fn test_privacy_short_circuits() {
        // CPF, patient name and birth date all present: one violation, first pattern wins.
        let content = clean(
            "A paciente Maria Silva, CPF 123.456.789-09 e 987.654.321-00, \
             data de nascimento 01/02/1980, foi operada.",
        );
        let result = evaluate(&content, &opts());

        let privacy: Vec<_> = result
            .violations
            .iter()
            .filter(|v| v.kind == ViolationType::PrivacyViolation)
            .collect();
        assert_eq!(privacy.len(), 1);
        assert_eq!(privacy[0].count, Some(2));
        assert_eq!(privacy[0].weight, 40);
        assert_eq!(result.score, 60);
    }

    #[test]
    fn test_phone_number_is_not_a_cpf() {
        let result = evaluate(&clean("Agende pelo WhatsApp 33998601427."), &opts());
        assert!(!result.has_violation(ViolationType::PrivacyViolation));
        assert_eq!(result.score, 100);

        let labelled = evaluate(&clean("Informe o CPF: 12345678909 na recepção."), &opts());
        assert!(labelled.has_violation(ViolationType::PrivacyViolation));
        assert_eq!(labelled.score, 60);
    }

    #[test]
    fn test_privacy_later_pattern() {
        let content = clean("Relato da paciente Ana Souza após a cirurgia.");
        let result = evaluate(&content, &opts());
        let v = result
            .violations
            .iter()
            .find(|v| v.kind == ViolationType::PrivacyViolation)
            .unwrap();
        assert_eq!(v.count, Some(1));
    }

    #[test]
    fn test_advice_short_circuits() {
        let content = clean("Recomendo que tome o colírio. Você deve tomar vitamina A. Pare de tomar o outro.");
        let result = evaluate(&content, &opts());
        let advice: Vec<_> = result
            .violations
            .iter()
            .filter(|v| v.kind == ViolationType::UnauthorizedAdvice)
            .collect();
        assert_eq!(advice.len(), 1);
        assert_eq!(result.score, 75);
        assert_eq!(result.level, ComplianceLevel::Good);
    }

    #[test]
    fn test_emergency_rule_applicability() {
        let not_mentioned = evaluate(&clean("Olho seco tem tratamento."), &opts());
        assert_eq!(not_mentioned.score, 100);

        let unguided = evaluate(&clean("Trauma ocular é uma emergência."), &opts());
        assert!(unguided.has_violation(ViolationType::EmergencyGuidance));
        assert_eq!(unguided.score, 90);
        assert_eq!(unguided.level, ComplianceLevel::Excellent);

        for guidance in ["Ligue 192.", "Acione o SAMU.", "Busque atendimento médico imediato."] {
            let content = clean(&format!("Trauma ocular é uma Emergência. {}", guidance));
            let result = evaluate(&content, &opts());
            assert!(!result.has_violation(ViolationType::EmergencyGuidance), "{}", guidance);
        }
    }

    #[test]
    fn test_every_rule_failing_clamps_to_zero() {
        let content = "Em caso de emergência, recomendo que tome dois comprimidos. \
                       Paciente CPF 123.456.789-09.";
        let result = evaluate(content, &opts());
        assert_eq!(result.violations.len(), 5);
        assert_eq!(result.score, 0);
        assert_eq!(result.level, ComplianceLevel::Inadequate);
        assert!(!result.valid);
    }

    #[test]
    fn test_strict_mode() {
        let content = clean("Trauma ocular é uma emergência.");
        assert!(evaluate(&content, &opts()).valid);
        assert!(evaluate(&content, &ValidationOptions::strict()).valid);

        let content = format!("Lentes de contato. {}", DISCLAIMER);
        let normal = evaluate(&content, &opts());
        let strict = evaluate(&content, &ValidationOptions::strict());
        assert_eq!(normal.score, 80);
        assert!(normal.valid);
        assert!(!strict.valid);
    }

    #[test]
    fn test_check_rule_skipped() {
        let evaluator = Evaluator::new();
        let emergency = rule(RuleId::EmergencyGuidance).unwrap();
        let content = "Sem menção alguma.";
        assert_eq!(
            evaluator.check_rule(emergency, content, &content.to_lowercase()),
            RuleOutcome::Skipped
        );
    }

    proptest! {
        #[test]
        fn prop_score_in_range(content in "\\PC{0,200}") {
            let result = evaluate(&content, &opts());
            prop_assert!(result.score <= 100);
            prop_assert_eq!(result.valid, result.score >= 70);
            prop_assert_eq!(result.violations.is_empty(), result.score == 100);
        }

        #[test]
        fn prop_no_disclaimer_means_at_most_seventy(content in "[a-z ]{1,120}") {
            // Lowercase ASCII letters can't spell any disclaimer phrase (they all need accents).
            let result = evaluate(&content, &opts());
            prop_assert!(result.has_violation(ViolationType::DisclaimerMissing));
            prop_assert!(result.score <= 70);
        }

        #[test]
        fn prop_level_is_monotonic(a in 0i64..=100, b in 0i64..=100) {
            let ra = ValidationResult::from_score(a, vec![], vec![], 1, &opts());
            let rb = ValidationResult::from_score(b, vec![], vec![], 1, &opts());
            if a <= b {
                prop_assert!(ra.level <= rb.level);
            }
        }
    }
}
