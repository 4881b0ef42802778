//! The compliance rule catalog.
//!
//! A static, versioned table of rules. It holds no logic beyond matching a
//! single matcher against content; how matchers combine is decided by the
//! rule's [`RuleKind`] in the evaluator. Changing policy means shipping a new
//! catalog, never mutating this one at runtime.

pub mod patterns;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::templates::TemplateType;
use crate::types::{Severity, ViolationType};

use patterns::{
    BIRTH_DATE_PATTERN, CPF_PATTERN, CRM_PATTERN, DISCLAIMER_PHRASES, DOSAGE_PATTERN,
    EMERGENCY_GUIDANCE_PHRASES, EMERGENCY_TRIGGERS, IMPERATIVE_DOSING_PATTERN, MUST_TAKE_PATTERN,
    PATIENT_NAME_PATTERN, RECOMMEND_PATTERN, STOP_TAKING_PATTERN,
};

/// Version of the rule set. Bump whenever a rule, weight or pattern changes.
pub const CATALOG_VERSION: &str = "2024.10";

/// Stable rule identifiers, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    Disclaimer,
    CrmIdentification,
    PatientPrivacy,
    MedicalAdvice,
    EmergencyGuidance,
}

impl RuleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disclaimer => "disclaimer",
            Self::CrmIdentification => "crm_identification",
            Self::PatientPrivacy => "patient_privacy",
            Self::MedicalAdvice => "medical_advice",
            Self::EmergencyGuidance => "emergency_guidance",
        }
    }
}

/// A single check against content.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Case-insensitive containment; the phrase is stored lowercase.
    Phrase(&'static str),

    /// Named regular expression.
    Pattern { name: &'static str, regex: Regex },
}

impl Matcher {
    fn pattern(name: &'static str, regex: &Regex) -> Self {
        Self::Pattern {
            name,
            regex: regex.clone(),
        }
    }

    fn phrases(phrases: &[&'static str]) -> Vec<Self> {
        phrases.iter().copied().map(Self::Phrase).collect()
    }

    /// Label used in logs and catalog listings.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Phrase(p) => *p,
            Self::Pattern { name, .. } => *name,
        }
    }

    /// Number of occurrences in `content`.
    ///
    /// `lowered` must be `content.to_lowercase()`; it is passed in so the
    /// evaluator lowercases once per document rather than once per phrase.
    pub fn count(&self, content: &str, lowered: &str) -> usize {
        match self {
            Self::Phrase(p) => lowered.matches(p).count(),
            Self::Pattern { regex, .. } => regex.find_iter(content).count(),
        }
    }

    pub fn is_match(&self, content: &str, lowered: &str) -> bool {
        match self {
            Self::Phrase(p) => lowered.contains(p),
            Self::Pattern { regex, .. } => regex.is_match(content),
        }
    }
}

/// How a rule's matchers decide pass or fail.
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// Passes if any matcher hits.
    RequiredPresence,

    /// Fails on the first matcher that hits; later matchers are not checked.
    ForbiddenPattern,

    /// Skipped unless a trigger hits; then passes if any matcher hits.
    ConditionalPresence { triggers: Vec<Matcher> },
}

/// One compliance rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: RuleId,

    /// Informational; every rule is evaluated regardless
    pub required: bool,

    pub kind: RuleKind,
    pub matchers: Vec<Matcher>,

    /// Points deducted on violation
    pub weight: u32,

    pub legal_reference: &'static str,

    pub violation: ViolationType,
    pub severity: Severity,
    pub message: &'static str,
    pub recommendation: &'static str,
    pub template: TemplateType,
}

lazy_static! {
    static ref RULE_CATALOG: Vec<Rule> = vec![
        Rule {
            id: RuleId::Disclaimer,
            required: true,
            kind: RuleKind::RequiredPresence,
            matchers: Matcher::phrases(DISCLAIMER_PHRASES),
            weight: 30,
            legal_reference: "Resolução CFM nº 1.974/2011, art. 3º",
            violation: ViolationType::DisclaimerMissing,
            severity: Severity::Critical,
            message: "Aviso médico obrigatório ausente",
            recommendation: "Inclua o aviso de que o conteúdo não substitui consulta médica",
            template: TemplateType::MedicalDisclaimer,
        },
        Rule {
            id: RuleId::CrmIdentification,
            required: true,
            kind: RuleKind::RequiredPresence,
            matchers: vec![Matcher::pattern("crm", &CRM_PATTERN)],
            weight: 20,
            legal_reference: "Resolução CFM nº 1.974/2011, art. 2º",
            violation: ViolationType::CrmMissing,
            severity: Severity::High,
            message: "Identificação do médico responsável (CRM) ausente",
            recommendation: "Inclua nome e CRM do médico responsável técnico",
            template: TemplateType::CrmIdentification,
        },
        Rule {
            id: RuleId::PatientPrivacy,
            required: true,
            kind: RuleKind::ForbiddenPattern,
            matchers: vec![
                Matcher::pattern("cpf", &CPF_PATTERN),
                Matcher::pattern("patient_name", &PATIENT_NAME_PATTERN),
                Matcher::pattern("birth_date", &BIRTH_DATE_PATTERN),
            ],
            weight: 40,
            legal_reference: "Lei nº 13.709/2018 (LGPD), art. 11; Código de Ética Médica, art. 73",
            violation: ViolationType::PrivacyViolation,
            severity: Severity::Critical,
            message: "Possível exposição de dados identificáveis de paciente",
            recommendation: "Remova ou anonimize os dados pessoais de pacientes",
            template: TemplateType::PatientPrivacy,
        },
        Rule {
            id: RuleId::MedicalAdvice,
            required: true,
            kind: RuleKind::ForbiddenPattern,
            matchers: vec![
                Matcher::pattern("recommend_treatment", &RECOMMEND_PATTERN),
                Matcher::pattern("must_take", &MUST_TAKE_PATTERN),
                Matcher::pattern("dosage", &DOSAGE_PATTERN),
                Matcher::pattern("stop_taking", &STOP_TAKING_PATTERN),
                Matcher::pattern("imperative_dosing", &IMPERATIVE_DOSING_PATTERN),
            ],
            weight: 25,
            legal_reference: "Código de Ética Médica, art. 37",
            violation: ViolationType::UnauthorizedAdvice,
            severity: Severity::High,
            message: "Orientação médica individualizada sem consulta",
            recommendation: "Reescreva como informação geral e oriente a procurar um médico",
            template: TemplateType::GenericInformation,
        },
        Rule {
            id: RuleId::EmergencyGuidance,
            required: false,
            kind: RuleKind::ConditionalPresence {
                triggers: Matcher::phrases(EMERGENCY_TRIGGERS),
            },
            matchers: Matcher::phrases(EMERGENCY_GUIDANCE_PHRASES),
            weight: 10,
            legal_reference: "Resolução CFM nº 2.336/2023",
            violation: ViolationType::EmergencyGuidance,
            severity: Severity::Medium,
            message: "Menção a emergência sem orientação de atendimento imediato",
            recommendation: "Inclua orientação para atendimento imediato e o telefone do SAMU (192)",
            template: TemplateType::EmergencyContact,
        },
    ];
}

/// All rules in evaluation order.
pub fn rules() -> &'static [Rule] {
    &RULE_CATALOG
}

/// Look up a rule by id.
pub fn rule(id: RuleId) -> Option<&'static Rule> {
    RULE_CATALOG.iter().find(|r| r.id == id)
}

/// Sum of all rule weights.
pub fn total_weight() -> u32 {
    RULE_CATALOG.iter().map(|r| r.weight).sum()
}
