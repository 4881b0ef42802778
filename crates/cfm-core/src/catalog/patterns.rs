//! Detection patterns used by the rule catalog.
//!
//! Regexes are compiled once on first use. Pattern order inside each list
//! matters: the privacy and advice rules stop at the first pattern that
//! matches.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // =========================================================================
    // IDENTIFICATION
    // =========================================================================

    /// Brazilian medical registration: "CRM-MG 69870", "CRM/SP 123.456", "crm mg 1234"
    pub static ref CRM_PATTERN: Regex = Regex::new(
        r"(?i)\bCRM[\s\-/]*[A-Z]{2}[\s\-:]*\d{1,3}(?:\.?\d{1,3})?\b"
    ).unwrap();

    // =========================================================================
    // PATIENT PRIVACY (LGPD)
    // =========================================================================

    /// CPF: masked "123.456.789-09", or bare digits only when labelled ("CPF: 12345678909").
    /// Unlabelled 11-digit runs are usually phone numbers.
    pub static ref CPF_PATTERN: Regex = Regex::new(
        r"(?i)\b\d{3}\.\d{3}\.\d{3}-\d{2}\b|\bcpf\W{0,3}\d{11}\b"
    ).unwrap();

    /// "paciente Maria Silva": patient keyword followed by two capitalized names
    pub static ref PATIENT_NAME_PATTERN: Regex = Regex::new(
        r"\b[Pp]aciente\s+\p{Lu}\p{Ll}+\s+\p{Lu}\p{Ll}+"
    ).unwrap();

    /// A date within a short distance of "nascimento" / "nascido(a) em"
    pub static ref BIRTH_DATE_PATTERN: Regex = Regex::new(
        r"(?i)(?:(?:nascimento|nascid[oa]\s+em)\D{0,30}\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4}|\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4}\D{0,30}nascimento)"
    ).unwrap();

    // =========================================================================
    // PRESCRIPTIVE LANGUAGE
    // =========================================================================

    pub static ref RECOMMEND_PATTERN: Regex = Regex::new(
        r"(?i)\brecomendo\s+que\s+(?:você\s+)?(?:tome|use|faça|aplique|pingue)\b"
    ).unwrap();

    pub static ref MUST_TAKE_PATTERN: Regex = Regex::new(
        r"(?i)\bvocê\s+deve\s+(?:tomar|usar|aplicar|pingar)\b"
    ).unwrap();

    pub static ref DOSAGE_PATTERN: Regex = Regex::new(
        r"(?i)\ba\s+dose\s+(?:correta|certa|ideal)\s+é\b"
    ).unwrap();

    pub static ref STOP_TAKING_PATTERN: Regex = Regex::new(
        r"(?i)\bpare\s+de\s+(?:tomar|usar|aplicar)\b"
    ).unwrap();

    /// Imperative dosing: "tome este remédio", "pingue o colírio"
    pub static ref IMPERATIVE_DOSING_PATTERN: Regex = Regex::new(
        r"(?i)\b(?:tome|use|aplique|pingue)\s+(?:este|esse|o|a|um|uma|seu|sua)\s+(?:remédio|medicamento|colírio|comprimido|pomada|antibiótico)"
    ).unwrap();
}

/// Disclaimer phrases, lowercase. Any one satisfies the disclaimer rule.
pub const DISCLAIMER_PHRASES: &[&str] = &[
    "não substitui consulta médica",
    "não substitui a consulta médica",
    "procure orientação médica",
    "consulte um médico",
    "consulte seu médico",
    "diagnóstico médico",
];

/// Mentions that make the emergency rule applicable.
pub const EMERGENCY_TRIGGERS: &[&str] = &["emergência"];

/// Any of these satisfies the emergency rule once it applies.
pub const EMERGENCY_GUIDANCE_PHRASES: &[&str] = &["192", "samu", "atendimento médico imediato"];
