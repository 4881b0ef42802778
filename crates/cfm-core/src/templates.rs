//! Boilerplate text referenced by recommendations.
//!
//! Read-only lookup table; the evaluator only stores the key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unknown template: {0}")]
    Unknown(String),
}

/// Key into the template table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    MedicalDisclaimer,
    CrmIdentification,
    PatientPrivacy,
    GenericInformation,
    EmergencyContact,
}

impl TemplateType {
    pub const ALL: [TemplateType; 5] = [
        Self::MedicalDisclaimer,
        Self::CrmIdentification,
        Self::PatientPrivacy,
        Self::GenericInformation,
        Self::EmergencyContact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MedicalDisclaimer => "medical_disclaimer",
            Self::CrmIdentification => "crm_identification",
            Self::PatientPrivacy => "patient_privacy",
            Self::GenericInformation => "generic_information",
            Self::EmergencyContact => "emergency_contact",
        }
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateType {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| TemplateError::Unknown(s.to_string()))
    }
}

/// Bilingual boilerplate text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    pub pt: &'static str,
    pub en: &'static str,
}

impl Template {
    /// Text for a language code; anything other than "en" gets Portuguese.
    pub fn text(&self, lang: &str) -> &'static str {
        if lang.eq_ignore_ascii_case("en") {
            self.en
        } else {
            self.pt
        }
    }
}

static MEDICAL_DISCLAIMER: Template = Template {
    pt: "Este conteúdo é apenas informativo e não substitui consulta médica. \
         Procure orientação médica para diagnóstico e tratamento adequados.",
    en: "This content is for information only and does not replace a medical \
         consultation. Seek medical advice for proper diagnosis and treatment.",
};

static CRM_IDENTIFICATION: Template = Template {
    pt: "Responsável técnico: Dr. Philipe Saraiva Cruz - CRM-MG 69.870",
    en: "Medical director: Dr. Philipe Saraiva Cruz - CRM-MG 69.870",
};

static PATIENT_PRIVACY: Template = Template {
    pt: "Os dados de pacientes foram anonimizados conforme a Lei Geral de \
         Proteção de Dados (LGPD).",
    en: "Patient data has been anonymized in accordance with the Brazilian \
         General Data Protection Law (LGPD).",
};

static GENERIC_INFORMATION: Template = Template {
    pt: "As informações acima são de caráter geral. Somente um médico pode \
         indicar o tratamento adequado para o seu caso.",
    en: "The information above is general in nature. Only a physician can \
         recommend the right treatment for your case.",
};

static EMERGENCY_CONTACT: Template = Template {
    pt: "Em caso de emergência, procure atendimento médico imediato ou ligue \
         para o SAMU (192).",
    en: "In an emergency, seek immediate medical care or call SAMU (192).",
};

/// Look up the boilerplate for a template key.
pub fn get_template(template: TemplateType) -> &'static Template {
    match template {
        TemplateType::MedicalDisclaimer => &MEDICAL_DISCLAIMER,
        TemplateType::CrmIdentification => &CRM_IDENTIFICATION,
        TemplateType::PatientPrivacy => &PATIENT_PRIVACY,
        TemplateType::GenericInformation => &GENERIC_INFORMATION,
        TemplateType::EmergencyContact => &EMERGENCY_CONTACT,
    }
}
