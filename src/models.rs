use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::identifiers::{parse_optional, Cnpj, Domain, InstagramHandle};
use crate::qualification::QualificationResult;
use crate::scoring::ChecklistSelection;
use crate::services::{LeadIdentifiers, QualificationInput, QualificationOutcome};
use crate::verification::{
    AdCheck, AdStatus, CompanyRecord, RegistryCheck, RegistryStatus, VerificationReport,
};

// ============ Qualification ============

/// Body of `POST /api/qualify`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct QualifyRequest {
    #[serde(default)]
    pub instagram_username: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub cnpj: Option<String>,
    /// Initial bid value; number or numeric string.
    #[serde(rename = "valorInicial", default)]
    #[schema(value_type = f64, example = 1000.0)]
    pub initial_value: Option<Value>,
    /// Current bid value; defaults to 0.
    #[serde(rename = "valorAtual", default)]
    #[schema(value_type = Option<f64>, example = 1500.0)]
    pub current_value: Option<Value>,
    /// Criterion key → selected flag (`true`, `"on"`, `1`, ...).
    #[serde(default)]
    #[schema(value_type = Object)]
    pub checklist: ChecklistSelection,
}

impl QualifyRequest {
    /// Validates and normalises the request.
    pub fn into_input(self) -> Result<QualificationInput, AppError> {
        let identifiers = LeadIdentifiers {
            instagram: parse_optional(self.instagram_username.as_deref(), InstagramHandle::parse)?,
            domain: parse_optional(self.domain.as_deref(), Domain::parse)?,
            cnpj: parse_optional(self.cnpj.as_deref(), Cnpj::parse)?,
        };

        let initial_value = parse_initial_value(self.initial_value.as_ref())?;
        let current_value = parse_current_value(self.current_value.as_ref());

        Ok(QualificationInput {
            identifiers,
            initial_value,
            current_value,
            checklist: self.checklist,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResponseMetadata {
    pub request_id: String,
    /// RFC 3339 timestamp.
    pub checked_at: String,
}

impl ResponseMetadata {
    pub fn new() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            checked_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl Default for ResponseMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Body returned by `POST /api/qualify`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QualifyResponse {
    pub score: i64,
    pub qualification: QualificationResult,
    pub verifications: VerificationReport,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checklist_warnings: Vec<String>,
    pub metadata: ResponseMetadata,
}

impl QualifyResponse {
    pub fn from_outcome(outcome: QualificationOutcome, metadata: ResponseMetadata) -> Self {
        Self {
            score: outcome.score,
            qualification: outcome.qualification,
            verifications: outcome.verifications,
            checklist_warnings: outcome.checklist_warnings,
            metadata,
        }
    }
}

// ============ Single-channel verification ============

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct VerifyInstagramRequest {
    #[serde(default)]
    pub instagram_username: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct VerifyGoogleRequest {
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct VerifyQsaRequest {
    #[serde(default)]
    pub cnpj: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdVerificationResponse {
    pub status: AdStatus,
    pub message: String,
}

impl From<&AdCheck> for AdVerificationResponse {
    fn from(check: &AdCheck) -> Self {
        Self {
            status: check.status(),
            message: check.message(),
        }
    }
}

/// Company summary returned by `POST /api/verify/qsa`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompanySummary {
    pub razao_social: String,
    pub situacao: String,
    /// `"NOME (qualificação)"` per partner.
    pub socios: Vec<String>,
}

impl From<&CompanyRecord> for CompanySummary {
    fn from(record: &CompanyRecord) -> Self {
        Self {
            razao_social: record.razao_social.clone(),
            situacao: record.situacao.clone(),
            socios: record.qsa.iter().map(|o| o.display_label()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegistryVerificationResponse {
    pub status: RegistryStatus,
    pub message: String,
    pub data: Option<CompanySummary>,
}

impl From<&RegistryCheck> for RegistryVerificationResponse {
    fn from(check: &RegistryCheck) -> Self {
        Self {
            status: check.status(),
            message: check.message(),
            data: check.company().map(CompanySummary::from),
        }
    }
}

// ============ Bid values ============

/// Reads a bid value given as a JSON number or a numeric string.
/// `,` is accepted as decimal separator.
fn numeric_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// `valorInicial` is required, finite and non-negative.
pub fn parse_initial_value(value: Option<&Value>) -> Result<f64, AppError> {
    let raw = match value {
        None | Some(Value::Null) => {
            return Err(AppError::BadRequest(
                "Erro nos valores fornecidos: valorInicial é obrigatório".to_string(),
            ))
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            return Err(AppError::BadRequest(
                "Erro nos valores fornecidos: valorInicial é obrigatório".to_string(),
            ))
        }
        Some(raw) => raw,
    };

    match numeric_value(raw) {
        Some(v) if v >= 0.0 => Ok(v),
        Some(v) => Err(AppError::BadRequest(format!(
            "Erro nos valores fornecidos: valorInicial não pode ser negativo ({})",
            v
        ))),
        None => Err(AppError::BadRequest(format!(
            "Erro nos valores fornecidos: valorInicial inválido ({})",
            raw
        ))),
    }
}

/// `valorAtual` falls back to 0 when absent or unreadable.
pub fn parse_current_value(value: Option<&Value>) -> f64 {
    match value {
        None | Some(Value::Null) => 0.0,
        Some(Value::String(s)) if s.trim().is_empty() => 0.0,
        Some(raw) => numeric_value(raw).unwrap_or_else(|| {
            tracing::warn!("valorAtual inválido ({}), usando 0", raw);
            0.0
        }),
    }
}
