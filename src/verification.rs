use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;
use utoipa::ToSchema;

use crate::registry::RegistryFailure;

/// Ad-channel status as reported to clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdStatus {
    #[default]
    NotChecked,
    Active,
    Inactive,
    Error,
}

/// Company-registry status as reported to clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RegistryStatus {
    #[default]
    NotChecked,
    Found,
    NotFound,
    Error,
}

/// Reads an explicit JSON `null` the same way as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Partner or officer listed in the company registry (QSA).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Officer {
    #[serde(rename = "nome", default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "qual", default, deserialize_with = "null_as_default")]
    pub qualification: String,
}

impl Officer {
    /// `"NOME (qualificação)"`, with `?` standing in for blank fields.
    pub fn display_label(&self) -> String {
        fn or_unknown(value: &str) -> &str {
            if value.trim().is_empty() {
                "?"
            } else {
                value
            }
        }
        format!(
            "{} ({})",
            or_unknown(&self.name),
            or_unknown(&self.qualification)
        )
    }
}

/// Company data returned by a successful registry lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CompanyRecord {
    pub razao_social: String,
    pub situacao: String,
    #[serde(default)]
    pub qsa: Vec<Officer>,
}

/// Why an ad-channel check could not produce an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdCheckFailure {
    /// The ad library page could not be fetched.
    Extraction(String),
    /// The page was fetched but had no usable text.
    EmptyContent,
    /// No interpreter API key is configured.
    MissingApiKey,
    /// The interpreter answered something other than yes/no.
    UnexpectedAnswer(String),
    /// The interpreter call itself failed.
    Interpretation(String),
}

impl fmt::Display for AdCheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdCheckFailure::Extraction(detail) => write!(f, "Erro ao extrair: {}", detail),
            AdCheckFailure::EmptyContent => {
                write!(f, "Conteúdo inválido ou vazio para análise.")
            }
            AdCheckFailure::MissingApiKey => {
                write!(f, "Erro: Chave da API OpenAI não configurada.")
            }
            AdCheckFailure::UnexpectedAnswer(_) => {
                write!(f, "Erro: Resposta inesperada da análise de IA.")
            }
            AdCheckFailure::Interpretation(_) => {
                write!(f, "Erro: Falha durante a execução da análise de IA.")
            }
        }
    }
}

/// Result of one ad-channel check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdCheck {
    Active,
    Inactive,
    Failed(AdCheckFailure),
    /// The lookup did not finish within its budget.
    TimedOut(Duration),
}

impl AdCheck {
    pub fn status(&self) -> AdStatus {
        match self {
            AdCheck::Active => AdStatus::Active,
            AdCheck::Inactive => AdStatus::Inactive,
            AdCheck::Failed(_) => AdStatus::Error,
            AdCheck::TimedOut(_) => AdStatus::NotChecked,
        }
    }

    /// Short message for single-channel responses.
    pub fn message(&self) -> String {
        match self {
            AdCheck::Active => "Ativo".to_string(),
            AdCheck::Inactive => "Inativo".to_string(),
            AdCheck::Failed(failure) => failure.to_string(),
            AdCheck::TimedOut(_) => TIMEOUT_MESSAGE.to_string(),
        }
    }

    /// Advisory text for the qualification report, if the check did not
    /// produce an answer.
    pub fn advisory(&self) -> Option<String> {
        match self {
            AdCheck::Active | AdCheck::Inactive => None,
            AdCheck::Failed(failure) => Some(failure.to_string()),
            AdCheck::TimedOut(budget) => Some(timeout_advisory(*budget)),
        }
    }
}

/// Result of one registry lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCheck {
    Found(CompanyRecord),
    Failed(RegistryFailure),
    TimedOut(Duration),
}

impl RegistryCheck {
    pub fn status(&self) -> RegistryStatus {
        match self {
            RegistryCheck::Found(_) => RegistryStatus::Found,
            RegistryCheck::Failed(failure) if failure.is_not_found() => RegistryStatus::NotFound,
            RegistryCheck::Failed(_) => RegistryStatus::Error,
            RegistryCheck::TimedOut(_) => RegistryStatus::NotChecked,
        }
    }

    pub fn message(&self) -> String {
        match self {
            RegistryCheck::Found(_) => "Encontrado".to_string(),
            RegistryCheck::Failed(failure) if failure.is_not_found() => {
                "Não encontrado ou inválido".to_string()
            }
            RegistryCheck::Failed(failure) => failure.to_string(),
            RegistryCheck::TimedOut(_) => TIMEOUT_MESSAGE.to_string(),
        }
    }

    pub fn advisory(&self) -> Option<String> {
        match self {
            RegistryCheck::Found(_) => None,
            RegistryCheck::Failed(failure) => Some(failure.to_string()),
            RegistryCheck::TimedOut(budget) => Some(timeout_advisory(*budget)),
        }
    }

    pub fn company(&self) -> Option<&CompanyRecord> {
        match self {
            RegistryCheck::Found(record) => Some(record),
            _ => None,
        }
    }
}

pub const TIMEOUT_MESSAGE: &str = "Verificação não concluída no tempo limite";

fn timeout_advisory(budget: Duration) -> String {
    format!(
        "Verificação não concluída em {}s; considerada não verificada",
        budget.as_secs()
    )
}

/// The scoring view of the three verifications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationOutcomes {
    pub social_ads: AdStatus,
    pub search_ads: AdStatus,
    pub registry: RegistryStatus,
    /// Officer list of a found company; ignored for any other status.
    pub officers: Option<Vec<Officer>>,
}

/// Full verification report returned with a qualification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VerificationReport {
    pub instagram_username: String,
    pub domain: String,
    pub cnpj: String,
    pub facebook_ads_status: AdStatus,
    pub google_ads_status: AdStatus,
    pub qsa_status: RegistryStatus,
    pub qsa_data: Option<CompanyRecord>,
    pub error_messages: Vec<String>,
}

impl VerificationReport {
    pub fn record_social(&mut self, check: &AdCheck) {
        self.facebook_ads_status = check.status();
        if let Some(advisory) = check.advisory() {
            self.error_messages.push(format!("Facebook Ads: {}", advisory));
        }
    }

    pub fn record_search(&mut self, check: &AdCheck) {
        self.google_ads_status = check.status();
        if let Some(advisory) = check.advisory() {
            self.error_messages.push(format!("Google Ads: {}", advisory));
        }
    }

    pub fn record_registry(&mut self, check: &RegistryCheck) {
        self.qsa_status = check.status();
        self.qsa_data = check.company().cloned();
        if let Some(advisory) = check.advisory() {
            self.error_messages.push(format!("QSA: {}", advisory));
        }
    }

    /// Projects the report onto what the scorer needs.
    pub fn outcomes(&self) -> VerificationOutcomes {
        VerificationOutcomes {
            social_ads: self.facebook_ads_status,
            search_ads: self.google_ads_status,
            registry: self.qsa_status,
            officers: self.qsa_data.as_ref().map(|record| record.qsa.clone()),
        }
    }
}
