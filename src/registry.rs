use moka::future::Cache;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::cache_validator::ValidatedCacheEntry;
use crate::circuit_breaker::{create_registry_circuit_breaker, RegistryCircuitBreaker};
use crate::config::Config;
use crate::identifiers::Cnpj;
use crate::verification::{CompanyRecord, Officer, RegistryCheck};

/// Bounded retry schedule for rate-limited registry requests.
///
/// The wait before retry `n` (1-based) is `base_delay * multiplier^(n-1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(60),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let factor = self
            .multiplier
            .saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryFailure {
    /// The registry does not know the CNPJ or rejected it as invalid.
    NotFound(String),
    /// Still rate limited after every attempt.
    RateLimited,
    /// Non-success HTTP status.
    Http { status: u16, message: String },
    /// The registry answered with an error we do not classify further.
    Rejected(String),
    Timeout,
    Transport(String),
    InvalidResponse(String),
    /// Lookups suspended by the circuit breaker.
    CircuitOpen,
}

impl RegistryFailure {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryFailure::NotFound(_))
    }

    /// Failures that say something about registry availability and count
    /// towards opening the circuit.
    fn is_outage(&self) -> bool {
        match self {
            RegistryFailure::RateLimited
            | RegistryFailure::Timeout
            | RegistryFailure::Transport(_)
            | RegistryFailure::InvalidResponse(_) => true,
            RegistryFailure::Http { status, .. } => *status >= 500,
            RegistryFailure::NotFound(_)
            | RegistryFailure::Rejected(_)
            | RegistryFailure::CircuitOpen => false,
        }
    }
}

impl fmt::Display for RegistryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryFailure::NotFound(message) => write!(f, "{}", message),
            RegistryFailure::RateLimited => {
                write!(f, "Erro ao consultar API: Rate limit (429) persistente.")
            }
            RegistryFailure::Http { status, message } if message.is_empty() => {
                write!(f, "Erro ao consultar API: {}", status)
            }
            RegistryFailure::Http { status, message } => {
                write!(f, "Erro ao consultar API: {} - {}", status, message)
            }
            RegistryFailure::Rejected(message) => write!(f, "Erro ao consultar API: {}", message),
            RegistryFailure::Timeout => write!(f, "Erro de conexão: Timeout"),
            RegistryFailure::Transport(detail) => write!(f, "Erro de conexão: {}", detail),
            RegistryFailure::InvalidResponse(detail) => {
                write!(f, "Erro inesperado no servidor: {}", detail)
            }
            RegistryFailure::CircuitOpen => write!(
                f,
                "Consulta ao QSA suspensa temporariamente após falhas consecutivas"
            ),
        }
    }
}

/// Registry error messages that mean "this CNPJ does not exist".
fn means_not_found(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["inválido", "invalido", "não encontrado", "nao encontrado"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// ReceitaWS `/cnpj/{cnpj}` body. Errors come back as
/// `{"status": "ERROR", "message": "..."}`, often with HTTP 200.
#[derive(Debug, Deserialize)]
struct ReceitaWsResponse {
    status: Option<String>,
    message: Option<String>,
    nome: Option<String>,
    situacao: Option<String>,
    #[serde(default, deserialize_with = "crate::verification::null_as_default")]
    qsa: Vec<Officer>,
}

impl ReceitaWsResponse {
    fn into_record(self) -> Result<CompanyRecord, RegistryFailure> {
        if self.status.as_deref() == Some("ERROR") {
            let message = self
                .message
                .unwrap_or_else(|| "Erro desconhecido".to_string());
            return Err(if means_not_found(&message) {
                RegistryFailure::NotFound(message)
            } else {
                RegistryFailure::Rejected(message)
            });
        }

        Ok(CompanyRecord {
            razao_social: self.nome.unwrap_or_else(|| "N/A".to_string()),
            situacao: self.situacao.unwrap_or_else(|| "N/A".to_string()),
            qsa: self.qsa,
        })
    }
}

/// ReceitaWS client. Retries on HTTP 429, caches found companies and sits
/// behind a circuit breaker.
pub struct RegistryClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
    cache: Cache<String, String>,
    breaker: RegistryCircuitBreaker,
}

impl RegistryClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.registry_request_timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create registry client: {}", e))?;

        let cache = Cache::builder()
            .time_to_live(config.registry_cache_ttl)
            .max_capacity(10_000)
            .build();

        Ok(Self {
            client,
            base_url: config.receitaws_base_url.trim_end_matches('/').to_string(),
            retry: config.registry_retry.clone(),
            cache,
            breaker: create_registry_circuit_breaker(),
        })
    }

    /// Looks up a company by CNPJ. Never fails: problems are reported as
    /// [`RegistryCheck::Failed`].
    pub async fn lookup(&self, cnpj: &Cnpj) -> RegistryCheck {
        if let Some(sealed) = self.cache.get(cnpj.as_str()).await {
            if let Some(record) = ValidatedCacheEntry::open::<CompanyRecord>(&sealed) {
                tracing::debug!("Registry cache HIT for CNPJ: {}", cnpj);
                return RegistryCheck::Found(record);
            }
            self.cache.invalidate(cnpj.as_str()).await;
        }

        if !self.breaker.is_call_permitted() {
            tracing::warn!("⚠️  Registry circuit open, skipping lookup for CNPJ: {}", cnpj);
            return RegistryCheck::Failed(RegistryFailure::CircuitOpen);
        }

        tracing::info!("Consultando QSA para CNPJ: {}", cnpj);
        let result = self.fetch_with_retry(cnpj).await;

        match &result {
            Err(failure) if failure.is_outage() => self.breaker.on_error(),
            _ => self.breaker.on_success(),
        }

        match result {
            Ok(record) => {
                tracing::info!(
                    "✅ Consulta QSA bem-sucedida para CNPJ {}: {} sócio(s)",
                    cnpj,
                    record.qsa.len()
                );
                if let Some(sealed) = ValidatedCacheEntry::seal(&record) {
                    self.cache.insert(cnpj.as_str().to_string(), sealed).await;
                }
                RegistryCheck::Found(record)
            }
            Err(failure) => {
                tracing::warn!("Consulta QSA falhou para CNPJ {}: {}", cnpj, failure);
                RegistryCheck::Failed(failure)
            }
        }
    }

    async fn fetch_with_retry(&self, cnpj: &Cnpj) -> Result<CompanyRecord, RegistryFailure> {
        let url = format!("{}/cnpj/{}", self.base_url, cnpj);
        let attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=attempts {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(transport_failure)?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt < attempts {
                    let delay = self.retry.delay_before_retry(attempt);
                    tracing::warn!(
                        "Rate limit atingido (429). Tentativa {}/{}, nova tentativa em {:?}",
                        attempt,
                        attempts,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                tracing::error!("Rate limit atingido após {} tentativas.", attempts);
                return Err(RegistryFailure::RateLimited);
            }

            if status.is_success() {
                let body: ReceitaWsResponse = response
                    .json()
                    .await
                    .map_err(|e| RegistryFailure::InvalidResponse(e.to_string()))?;
                return body.into_record();
            }

            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Erro na API da ReceitaWS: {} - {}", status, error_text);
            let message = serde_json::from_str::<serde_json::Value>(&error_text)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or_default();

            if means_not_found(&message) {
                return Err(RegistryFailure::NotFound(message));
            }
            return Err(RegistryFailure::Http {
                status: status.as_u16(),
                message,
            });
        }

        Err(RegistryFailure::RateLimited)
    }
}

fn transport_failure(err: reqwest::Error) -> RegistryFailure {
    if err.is_timeout() {
        RegistryFailure::Timeout
    } else {
        RegistryFailure::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retry_schedule_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_before_retry(1), Duration::from_secs(60));
        assert_eq!(policy.delay_before_retry(2), Duration::from_secs(120));
        assert_eq!(policy.delay_before_retry(3), Duration::from_secs(240));
    }

    #[test]
    fn not_found_messages() {
        assert!(means_not_found("CNPJ inválido"));
        assert!(means_not_found("CNPJ NÃO ENCONTRADO"));
        assert!(!means_not_found("Too many requests"));
    }

    #[test]
    fn error_body_maps_to_not_found() {
        let body: ReceitaWsResponse =
            serde_json::from_str(r#"{"status": "ERROR", "message": "CNPJ inválido"}"#).unwrap();
        assert_eq!(
            body.into_record(),
            Err(RegistryFailure::NotFound("CNPJ inválido".to_string()))
        );
    }

    #[test]
    fn ok_body_maps_to_record() {
        let body: ReceitaWsResponse = serde_json::from_str(
            r#"{"status": "OK", "nome": "ACME LTDA", "situacao": "ATIVA",
                "qsa": [{"nome": "ANA", "qual": "49-Sócio-Administrador"}]}"#,
        )
        .unwrap();
        let record = body.into_record().unwrap();
        assert_eq!(record.razao_social, "ACME LTDA");
        assert_eq!(record.qsa.len(), 1);
    }

    #[test]
    fn missing_fields_default_to_na() {
        let body: ReceitaWsResponse = serde_json::from_str("{}").unwrap();
        let record = body.into_record().unwrap();
        assert_eq!(record.razao_social, "N/A");
        assert_eq!(record.situacao, "N/A");
        assert!(record.qsa.is_empty());
    }

    #[test]
    fn null_officer_list_is_still_found() {
        let body: ReceitaWsResponse = serde_json::from_str(
            r#"{"status": "OK", "nome": "ACME LTDA", "situacao": "ATIVA", "qsa": null}"#,
        )
        .unwrap();
        let record = body.into_record().unwrap();
        assert_eq!(record.razao_social, "ACME LTDA");
        assert!(record.qsa.is_empty());
    }

    #[test]
    fn null_officer_fields_are_still_found() {
        let body: ReceitaWsResponse = serde_json::from_str(
            r#"{"status": "OK", "nome": "ACME LTDA", "situacao": "ATIVA",
                "qsa": [{"nome": "ANA", "qual": null}]}"#,
        )
        .unwrap();
        let record = body.into_record().unwrap();
        assert_eq!(record.qsa.len(), 1);
        assert_eq!(record.qsa[0].display_label(), "ANA (?)");
    }

    #[test]
    fn failure_messages() {
        assert_eq!(
            RegistryFailure::Http {
                status: 500,
                message: String::new()
            }
            .to_string(),
            "Erro ao consultar API: 500"
        );
        assert_eq!(
            RegistryFailure::RateLimited.to_string(),
            "Erro ao consultar API: Rate limit (429) persistente."
        );
        assert!(RegistryFailure::Http {
            status: 503,
            message: String::new()
        }
        .is_outage());
        assert!(!RegistryFailure::NotFound("x".into()).is_outage());
    }
}
