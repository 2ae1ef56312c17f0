/// End-to-end qualification tests with a stub verifier
/// Covers the service pipeline and the HTTP handlers without network access
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::State, Json};
use lead_qualifier_api::config::Config;
use lead_qualifier_api::errors::AppError;
use lead_qualifier_api::handlers::{self, AppState};
use lead_qualifier_api::identifiers::{Cnpj, Domain, InstagramHandle};
use lead_qualifier_api::models::{QualifyRequest, VerifyInstagramRequest, VerifyQsaRequest};
use lead_qualifier_api::qualification::QualificationStatus;
use lead_qualifier_api::registry::RegistryFailure;
use lead_qualifier_api::scoring::{ChecklistSelection, CriterionPoints};
use lead_qualifier_api::services::{
    LeadIdentifiers, QualificationInput, QualificationService, VerificationTimeouts,
};
use lead_qualifier_api::verification::{
    AdCheck, AdCheckFailure, AdStatus, CompanyRecord, Officer, RegistryCheck, RegistryStatus,
};
use lead_qualifier_api::verifier::LeadVerifier;
use serde_json::json;

struct StubVerifier {
    social: AdCheck,
    search: AdCheck,
    registry: RegistryCheck,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubVerifier {
    fn new(social: AdCheck, search: AdCheck, registry: RegistryCheck) -> Self {
        Self {
            social,
            search,
            registry,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn respond<T: Clone>(&self, value: &T) -> T {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        value.clone()
    }
}

#[async_trait]
impl LeadVerifier for StubVerifier {
    async fn check_social_ads(&self, _handle: &InstagramHandle) -> AdCheck {
        self.respond(&self.social).await
    }

    async fn check_search_ads(&self, _domain: &Domain) -> AdCheck {
        self.respond(&self.search).await
    }

    async fn lookup_registry(&self, _cnpj: &Cnpj) -> RegistryCheck {
        self.respond(&self.registry).await
    }
}

fn acme_company(officers: usize) -> CompanyRecord {
    CompanyRecord {
        razao_social: "ACME COMERCIO LTDA".to_string(),
        situacao: "ATIVA".to_string(),
        qsa: (0..officers)
            .map(|i| Officer {
                name: format!("SOCIO {}", i),
                qualification: "49-Sócio-Administrador".to_string(),
            })
            .collect(),
    }
}

fn all_identifiers() -> LeadIdentifiers {
    LeadIdentifiers {
        instagram: Some(InstagramHandle::parse("acme_br").unwrap()),
        domain: Some(Domain::parse("acme.com.br").unwrap()),
        cnpj: Some(Cnpj::parse("12.345.678/0001-90").unwrap()),
    }
}

fn service_with(
    verifier: Arc<StubVerifier>,
    timeouts: VerificationTimeouts,
) -> QualificationService {
    QualificationService::new(verifier, Arc::new(CriterionPoints::standard()), timeouts)
}

fn state_with(verifier: Arc<StubVerifier>) -> Arc<AppState> {
    Arc::new(AppState {
        config: Config::default(),
        service: service_with(verifier, VerificationTimeouts::default()),
    })
}

fn happy_verifier() -> Arc<StubVerifier> {
    Arc::new(StubVerifier::new(
        AdCheck::Active,
        AdCheck::Inactive,
        RegistryCheck::Found(acme_company(1)),
    ))
}

#[tokio::test]
async fn test_end_to_end_score_reaches_100() {
    let service = service_with(happy_verifier(), VerificationTimeouts::default());
    let input = QualificationInput {
        identifiers: all_identifiers(),
        initial_value: 1000.0,
        current_value: 0.0,
        checklist: ChecklistSelection::selecting(["perfil_nome_completo", "contato_email_corp"]),
    };

    let outcome = service.qualify(input).await;

    assert_eq!(outcome.score, 100);
    assert_eq!(outcome.qualification.status, QualificationStatus::AcompanharAlto);
    assert!((outcome.qualification.ceiling - 1300.0).abs() < 1e-9);
    assert_eq!(
        outcome.qualification.message,
        "🟡 Acompanhar (Teto Sugerido: R$ 1300.00)"
    );
    assert_eq!(outcome.verifications.facebook_ads_status, AdStatus::Active);
    assert_eq!(outcome.verifications.google_ads_status, AdStatus::Inactive);
    assert_eq!(outcome.verifications.qsa_status, RegistryStatus::Found);
    assert_eq!(outcome.verifications.cnpj, "12345678000190");
    assert!(outcome.verifications.error_messages.is_empty());
    assert!(outcome.checklist_warnings.is_empty());
}

#[tokio::test]
async fn test_omitted_identifiers_skip_lookups() {
    let verifier = happy_verifier();
    let service = service_with(verifier.clone(), VerificationTimeouts::default());

    let outcome = service
        .qualify(QualificationInput {
            initial_value: 1000.0,
            checklist: ChecklistSelection::selecting(["perfil_nome_completo"]),
            ..QualificationInput::default()
        })
        .await;

    assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    assert_eq!(outcome.score, 30);
    assert_eq!(outcome.qualification.status, QualificationStatus::Descartar);
    assert_eq!(outcome.verifications.facebook_ads_status, AdStatus::NotChecked);
    assert_eq!(outcome.verifications.qsa_status, RegistryStatus::NotChecked);
    assert!(outcome.verifications.error_messages.is_empty());
}

#[tokio::test]
async fn test_failed_lookups_are_neutral_and_reported() {
    let verifier = Arc::new(StubVerifier::new(
        AdCheck::Failed(AdCheckFailure::MissingApiKey),
        AdCheck::Failed(AdCheckFailure::EmptyContent),
        RegistryCheck::Failed(RegistryFailure::RateLimited),
    ));
    let service = service_with(verifier, VerificationTimeouts::default());

    let outcome = service
        .qualify(QualificationInput {
            identifiers: all_identifiers(),
            initial_value: 500.0,
            ..QualificationInput::default()
        })
        .await;

    assert_eq!(outcome.score, 0);
    assert_eq!(outcome.verifications.facebook_ads_status, AdStatus::Error);
    assert_eq!(outcome.verifications.google_ads_status, AdStatus::Error);
    assert_eq!(outcome.verifications.qsa_status, RegistryStatus::Error);
    assert_eq!(
        outcome.verifications.error_messages,
        vec![
            "Facebook Ads: Erro: Chave da API OpenAI não configurada.".to_string(),
            "Google Ads: Conteúdo inválido ou vazio para análise.".to_string(),
            "QSA: Erro ao consultar API: Rate limit (429) persistente.".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_slow_lookups_become_not_checked() {
    let verifier = Arc::new(
        StubVerifier::new(
            AdCheck::Active,
            AdCheck::Active,
            RegistryCheck::Found(acme_company(1)),
        )
        .slow(Duration::from_secs(5)),
    );
    let timeouts = VerificationTimeouts {
        ad_check: Duration::from_millis(20),
        registry: Duration::from_millis(20),
    };
    let service = service_with(verifier, timeouts);

    let outcome = service
        .qualify(QualificationInput {
            identifiers: all_identifiers(),
            initial_value: 1000.0,
            ..QualificationInput::default()
        })
        .await;

    assert_eq!(outcome.score, 0);
    assert_eq!(outcome.verifications.facebook_ads_status, AdStatus::NotChecked);
    assert_eq!(outcome.verifications.google_ads_status, AdStatus::NotChecked);
    assert_eq!(outcome.verifications.qsa_status, RegistryStatus::NotChecked);
    assert_eq!(outcome.verifications.error_messages.len(), 3);
    assert!(outcome.verifications.error_messages[2].starts_with("QSA: "));
}

#[tokio::test]
async fn test_qualification_is_deterministic() {
    let service = service_with(happy_verifier(), VerificationTimeouts::default());
    let input = QualificationInput {
        identifiers: all_identifiers(),
        initial_value: 1000.0,
        current_value: 2000.0,
        checklist: ChecklistSelection::selecting(["perfil_linkedin", "digital_site_funcional"]),
    };

    let first = service.qualify(input.clone()).await;
    let second = service.qualify(input).await;

    assert_eq!(first, second);
    assert_eq!(first.score, 120);
    assert!(first.qualification.alert.is_some());
}

#[tokio::test]
async fn test_exclusive_conflicts_are_warned_not_penalised() {
    let service = service_with(happy_verifier(), VerificationTimeouts::default());

    let outcome = service
        .qualify(QualificationInput {
            initial_value: 1000.0,
            checklist: ChecklistSelection::selecting([
                "faturamento_401k_1M",
                "faturamento_1M_4M",
                "perfil_nome_completo",
            ]),
            ..QualificationInput::default()
        })
        .await;

    assert_eq!(outcome.score, 90);
    assert_eq!(outcome.checklist_warnings.len(), 1);
}

#[tokio::test]
async fn test_qualify_handler_returns_report_and_metadata() {
    let state = state_with(happy_verifier());
    let request: QualifyRequest = serde_json::from_value(json!({
        "instagram_username": "@acme_br",
        "domain": "www.acme.com.br",
        "cnpj": "12.345.678/0001-90",
        "valorInicial": "1000",
        "valorAtual": 1500,
        "checklist": {"perfil_nome_completo": true, "contato_email_corp": "on"}
    }))
    .unwrap();

    let Json(response) = handlers::qualify_lead(State(state), Json(request))
        .await
        .unwrap();

    assert_eq!(response.score, 100);
    assert_eq!(response.verifications.domain, "acme.com.br");
    assert!(response.qualification.alert.is_some());

    let body = serde_json::to_value(&response).unwrap();
    assert_eq!(body["qualification"]["status"], "acompanhar_alto");
    assert_eq!(body["qualification"]["show_teto"], true);
    assert_eq!(body["verifications"]["facebook_ads_status"], "active");
    assert!(body["metadata"]["request_id"].is_string());
    assert!(body.get("checklist_warnings").is_none());
}

#[tokio::test]
async fn test_qualify_handler_rejects_bad_input() {
    let state = state_with(happy_verifier());

    let request = QualifyRequest {
        cnpj: Some("123".to_string()),
        initial_value: Some(json!(1000)),
        ..QualifyRequest::default()
    };
    let err = handlers::qualify_lead(State(state.clone()), Json(request))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let request = QualifyRequest {
        initial_value: Some(json!("mil reais")),
        ..QualifyRequest::default()
    };
    let err = handlers::qualify_lead(State(state), Json(request))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_verify_instagram_handler() {
    let state = state_with(happy_verifier());

    let Json(response) = handlers::verify_instagram(
        State(state.clone()),
        Json(VerifyInstagramRequest {
            instagram_username: Some("acme_br".to_string()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(response.status, AdStatus::Active);
    assert_eq!(response.message, "Ativo");

    let err = handlers::verify_instagram(
        State(state),
        Json(VerifyInstagramRequest {
            instagram_username: Some("   ".to_string()),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Bad request: Instagram username is required");
}

#[tokio::test]
async fn test_verify_qsa_handler() {
    let state = state_with(happy_verifier());

    let Json(response) = handlers::verify_qsa(
        State(state.clone()),
        Json(VerifyQsaRequest {
            cnpj: Some("12345678000190".to_string()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(response.status, RegistryStatus::Found);
    assert_eq!(response.message, "Encontrado");
    assert_eq!(
        response.data.unwrap().socios,
        vec!["SOCIO 0 (49-Sócio-Administrador)".to_string()]
    );

    let err = handlers::verify_qsa(State(state), Json(VerifyQsaRequest { cnpj: None }))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Bad request: CNPJ is required");
}
