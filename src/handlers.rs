use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::identifiers::{Cnpj, Domain, InstagramHandle};
use crate::models::*;
use crate::services::QualificationService;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Lead qualification pipeline (verifier, points table, timeouts).
    pub service: QualificationService,
}

/// Health check endpoint.
///
/// Returns the service status, version, and the size of the points table.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "lead-qualifier-api",
            "version": env!("CARGO_PKG_VERSION"),
            "criteria": state.service.points().len(),
            "interpreter_configured": state.config.openai_api_key.is_some()
        })),
    )
}

/// POST /api/qualify
///
/// Runs every verification for which an identifier was given, scores the
/// checklist plus verification bonuses, and classifies the lead.
#[utoipa::path(
    post,
    path = "/api/qualify",
    tag = "qualification",
    request_body = QualifyRequest,
    responses(
        (status = 200, description = "Lead qualified", body = QualifyResponse),
        (status = 400, description = "Malformed identifier or bid value"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn qualify_lead(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QualifyRequest>,
) -> Result<Json<QualifyResponse>, AppError> {
    let metadata = ResponseMetadata::new();
    tracing::info!(
        "POST /api/qualify [{}] - instagram={:?} domain={:?} cnpj={:?} checklist={} selected",
        metadata.request_id,
        request.instagram_username,
        request.domain,
        request.cnpj,
        request.checklist.selected_keys().count()
    );

    let input = request.into_input()?;

    // Detached from the request future: lookups finish even if the client
    // disconnects.
    let service = state.service.clone();
    let outcome = tokio::spawn(async move { service.qualify(input).await })
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))
        .with_context(|| format!("Qualification task failed for {}", metadata.request_id))?;

    tracing::info!(
        "Qualification [{}] finished: score={} status={}",
        metadata.request_id,
        outcome.score,
        outcome.qualification.status.as_str()
    );

    Ok(Json(QualifyResponse::from_outcome(outcome, metadata)))
}

/// POST /api/verify/instagram
#[utoipa::path(
    post,
    path = "/api/verify/instagram",
    tag = "verification",
    request_body = VerifyInstagramRequest,
    responses(
        (status = 200, description = "Facebook Ads status", body = AdVerificationResponse),
        (status = 400, description = "Missing or malformed username")
    )
)]
pub async fn verify_instagram(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyInstagramRequest>,
) -> Result<Json<AdVerificationResponse>, AppError> {
    let raw = required(request.instagram_username, "Instagram username is required")?;
    let handle = InstagramHandle::parse(&raw)?;
    tracing::info!("Individual verification request for Instagram: {}", handle);

    let check = state.service.verify_social(&handle).await;
    let response = AdVerificationResponse::from(&check);

    tracing::info!(
        "Individual verification result for Instagram {}: {:?}",
        handle,
        response.status
    );
    Ok(Json(response))
}

/// POST /api/verify/google
#[utoipa::path(
    post,
    path = "/api/verify/google",
    tag = "verification",
    request_body = VerifyGoogleRequest,
    responses(
        (status = 200, description = "Google Ads status", body = AdVerificationResponse),
        (status = 400, description = "Missing or malformed domain")
    )
)]
pub async fn verify_google(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyGoogleRequest>,
) -> Result<Json<AdVerificationResponse>, AppError> {
    let raw = required(request.domain, "Domain is required")?;
    let domain = Domain::parse(&raw)?;
    tracing::info!("Individual verification request for Google: {}", domain);

    let check = state.service.verify_search(&domain).await;
    let response = AdVerificationResponse::from(&check);

    tracing::info!(
        "Individual verification result for Google {}: {:?}",
        domain,
        response.status
    );
    Ok(Json(response))
}

/// POST /api/verify/qsa
#[utoipa::path(
    post,
    path = "/api/verify/qsa",
    tag = "verification",
    request_body = VerifyQsaRequest,
    responses(
        (
            status = 200,
            description = "Company registry status",
            body = RegistryVerificationResponse
        ),
        (status = 400, description = "Missing or malformed CNPJ")
    )
)]
pub async fn verify_qsa(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyQsaRequest>,
) -> Result<Json<RegistryVerificationResponse>, AppError> {
    let raw = required(request.cnpj, "CNPJ is required")?;
    let cnpj = Cnpj::parse(&raw)?;
    tracing::info!("Individual verification request for QSA: {}", cnpj);

    let check = state.service.verify_registry(&cnpj).await;
    let response = RegistryVerificationResponse::from(&check);

    tracing::info!(
        "Individual verification result for QSA {}: {:?}",
        cnpj,
        response.status
    );
    Ok(Json(response))
}

fn required(value: Option<String>, message: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(message.to_string()))
}
