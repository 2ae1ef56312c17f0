use axum::{http::StatusCode, response::IntoResponse, Json};
use utoipa::OpenApi;

use crate::handlers;
use crate::models::{
    AdVerificationResponse, CompanySummary, QualifyRequest, QualifyResponse,
    RegistryVerificationResponse, ResponseMetadata, VerifyGoogleRequest, VerifyInstagramRequest,
    VerifyQsaRequest,
};
use crate::qualification::{QualificationResult, QualificationStatus};
use crate::verification::{AdStatus, CompanyRecord, Officer, RegistryStatus, VerificationReport};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::qualify_lead,
        handlers::verify_instagram,
        handlers::verify_google,
        handlers::verify_qsa
    ),
    components(schemas(
        QualifyRequest,
        QualifyResponse,
        ResponseMetadata,
        QualificationResult,
        QualificationStatus,
        VerificationReport,
        AdStatus,
        RegistryStatus,
        CompanyRecord,
        Officer,
        VerifyInstagramRequest,
        VerifyGoogleRequest,
        VerifyQsaRequest,
        AdVerificationResponse,
        RegistryVerificationResponse,
        CompanySummary
    )),
    tags(
        (name = "qualification", description = "Lead scoring and qualification"),
        (name = "verification", description = "Single-channel verifications"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

/// Serves the generated OpenAPI document as JSON.
pub async fn serve_openapi_spec() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Serves the Swagger UI HTML page.
///
/// The page loads its assets from unpkg and reads the document served by
/// [`serve_openapi_spec`].
pub async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"
<!DOCTYPE html>
<html lang="pt-BR">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Lead Qualifier API - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api-docs/openapi.json",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}
