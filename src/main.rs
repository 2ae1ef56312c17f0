use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lead_qualifier_api::config::Config;
use lead_qualifier_api::handlers::{self, AppState};
use lead_qualifier_api::openapi::{serve_openapi_spec, serve_swagger_ui};
use lead_qualifier_api::scoring::CriterionPoints;
use lead_qualifier_api::services::{QualificationService, VerificationTimeouts};
use lead_qualifier_api::verifier::HttpLeadVerifier;

/// Main entry point for the application.
///
/// Initializes logging, loads configuration and the points table, builds the
/// external collaborators, and starts the Axum server with body limit, per-IP
/// rate limiting, tracing and CORS layers.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_qualifier_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Points table: standard values, optionally overridden from a JSON file
    let mut points = CriterionPoints::standard();
    if let Some(path) = &config.criteria_points_file {
        points = points.with_overrides_from_file(path)?;
        tracing::info!("Criteria points loaded with overrides from {}", path.display());
    }
    tracing::info!("Points table ready: {} criteria", points.len());

    // External collaborators (ad libraries, interpreter, ReceitaWS)
    let verifier = HttpLeadVerifier::new(&config)?;
    tracing::info!("✓ Verifier initialized: ReceitaWS at {}", config.receitaws_base_url);

    let service = QualificationService::new(
        Arc::new(verifier),
        Arc::new(points),
        VerificationTimeouts::from_config(&config),
    );

    // Build application state
    let app_state = Arc::new(AppState {
        config: config.clone(),
        service,
    });

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        // API Documentation
        .route("/docs", get(serve_swagger_ui))
        .route("/api-docs/openapi.json", get(serve_openapi_spec))
        // Qualification
        .route("/api/qualify", post(handlers::qualify_lead))
        // Single-channel verifications
        .route("/api/verify/instagram", post(handlers::verify_instagram))
        .route("/api/verify/google", post(handlers::verify_google))
        .route("/api/verify/qsa", post(handlers::verify_qsa))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 1MB max payload
                .layer(RequestBodyLimitLayer::new(1024 * 1024))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
