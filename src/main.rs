use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kandidatentekort_api::config::Config;
use kandidatentekort_api::handlers::{self, AppState};
use kandidatentekort_api::{facebook_handler, typeform_handler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kandidatentekort_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Build application state; unconfigured providers stay disabled
    let app_state = Arc::new(AppState::from_config(config.clone()));

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .expect("valid governor configuration"),
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        // Form intake webhook
        .route(
            "/api/v1/webhooks/typeform",
            post(typeform_handler::handle_typeform_webhook),
        )
        // Facebook Lead Ads webhook: GET handshake, POST notifications
        .route(
            "/api/v1/webhooks/facebook-leads",
            get(facebook_handler::verify_webhook).post(facebook_handler::handle_lead_notification),
        )
        // Direct analysis and conversion tracking
        .route("/api/v1/analyze", post(handlers::analyze_vacancy))
        .route("/api/v1/track", post(handlers::track_conversion))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 5MB max payload
                .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
                // Rate limiting per client IP
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Health check bypasses rate limiting for the platform prober
    let app = Router::new()
        .route("/health", get(handlers::health_check))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
