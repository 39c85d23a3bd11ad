use crate::analysis;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::ConversionEvent;
use crate::services::{
    ClaudeService, FacebookGraphService, Ga4Service, MetaCapiService, PipedriveService,
    ResendService,
};
use crate::tracking::{self, TrackingContext};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Shared application state. Every provider client is optional; an absent
/// credential disables that branch without disabling the service.
pub struct AppState {
    pub config: Config,
    pub claude: Option<ClaudeService>,
    pub pipedrive: Option<PipedriveService>,
    pub resend: Option<ResendService>,
    pub facebook_graph: Option<FacebookGraphService>,
    pub meta_capi: Option<MetaCapiService>,
    pub ga4: Option<Ga4Service>,
}

impl AppState {
    pub fn from_config(config: Config) -> Self {
        Self {
            claude: ClaudeService::from_config(&config),
            pipedrive: PipedriveService::from_config(&config),
            resend: ResendService::from_config(&config),
            facebook_graph: FacebookGraphService::from_config(&config),
            meta_capi: MetaCapiService::from_config(&config),
            ga4: Ga4Service::from_config(&config),
            config,
        }
    }
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "kandidatentekort-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub vacancy_text: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
}

/// POST /api/v1/analyze - direct analysis without the form pipeline.
pub async fn analyze_vacancy(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let request: AnalyzeRequest = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid analyze request: {}", e)))?;

    if request.vacancy_text.trim().is_empty() {
        return Err(AppError::BadRequest(
            "vacancy_text must not be empty".to_string(),
        ));
    }

    let result = analysis::analyze_vacancy(
        state.claude.as_ref(),
        &request.vacancy_text,
        request.company_name.as_deref().unwrap_or(""),
        request.job_title.as_deref().unwrap_or(""),
    )
    .await;

    Ok(Json(serde_json::to_value(result).map_err(|e| {
        AppError::InternalError(format!("Failed to serialize analysis: {}", e))
    })?))
}

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub event_name: String,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub client_ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub fbp: Option<String>,
    #[serde(default)]
    pub fbc: Option<String>,
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// POST /api/v1/track - forwards one conversion event to Meta and GA4.
pub async fn track_conversion(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let request: TrackRequest = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid track request: {}", e)))?;

    if request.event_name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "event_name must not be empty".to_string(),
        ));
    }

    let mut event = ConversionEvent::new(request.event_name.clone(), request.event_id);
    event.email = request.email;
    event.phone = request.phone;
    event.company_name = request.company_name;
    event.job_title = request.job_title;
    event.sector = request.sector;
    event.score = request.score;

    // Body values win; headers fill the gaps for proxied browser calls
    let context = TrackingContext {
        client_ip: request
            .client_ip
            .or_else(|| header_str(&headers, "x-forwarded-for"))
            .map(|ip| ip.split(',').next().unwrap_or("").trim().to_string())
            .filter(|ip| !ip.is_empty()),
        user_agent: request
            .user_agent
            .or_else(|| header_str(&headers, "user-agent")),
        fbp: request.fbp,
        fbc: request.fbc,
    };

    let (facebook, ga4) = tracking::send_conversion_event(
        state.meta_capi.as_ref(),
        state.ga4.as_ref(),
        &event,
        &context,
        &state.config.event_source_url,
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "event_name": event.event_name,
        "results": {
            "facebook": facebook,
            "ga4": ga4,
        },
        "timestamp": Utc::now().to_rfc3339(),
    })))
}
