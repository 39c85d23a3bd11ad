use crate::models::{BranchOutcome, ConversionEvent};
use crate::services::{Ga4Service, MetaCapiService};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Browser context forwarded with a conversion event. Carried explicitly
/// per call; the adapter itself holds no request state.
#[derive(Debug, Clone, Default)]
pub struct TrackingContext {
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    /// Meta browser-id cookie (_fbp).
    pub fbp: Option<String>,
    /// Meta click-id cookie (_fbc).
    pub fbc: Option<String>,
}

/// Normalizes and hashes a personal identifier the way the Conversions API
/// requires: trim, lowercase, SHA-256, lowercase hex.
pub fn hash_identifier(value: &str) -> String {
    let normalized = value.trim().to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

fn meta_event_payload(
    event: &ConversionEvent,
    context: &TrackingContext,
    event_source_url: &str,
) -> Value {
    let mut user_data = serde_json::Map::new();
    if let Some(email) = &event.email {
        user_data.insert("em".to_string(), json!([hash_identifier(email)]));
    }
    if let Some(phone) = &event.phone {
        user_data.insert("ph".to_string(), json!([hash_identifier(phone)]));
    }
    if let Some(ip) = &context.client_ip {
        user_data.insert("client_ip_address".to_string(), json!(ip));
    }
    if let Some(ua) = &context.user_agent {
        user_data.insert("client_user_agent".to_string(), json!(ua));
    }
    if let Some(fbp) = &context.fbp {
        user_data.insert("fbp".to_string(), json!(fbp));
    }
    if let Some(fbc) = &context.fbc {
        user_data.insert("fbc".to_string(), json!(fbc));
    }

    json!({
        "event_name": event.event_name,
        "event_time": event.event_time,
        "event_id": event.event_id,
        "event_source_url": event_source_url,
        "action_source": "website",
        "user_data": Value::Object(user_data),
        "custom_data": {
            "content_name": event.job_title.as_deref().unwrap_or("Vacature Analyse"),
            "content_category": event.sector.as_deref().unwrap_or("general"),
            "value": event.score.unwrap_or(0.0),
            "currency": "EUR",
        },
    })
}

fn ga4_payload(event: &ConversionEvent) -> Value {
    json!({
        "client_id": event.event_id,
        "events": [{
            "name": event.event_name,
            "params": {
                "engagement_time_msec": 100,
                "session_id": event.event_time,
                "company_name": event.company_name.as_deref().unwrap_or(""),
                "job_title": event.job_title.as_deref().unwrap_or(""),
                "sector": event.sector.as_deref().unwrap_or("general"),
                "score": event.score.unwrap_or(0.0),
            },
        }],
    })
}

async fn meta_branch(
    meta: Option<&MetaCapiService>,
    event: &ConversionEvent,
    context: &TrackingContext,
    event_source_url: &str,
) -> BranchOutcome {
    let Some(service) = meta else {
        return BranchOutcome::Skipped {
            reason: "Meta CAPI not configured".to_string(),
        };
    };

    match service
        .send_event(meta_event_payload(event, context, event_source_url))
        .await
    {
        Ok(detail) => BranchOutcome::delivered_with(detail),
        Err(e) => {
            tracing::error!("Meta CAPI delivery failed: {}", e);
            BranchOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

async fn ga4_branch(ga4: Option<&Ga4Service>, event: &ConversionEvent) -> BranchOutcome {
    let Some(service) = ga4 else {
        return BranchOutcome::Skipped {
            reason: "GA4 not configured".to_string(),
        };
    };

    match service.send_event(ga4_payload(event)).await {
        Ok(status) => BranchOutcome::delivered_with(json!({ "status_code": status })),
        Err(e) => {
            tracing::error!("GA4 delivery failed: {}", e);
            BranchOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

/// Forwards one conversion event to both measurement platforms in parallel.
///
/// The branches never influence each other: an unconfigured platform is
/// skipped, a failing one reports its reason, and the caller always gets
/// both outcomes back.
pub async fn send_conversion_event(
    meta: Option<&MetaCapiService>,
    ga4: Option<&Ga4Service>,
    event: &ConversionEvent,
    context: &TrackingContext,
    event_source_url: &str,
) -> (BranchOutcome, BranchOutcome) {
    tracing::info!(
        "Forwarding conversion event '{}' ({})",
        event.event_name,
        event.event_id
    );

    let (facebook, ga4_outcome) = tokio::join!(
        meta_branch(meta, event, context, event_source_url),
        ga4_branch(ga4, event),
    );

    tracing::info!(
        "Conversion event '{}' - facebook delivered: {}, ga4 delivered: {}",
        event.event_name,
        facebook.is_delivered(),
        ga4_outcome.is_delivered()
    );
    (facebook, ga4_outcome)
}
