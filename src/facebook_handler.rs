use crate::crm;
use crate::errors::AppError;
use crate::facebook_models::{FacebookWebhookPayload, VerifyParams};
use crate::handlers::AppState;
use crate::models::BranchOutcome;
use axum::extract::{Query, State};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

/// GET /api/v1/webhooks/facebook-leads - subscription handshake.
///
/// Facebook sends `hub.mode`, `hub.verify_token` and `hub.challenge`; the
/// challenge must be echoed back verbatim. Any mismatch is a 403.
pub async fn verify_webhook(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Result<String, AppError> {
    let Some(expected) = state.config.fb_webhook_verify_token.as_deref() else {
        tracing::warn!("Facebook webhook verification attempted without a configured token");
        return Err(AppError::Forbidden(
            "No webhook verify token configured".to_string(),
        ));
    };

    let mode_ok = params.mode.as_deref() == Some("subscribe");
    let token_ok = params.verify_token.as_deref() == Some(expected);

    if mode_ok && token_ok {
        tracing::info!("Facebook webhook verified");
        Ok(params.challenge.unwrap_or_default())
    } else {
        tracing::warn!(
            "Facebook webhook verification failed - mode ok: {}, token ok: {}",
            mode_ok,
            token_ok
        );
        Err(AppError::Forbidden(
            "Webhook verification parameters did not match".to_string(),
        ))
    }
}

async fn process_lead(state: &AppState, leadgen_id: &str) -> BranchOutcome {
    let Some(graph) = state.facebook_graph.as_ref() else {
        return BranchOutcome::Skipped {
            reason: "Facebook page token not configured".to_string(),
        };
    };
    let Some(pipedrive) = state.pipedrive.as_ref() else {
        return BranchOutcome::Skipped {
            reason: "Pipedrive not configured".to_string(),
        };
    };

    let detail = match graph.fetch_lead(leadgen_id).await {
        Ok(detail) => detail,
        Err(e) => {
            tracing::error!("Lead {} dereference failed: {}", leadgen_id, e);
            return BranchOutcome::Failed {
                reason: e.to_string(),
            };
        }
    };

    let name = detail
        .full_name()
        .unwrap_or_else(|| format!("Facebook lead {}", detail.id));

    match crm::register_ad_lead(
        pipedrive,
        &name,
        detail.email(),
        detail.phone(),
        detail.company(),
        detail.created_time.as_deref(),
    )
    .await
    {
        Ok(lead_id) => BranchOutcome::delivered_with(json!({ "pipedrive_lead_id": lead_id })),
        Err(e) => {
            tracing::error!("CRM registration for lead {} failed: {}", leadgen_id, e);
            BranchOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

/// POST /api/v1/webhooks/facebook-leads - lead notifications.
///
/// Each leadgen change is processed independently; one failed lead never
/// blocks the others, and Facebook always gets a 200 so it stops retrying.
pub async fn handle_lead_notification(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let payload: FacebookWebhookPayload = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

    let leadgen_ids = payload.leadgen_ids();
    tracing::info!("Facebook notification with {} leadgen change(s)", leadgen_ids.len());

    let mut results = Vec::with_capacity(leadgen_ids.len());
    for leadgen_id in &leadgen_ids {
        let outcome = process_lead(&state, leadgen_id).await;
        results.push(json!({ "leadgen_id": leadgen_id, "outcome": outcome }));
    }

    Ok(Json(json!({
        "success": true,
        "processed": results.len(),
        "results": results,
    })))
}
