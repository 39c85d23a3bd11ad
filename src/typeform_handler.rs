use crate::analysis;
use crate::crm;
use crate::email;
use crate::errors::AppError;
use crate::handlers::AppState;
use crate::typeform_models::TypeformWebhookPayload;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

/// POST /api/v1/webhooks/typeform
///
/// Runs the intake pipeline: analysis, report email, CRM registration, in
/// that order. Steps continue past earlier failures; the response reports
/// what each step produced. Only an unusable payload fails the request.
pub async fn handle_typeform_webhook(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let payload: TypeformWebhookPayload = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid Typeform payload: {}", e)))?;

    let lead = payload.to_lead();
    tracing::info!(
        "Typeform submission - email: {}, company: {}, vacancy text: {} chars",
        if lead.email.is_empty() { "<none>" } else { &lead.email },
        if lead.company.is_empty() { "<none>" } else { &lead.company },
        lead.vacancy_text.len()
    );

    if lead.email.is_empty() && lead.vacancy_text.is_empty() {
        return Err(AppError::BadRequest(
            "Submission contains neither an email address nor a vacancy text".to_string(),
        ));
    }

    // Step 1: analysis
    let analysis_result = if lead.vacancy_text.is_empty() {
        tracing::info!("Step 1/3: no vacancy text, skipping analysis");
        None
    } else {
        tracing::info!("Step 1/3: analyzing vacancy text");
        Some(
            analysis::analyze_vacancy(
                state.claude.as_ref(),
                &lead.vacancy_text,
                &lead.company,
                &lead.job_title,
            )
            .await,
        )
    };

    // Step 2: report email
    let email_sent = match (&analysis_result, state.resend.as_ref()) {
        (Some(result), Some(resend)) if !lead.email.is_empty() => {
            tracing::info!("Step 2/3: sending analysis email");
            email::send_analysis_email(resend, &lead, result).await
        }
        (Some(_), None) => {
            tracing::warn!("Step 2/3: email provider not configured, skipping");
            false
        }
        _ => {
            tracing::info!("Step 2/3: nothing to email, skipping");
            false
        }
    };

    // Step 3: CRM registration
    let crm_outcome = match state.pipedrive.as_ref() {
        Some(pipedrive) => {
            tracing::info!("Step 3/3: registering lead in Pipedrive");
            Some(crm::register_lead(pipedrive, &lead, analysis_result.as_ref()).await)
        }
        None => {
            tracing::warn!("Step 3/3: Pipedrive not configured, skipping");
            None
        }
    };

    let analysis_summary = analysis_result
        .as_ref()
        .map(|result| json!({ "score": result.score, "sector": result.sector }))
        .unwrap_or(Value::Null);

    Ok(Json(json!({
        "success": true,
        "message": "Lead verwerkt",
        "results": {
            "analysis": analysis_summary,
            "email_sent": email_sent,
            "pipedrive_lead_id": crm_outcome.as_ref().and_then(|o| o.deal_id),
        },
    })))
}
