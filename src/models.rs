use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A lead assembled from an inbound form submission.
///
/// Nothing is persisted: a `Lead` lives for the duration of one webhook
/// invocation. Empty strings mean "not supplied" - that is what the field
/// mapper produces for unmatched slots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lead {
    pub name: String,
    pub email: String,
    pub company: String,
    pub job_title: String,
    pub vacancy_text: String,
    /// RFC3339 submission timestamp, taken from the form payload.
    pub submitted_at: String,
}

impl Lead {
    /// Display name for CRM records: explicit name, else the email local part.
    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            self.name.clone()
        } else if let Some(local) = self.email.split('@').next().filter(|s| !s.is_empty()) {
            local.to_string()
        } else {
            "Onbekend".to_string()
        }
    }
}

/// Severity of a single analysis finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingType {
    Success,
    Warning,
    Error,
}

impl FindingType {
    /// Normalizes a free-form type string from the model output.
    /// Anything unrecognized becomes `Warning`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw {
            "success" => FindingType::Success,
            "error" => FindingType::Error,
            _ => FindingType::Warning,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub finding_type: FindingType,
    #[serde(rename = "impactPercentage", skip_serializing_if = "Option::is_none")]
    pub impact_percentage: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickWin {
    pub action: String,
    #[serde(rename = "expectedImprovement")]
    pub expected_improvement: u32,
    pub implementation: String,
}

/// Result of one vacancy analysis, AI-produced or heuristic.
///
/// `error` being set marks the result as a local heuristic fallback rather
/// than an AI analysis; downstream consumers must treat it as such.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub score: f64,
    pub sector: String,
    #[serde(rename = "sectorDisplay")]
    pub sector_display: String,
    pub findings: Vec<Finding>,
    #[serde(rename = "quickWins", default)]
    pub quick_wins: Vec<QuickWin>,
    #[serde(rename = "rewrittenIntro", skip_serializing_if = "Option::is_none")]
    pub rewritten_intro: Option<String>,
    #[serde(rename = "fullAnalysis")]
    pub full_analysis: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    /// True when this result came from the local heuristic, not the AI.
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }

    /// Projected uplift in applications, shown in email and CRM note.
    pub fn improvement_percentage(&self) -> u32 {
        (((10.0 - self.score) * 15.0).round() as i64).clamp(0, 100) as u32
    }
}

/// A conversion event forwarded to the ad-measurement platforms.
///
/// `event_id` is the only deduplication key the platforms see; the service
/// itself never deduplicates.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionEvent {
    pub event_name: String,
    /// Unix seconds.
    pub event_time: i64,
    pub event_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub sector: Option<String>,
    pub score: Option<f64>,
}

impl ConversionEvent {
    /// Builds an event with the current time; a missing event id falls back
    /// to a time-based one ("evt_{unix_ms}"), mirroring client behaviour.
    pub fn new(event_name: String, event_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            event_name,
            event_time: now.timestamp(),
            event_id: event_id
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| format!("evt_{}", now.timestamp_millis())),
            email: None,
            phone: None,
            company_name: None,
            job_title: None,
            sector: None,
            score: None,
        }
    }
}

/// Outcome of one independent downstream branch.
///
/// A failed or skipped branch never fails the overall request; the caller
/// receives the aggregate and decides nothing - it only reports.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BranchOutcome {
    Delivered {
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<Value>,
    },
    Failed {
        reason: String,
    },
    Skipped {
        reason: String,
    },
}

impl BranchOutcome {
    pub fn delivered() -> Self {
        BranchOutcome::Delivered { detail: None }
    }

    pub fn delivered_with(detail: Value) -> Self {
        BranchOutcome::Delivered {
            detail: Some(detail),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, BranchOutcome::Delivered { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, BranchOutcome::Skipped { .. })
    }
}

/// Partial result of the sequential CRM registration. Steps that failed or
/// never ran leave their id as `None`; there is no rollback.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrmOutcome {
    pub org_id: Option<i64>,
    pub person_id: Option<i64>,
    pub deal_id: Option<i64>,
    pub note_added: bool,
}
