use crate::models::Lead;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TypeformWebhookPayload {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    pub form_response: FormResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormResponse {
    #[serde(default)]
    pub form_id: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Answer {
    #[serde(rename = "type", default)]
    pub answer_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub field: AnswerField,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerField {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "ref", default)]
    pub field_ref: Option<String>,
}

impl Answer {
    /// Email answers carry their value in `email`, everything else in `text`.
    fn value(&self) -> Option<&str> {
        let raw = if self.answer_type.as_deref() == Some("email") {
            self.email.as_deref().or(self.text.as_deref())
        } else {
            self.text.as_deref().or(self.email.as_deref())
        };
        raw.map(str::trim).filter(|s| !s.is_empty())
    }
}

/// The lead slot an answer maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Email,
    VacancyText,
    Company,
    JobTitle,
    Name,
}

/// Classification rules, tried in order; the first whose patterns hit the
/// field ref wins. "vacature_tekst" must land on the vacancy slot even
/// though "tekst" and "title"-like refs overlap, hence the fixed priority.
const SLOT_RULES: &[(Slot, &[&str])] = &[
    (Slot::Email, &["email", "mail"]),
    (Slot::VacancyText, &["vacature", "tekst", "text"]),
    (Slot::Company, &["bedrijf", "company"]),
    (Slot::JobTitle, &["functie", "title", "rol"]),
    (Slot::Name, &["naam", "name"]),
];

fn classify(field_ref: &str) -> Option<Slot> {
    let lowered = field_ref.to_lowercase();
    SLOT_RULES
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| lowered.contains(p)))
        .map(|(slot, _)| *slot)
}

impl TypeformWebhookPayload {
    /// Maps the answers onto a `Lead`. Unclassified fields are dropped;
    /// when two answers land on the same slot, the later one wins.
    pub fn to_lead(&self) -> Lead {
        let mut lead = Lead {
            submitted_at: self
                .form_response
                .submitted_at
                .clone()
                .unwrap_or_default(),
            ..Default::default()
        };

        for answer in &self.form_response.answers {
            let Some(field_ref) = answer.field.field_ref.as_deref() else {
                continue;
            };
            let Some(value) = answer.value() else {
                continue;
            };
            match classify(field_ref) {
                Some(Slot::Email) => lead.email = value.to_string(),
                Some(Slot::VacancyText) => lead.vacancy_text = value.to_string(),
                Some(Slot::Company) => lead.company = value.to_string(),
                Some(Slot::JobTitle) => lead.job_title = value.to_string(),
                Some(Slot::Name) => lead.name = value.to_string(),
                None => {
                    tracing::debug!("Unmapped Typeform field ref: {}", field_ref);
                }
            }
        }
        lead
    }
}
