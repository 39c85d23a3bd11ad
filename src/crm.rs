use crate::models::{AnalysisResult, CrmOutcome, FindingType, Lead};
use crate::services::PipedriveService;

/// Deal value in EUR: the worse the vacancy scores, the more optimization
/// work there is to sell. Floored at zero for scores above 10.
fn deal_value(score: f64) -> i64 {
    (((10.0 - score) * 500.0).round() as i64).max(0)
}

fn deal_title(lead: &Lead) -> String {
    let company = if lead.company.is_empty() {
        "Lead"
    } else {
        &lead.company
    };
    let role = if lead.job_title.is_empty() {
        "Vacature Optimalisatie"
    } else {
        &lead.job_title
    };
    format!("{} - {}", company, role)
}

/// Builds the analysis note attached to the deal. Everything the sales team
/// needs lands here: score, findings, quick wins and the raw contact data.
fn analysis_note(lead: &Lead, analysis: &AnalysisResult) -> String {
    let mut note = String::new();
    note.push_str("<b>Vacature-analyse</b><br>");
    note.push_str(&format!("Score: {}/10<br>", analysis.score));
    note.push_str(&format!("Sector: {}<br><br>", analysis.sector_display));

    note.push_str("<b>Bevindingen:</b><br>");
    for finding in &analysis.findings {
        let marker = match finding.finding_type {
            FindingType::Success => "✅",
            FindingType::Warning => "⚠️",
            FindingType::Error => "❌",
        };
        note.push_str(&format!(
            "{} {}: {}<br>",
            marker, finding.title, finding.description
        ));
    }

    if !analysis.quick_wins.is_empty() {
        note.push_str("<br><b>Quick wins:</b><br>");
        for win in &analysis.quick_wins {
            note.push_str(&format!(
                "• {} (+{}%)<br>",
                win.action, win.expected_improvement
            ));
        }
    }

    note.push_str(&format!(
        "<br>Contact: {}<br>Aangemeld: {}",
        lead.email, lead.submitted_at
    ));
    note
}

/// Registers a lead in Pipedrive: organization, person, deal, analysis note,
/// strictly in that order. A failed step is logged and skipped; whatever was
/// created before it stays (no rollback), and the partial outcome is
/// returned so the caller can report what exists.
pub async fn register_lead(
    pipedrive: &PipedriveService,
    lead: &Lead,
    analysis: Option<&AnalysisResult>,
) -> CrmOutcome {
    let mut outcome = CrmOutcome::default();

    if !lead.company.is_empty() {
        outcome.org_id = match pipedrive.search_organization(&lead.company).await {
            Ok(Some(id)) => Some(id),
            Ok(None) => match pipedrive.create_organization(&lead.company).await {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::error!("Organization creation failed: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::error!("Organization search failed: {}", e);
                None
            }
        };
    }

    let person_name = lead.display_name();
    let email = (!lead.email.is_empty()).then_some(lead.email.as_str());
    outcome.person_id = match pipedrive
        .create_person(&person_name, email, None, outcome.org_id)
        .await
    {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::error!("Person creation failed: {}", e);
            None
        }
    };

    let score = analysis.map(|a| a.score).unwrap_or(5.0);
    outcome.deal_id = match pipedrive
        .create_deal(
            &deal_title(lead),
            deal_value(score),
            outcome.person_id,
            outcome.org_id,
        )
        .await
    {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::error!("Deal creation failed: {}", e);
            None
        }
    };

    if let (Some(deal_id), Some(result)) = (outcome.deal_id, analysis) {
        outcome.note_added = match pipedrive
            .add_note(deal_id, &analysis_note(lead, result))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Note creation failed: {}", e);
                false
            }
        };
    }

    tracing::info!(
        "CRM registration done - org: {:?}, person: {:?}, deal: {:?}, note: {}",
        outcome.org_id,
        outcome.person_id,
        outcome.deal_id,
        outcome.note_added
    );
    outcome
}

/// Registers an ad-platform lead: person (with optional organization) plus a
/// lead record. Unlike `register_lead` this propagates errors, the webhook
/// handler turns them into a per-entry failure.
pub async fn register_ad_lead(
    pipedrive: &PipedriveService,
    name: &str,
    email: Option<&str>,
    phone: Option<&str>,
    company: Option<&str>,
    created_time: Option<&str>,
) -> Result<String, crate::errors::AppError> {
    let org_id = match company {
        Some(company_name) => match pipedrive.search_organization(company_name).await? {
            Some(id) => Some(id),
            None => Some(pipedrive.create_organization(company_name).await?),
        },
        None => None,
    };

    let person_id = pipedrive.create_person(name, email, phone, org_id).await?;

    let title = match company {
        Some(company_name) => format!("Facebook Lead - {}", company_name),
        None => format!("Facebook Lead - {}", name),
    };
    let note = format!(
        "Lead via Facebook Lead Ads<br>Naam: {}<br>E-mail: {}<br>Telefoon: {}<br>Binnengekomen: {}",
        name,
        email.unwrap_or("-"),
        phone.unwrap_or("-"),
        created_time.unwrap_or("-"),
    );

    pipedrive.create_lead(&title, person_id, &note).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Finding, QuickWin};

    fn sample_lead() -> Lead {
        Lead {
            name: "Jan de Vries".to_string(),
            email: "jan@bakkerij.nl".to_string(),
            company: "Bakkerij de Vries".to_string(),
            job_title: "Bakker".to_string(),
            vacancy_text: "Wij zoeken een bakker.".to_string(),
            submitted_at: "2025-03-01T10:00:00Z".to_string(),
        }
    }

    fn sample_analysis() -> AnalysisResult {
        AnalysisResult {
            score: 6.5,
            sector: "horeca".to_string(),
            sector_display: "Horeca".to_string(),
            findings: vec![
                Finding {
                    title: "Salarisindicatie gevonden".to_string(),
                    description: "Er staat een salarisrange in de tekst.".to_string(),
                    finding_type: FindingType::Success,
                    impact_percentage: None,
                },
                Finding {
                    title: "Weinig structuur".to_string(),
                    description: "Gebruik meer opsommingen.".to_string(),
                    finding_type: FindingType::Warning,
                    impact_percentage: Some(15),
                },
            ],
            quick_wins: vec![QuickWin {
                action: "Voeg een salarisrange toe".to_string(),
                expected_improvement: 35,
                implementation: "Noem een bruto maandbedrag.".to_string(),
            }],
            rewritten_intro: None,
            full_analysis: "Degelijke vacature met ruimte voor verbetering.".to_string(),
            error: None,
        }
    }

    #[test]
    fn deal_value_scales_with_score() {
        assert_eq!(deal_value(5.0), 2500);
        assert_eq!(deal_value(8.5), 750);
        assert_eq!(deal_value(10.0), 0);
        assert_eq!(deal_value(12.0), 0);
    }

    #[test]
    fn deal_title_uses_fallbacks() {
        let mut lead = sample_lead();
        assert_eq!(deal_title(&lead), "Bakkerij de Vries - Bakker");

        lead.company.clear();
        lead.job_title.clear();
        assert_eq!(deal_title(&lead), "Lead - Vacature Optimalisatie");
    }

    #[test]
    fn note_contains_score_and_every_finding_title() {
        let lead = sample_lead();
        let analysis = sample_analysis();
        let note = analysis_note(&lead, &analysis);

        assert!(note.contains("6.5/10"));
        assert!(note.contains("Horeca"));
        for finding in &analysis.findings {
            assert!(note.contains(&finding.title));
            assert!(note.contains(&finding.description));
        }
        for win in &analysis.quick_wins {
            assert!(note.contains(&win.action));
        }
        assert!(note.contains("jan@bakkerij.nl"));
        assert!(note.contains("2025-03-01T10:00:00Z"));
    }
}
