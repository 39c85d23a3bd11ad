use crate::models::{AnalysisResult, FindingType, Lead};
use crate::services::ResendService;

const CALENDLY_URL: &str = "https://calendly.com/kandidatentekort/kennismaking";

fn finding_color(finding_type: FindingType) -> &'static str {
    match finding_type {
        FindingType::Success => "#16a34a",
        FindingType::Warning => "#d97706",
        FindingType::Error => "#dc2626",
    }
}

/// Renders the analysis report email. Inline styles only, email clients
/// strip everything else.
pub fn render_analysis_email(lead: &Lead, analysis: &AnalysisResult) -> String {
    let greeting_name = if lead.name.trim().is_empty() {
        "daar".to_string()
    } else {
        lead.name.trim().to_string()
    };
    let improvement = analysis.improvement_percentage();

    let mut findings_html = String::new();
    for finding in &analysis.findings {
        let impact_line = match finding.impact_percentage {
            Some(pct) => format!(
                "<p style=\"margin:4px 0 0;color:#6b7280;font-size:13px;\">Impact op respons: {}%</p>",
                pct
            ),
            None => String::new(),
        };
        findings_html.push_str(&format!(
            "<div style=\"border-left:4px solid {color};padding:8px 12px;margin:12px 0;background:#f9fafb;\">\
             <p style=\"margin:0;font-weight:bold;color:{color};\">{title}</p>\
             <p style=\"margin:4px 0 0;color:#374151;\">{description}</p>{impact}\
             </div>",
            color = finding_color(finding.finding_type),
            title = finding.title,
            description = finding.description,
            impact = impact_line,
        ));
    }

    let quick_wins_html = if analysis.quick_wins.is_empty() {
        String::new()
    } else {
        let items: String = analysis
            .quick_wins
            .iter()
            .map(|win| {
                format!(
                    "<li style=\"margin:8px 0;\"><b>{}</b> (+{}%)<br>\
                     <span style=\"color:#6b7280;\">{}</span></li>",
                    win.action, win.expected_improvement, win.implementation
                )
            })
            .collect();
        format!(
            "<h3 style=\"color:#111827;margin:24px 0 8px;\">Quick wins</h3>\
             <ul style=\"padding-left:20px;color:#374151;\">{}</ul>",
            items
        )
    };

    let intro_html = match &analysis.rewritten_intro {
        Some(intro) if !intro.is_empty() => format!(
            "<h3 style=\"color:#111827;margin:24px 0 8px;\">Voorbeeld: herschreven opening</h3>\
             <div style=\"background:#eef2ff;border-radius:8px;padding:16px;color:#374151;font-style:italic;\">{}</div>",
            intro
        ),
        _ => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="nl">
<body style="margin:0;padding:0;background:#f3f4f6;font-family:Arial,Helvetica,sans-serif;">
  <div style="max-width:600px;margin:0 auto;background:#ffffff;">
    <div style="background:linear-gradient(135deg,#4f46e5,#7c3aed);padding:32px 24px;text-align:center;">
      <h1 style="color:#ffffff;margin:0;font-size:22px;">Jouw vacature-analyse</h1>
      <p style="color:#e0e7ff;font-size:40px;font-weight:bold;margin:16px 0 4px;">{score}/10</p>
      <p style="color:#e0e7ff;margin:0;">Geschat verbeterpotentieel: {improvement}%</p>
    </div>
    <div style="padding:24px;">
      <p style="color:#374151;">Hoi {name},</p>
      <p style="color:#374151;">Bedankt voor het insturen van je vacaturetekst. Dit is wat onze analyse opleverde:</p>
      {findings}
      {quick_wins}
      {intro}
      <div style="text-align:center;margin:32px 0;">
        <a href="{calendly}" style="background:#4f46e5;color:#ffffff;text-decoration:none;padding:14px 28px;border-radius:8px;font-weight:bold;display:inline-block;">Plan een gratis kennismaking</a>
      </div>
      <p style="color:#374151;">Met vriendelijke groet,<br>Team KandidatenTekort.nl</p>
    </div>
    <div style="background:#f9fafb;padding:16px 24px;text-align:center;">
      <p style="color:#9ca3af;font-size:12px;margin:0;">Je ontvangt deze e-mail omdat je een vacature-analyse hebt aangevraagd op kandidatentekort.nl.</p>
    </div>
  </div>
</body>
</html>"#,
        score = analysis.score,
        improvement = improvement,
        name = greeting_name,
        findings = findings_html,
        quick_wins = quick_wins_html,
        intro = intro_html,
        calendly = CALENDLY_URL,
    )
}

/// Renders and sends the report. Failures are logged and collapse to
/// `false`; a lost email never blocks the rest of the intake pipeline.
pub async fn send_analysis_email(
    resend: &ResendService,
    lead: &Lead,
    analysis: &AnalysisResult,
) -> bool {
    let subject = format!("Jouw vacature-analyse: {:.1}/10", analysis.score);
    let html = render_analysis_email(lead, analysis);

    match resend.send_email(&lead.email, &subject, &html).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Analysis email to {} failed: {}", lead.email, e);
            false
        }
    }
}
