//! Local heuristic vacancy scorer.
//!
//! Used when the AI provider is unconfigured or its output cannot be parsed,
//! and by the demo analysis path. Scans the vacancy text for three fixed
//! signals (salary indication, candidate focus, scanability) and derives a
//! score from a 4.5 baseline with a bounded random jitter, clamped to
//! [3.0, 8.5].

use crate::models::{AnalysisResult, Finding, FindingType, QuickWin};
use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;

const BASE_SCORE: f64 = 4.5;
const SUCCESS_INCREMENT: f64 = 1.5;
const WARNING_INCREMENT: f64 = 0.5;
const MIN_SCORE: f64 = 3.0;
const MAX_SCORE: f64 = 8.5;

fn second_person_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(jij|je|jouw|jou)\b").unwrap())
}

fn first_person_plural_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(wij|ons|onze)\b").unwrap())
}

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-•*] ").unwrap())
}

/// Runs the three fixed signal checks against the vacancy text.
/// Always returns exactly three findings, in signal order.
pub fn heuristic_findings(text: &str) -> Vec<Finding> {
    let lower = text.to_lowercase();
    let mut findings = Vec::with_capacity(3);

    // Signal 1: salary indication
    if text.contains('€')
        || lower.contains("salaris")
        || lower.contains("bruto")
        || lower.contains("vergoeding")
    {
        findings.push(Finding {
            title: "Salarisindicatie gevonden".to_string(),
            description: "Vacatures met een concreet salaris krijgen tot 40% meer reacties."
                .to_string(),
            finding_type: FindingType::Success,
            impact_percentage: None,
        });
    } else {
        findings.push(Finding {
            title: "Geen salarisindicatie".to_string(),
            description: "63% van kandidaten skipt vacatures zonder duidelijk salaris.".to_string(),
            finding_type: FindingType::Error,
            impact_percentage: Some(35),
        });
    }

    // Signal 2: candidate focus ("jij" vs "wij")
    let you_count = second_person_re().find_iter(text).count();
    let we_count = first_person_plural_re().find_iter(text).count();
    if you_count > we_count {
        findings.push(Finding {
            title: "Kandidaat-gericht geschreven".to_string(),
            description: "Je spreekt de kandidaat direct aan. Dit verhoogt betrokkenheid."
                .to_string(),
            finding_type: FindingType::Success,
            impact_percentage: None,
        });
    } else {
        findings.push(Finding {
            title: "Te veel \"Wij\" focus".to_string(),
            description: format!(
                "{}x 'wij' vs {}x 'jij'. Draai dit om naar kandidaat voordelen.",
                we_count, you_count
            ),
            finding_type: FindingType::Warning,
            impact_percentage: Some(20),
        });
    }

    // Signal 3: scanability (bullet markers)
    let bullet_count = bullet_re().find_iter(text).count();
    if bullet_count > 5 {
        findings.push(Finding {
            title: "Goede scanbaarheid".to_string(),
            description: "Bullet points maken je vacature goed leesbaar op mobiel.".to_string(),
            finding_type: FindingType::Success,
            impact_percentage: None,
        });
    } else {
        findings.push(Finding {
            title: "Weinig structuur".to_string(),
            description: "Gebruik meer opsommingstekens voor betere leesbaarheid.".to_string(),
            finding_type: FindingType::Warning,
            impact_percentage: Some(15),
        });
    }

    findings
}

/// Derives a score from a finding set plus a jitter offset in [0, 1),
/// clamped to [3.0, 8.5] and rounded to one decimal.
pub fn score_findings(findings: &[Finding], jitter: f64) -> f64 {
    let mut score = BASE_SCORE;
    for finding in findings {
        match finding.finding_type {
            FindingType::Success => score += SUCCESS_INCREMENT,
            FindingType::Warning => score += WARNING_INCREMENT,
            FindingType::Error => {}
        }
    }
    score += jitter.clamp(0.0, 1.0);
    ((score.clamp(MIN_SCORE, MAX_SCORE)) * 10.0).round() / 10.0
}

fn default_quick_wins() -> Vec<QuickWin> {
    vec![
        QuickWin {
            action: "Voeg salaris range toe".to_string(),
            expected_improvement: 35,
            implementation: "Bijvoorbeeld: EUR 45.000 - 60.000 bruto per jaar".to_string(),
        },
        QuickWin {
            action: "Meer \"jij\" gebruiken".to_string(),
            expected_improvement: 20,
            implementation: "Begin zinnen met \"Jij...\" in plaats van \"Wij zoeken...\""
                .to_string(),
        },
    ]
}

/// Full heuristic analysis of a vacancy text.
///
/// `reason` records why the heuristic ran (provider error, no API key, demo
/// request) and is surfaced in the `error` field so downstream consumers can
/// tell this apart from an AI result.
pub fn heuristic_analysis(text: &str, reason: &str) -> AnalysisResult {
    let findings = heuristic_findings(text);
    let jitter = rand::thread_rng().gen::<f64>();
    let score = score_findings(&findings, jitter);

    AnalysisResult {
        score,
        sector: "general".to_string(),
        sector_display: "Algemeen".to_string(),
        findings,
        quick_wins: default_quick_wins(),
        rewritten_intro: None,
        full_analysis: format!(
            "Basisanalyse uitgevoerd ({}). Voor een volledige AI-analyse, probeer het later opnieuw.",
            reason
        ),
        error: Some(reason.to_string()),
    }
}

/// Fixed fallback returned when the AI provider answered but its output
/// could not be used. Score is pinned at 5.0; no signal scan runs.
pub fn fixed_fallback(reason: &str) -> AnalysisResult {
    AnalysisResult {
        score: 5.0,
        sector: "general".to_string(),
        sector_display: "Algemeen".to_string(),
        findings: vec![Finding {
            title: "Analyse niet beschikbaar".to_string(),
            description: reason.to_string(),
            finding_type: FindingType::Warning,
            impact_percentage: None,
        }],
        quick_wins: vec![],
        rewritten_intro: None,
        full_analysis: "Analyse kon niet worden uitgevoerd.".to_string(),
        error: Some(reason.to_string()),
    }
}
