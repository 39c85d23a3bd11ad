use crate::models::{AnalysisResult, Finding, FindingType, QuickWin};
use crate::scoring;
use crate::services::ClaudeService;
use serde_json::Value;

/// Dutch instruction prompt for the vacancy analysis. The model is asked to
/// answer with a single JSON object matching `AnalysisResult`.
const SYSTEM_PROMPT: &str = "Je bent een expert in recruitment en vacatureteksten voor de Nederlandse arbeidsmarkt. \
Je analyseert vacatureteksten op effectiviteit en geeft concrete verbeterpunten. \
Antwoord uitsluitend met een JSON-object, zonder toelichting erbuiten.";

fn build_prompt(vacancy_text: &str, company_name: &str, job_title: &str) -> String {
    format!(
        r#"Analyseer deze vacaturetekst{for_company}{for_role}.

Beoordeel op:
1. Salarisindicatie (transparantie is cruciaal voor respons)
2. Kandidaatgerichtheid (spreekt de tekst de kandidaat aan met "jij", of gaat het vooral over "wij"?)
3. Scanbaarheid (opsommingen, koppen, alinealengte)
4. Concrete functie-inhoud en groeimogelijkheden
5. Duidelijke call-to-action

Geef je antwoord als JSON met exact deze structuur:
{{
  "score": <getal 0-10, 1 decimaal>,
  "sector": "<sector-slug>",
  "sectorDisplay": "<sectornaam in het Nederlands>",
  "findings": [
    {{"title": "...", "description": "...", "type": "success|warning|error", "impactPercentage": <getal of null>}}
  ],
  "quickWins": [
    {{"action": "...", "expectedImprovement": <verwacht verbeterpercentage als getal>, "implementation": "..."}}
  ],
  "rewrittenIntro": "<herschreven openingsalinea>",
  "fullAnalysis": "<samenvattende analyse in 2-3 zinnen>"
}}

Vacaturetekst:
{text}"#,
        for_company = if company_name.is_empty() {
            String::new()
        } else {
            format!(" van {}", company_name)
        },
        for_role = if job_title.is_empty() {
            String::new()
        } else {
            format!(" voor de functie {}", job_title)
        },
        text = vacancy_text,
    )
}

/// Extracts the first balanced `{...}` object from free text.
///
/// Models wrap their JSON in prose or code fences often enough that a plain
/// parse fails; a greedy regex over-matches when the text contains more than
/// one brace pair. This scanner tracks brace depth and skips braces inside
/// string literals.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn string_field(value: &Value, camel: &str, snake: &str) -> Option<String> {
    value
        .get(camel)
        .or_else(|| value.get(snake))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn percentage_field(value: &Value, camel: &str, snake: &str) -> Option<u32> {
    value
        .get(camel)
        .or_else(|| value.get(snake))
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as u32)
}

/// Maps a parsed model response onto `AnalysisResult`, tolerating snake_case
/// key variants and out-of-range scores.
fn normalize_analysis(value: &Value) -> Option<AnalysisResult> {
    let score = value.get("score")?.as_f64()?;
    let score = (score.clamp(0.0, 10.0) * 10.0).round() / 10.0;

    let findings = value
        .get("findings")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(Finding {
                        title: string_field(item, "title", "title")?,
                        description: string_field(item, "description", "description")
                            .unwrap_or_default(),
                        finding_type: FindingType::parse_lenient(
                            string_field(item, "type", "finding_type")
                                .as_deref()
                                .unwrap_or("warning"),
                        ),
                        impact_percentage: percentage_field(
                            item,
                            "impactPercentage",
                            "impact_percentage",
                        ),
                    })
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let quick_wins = value
        .get("quickWins")
        .or_else(|| value.get("quick_wins"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(QuickWin {
                        action: string_field(item, "action", "action")?,
                        expected_improvement: percentage_field(
                            item,
                            "expectedImprovement",
                            "expected_improvement",
                        )
                        .unwrap_or(0),
                        implementation: string_field(item, "implementation", "implementation")
                            .unwrap_or_default(),
                    })
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    Some(AnalysisResult {
        score,
        sector: string_field(value, "sector", "sector").unwrap_or_else(|| "general".to_string()),
        sector_display: string_field(value, "sectorDisplay", "sector_display")
            .unwrap_or_else(|| "Algemeen".to_string()),
        findings,
        quick_wins,
        rewritten_intro: string_field(value, "rewrittenIntro", "rewritten_intro"),
        full_analysis: string_field(value, "fullAnalysis", "full_analysis").unwrap_or_default(),
        error: None,
    })
}

/// Runs the vacancy analysis, never failing the caller.
///
/// With a configured AI client the model's JSON answer is extracted and
/// normalized; any problem on that path yields the fixed fallback object with
/// `error` set. Without a client the local heuristic scorer answers instead.
pub async fn analyze_vacancy(
    claude: Option<&ClaudeService>,
    vacancy_text: &str,
    company_name: &str,
    job_title: &str,
) -> AnalysisResult {
    let Some(service) = claude else {
        tracing::info!("No AI credentials configured, using heuristic analysis");
        return scoring::heuristic_analysis(vacancy_text, "AI-analyse niet geconfigureerd");
    };

    let prompt = build_prompt(vacancy_text, company_name, job_title);
    let raw = match service.complete(SYSTEM_PROMPT, &prompt).await {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("AI analysis call failed: {}", e);
            return scoring::fixed_fallback("AI-analyse mislukt, standaardresultaat gebruikt");
        }
    };

    let Some(json_text) = extract_json_object(&raw) else {
        tracing::warn!("AI response contained no JSON object ({} chars)", raw.len());
        return scoring::fixed_fallback("AI-antwoord bevatte geen geldige JSON");
    };

    let parsed: Value = match serde_json::from_str(json_text) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Failed to parse extracted JSON: {}", e);
            return scoring::fixed_fallback("AI-antwoord kon niet worden verwerkt");
        }
    };

    match normalize_analysis(&parsed) {
        Some(result) => {
            tracing::info!(
                "AI analysis complete - score: {}, findings: {}",
                result.score,
                result.findings.len()
            );
            result
        }
        None => {
            tracing::warn!("AI JSON missed required fields");
            scoring::fixed_fallback("AI-antwoord was onvolledig")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_plain_object() {
        assert_eq!(extract_json_object(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn extracts_object_wrapped_in_prose() {
        let text = "Hier is de analyse:\n```json\n{\"score\": 7.2}\n```\nSucces!";
        assert_eq!(extract_json_object(text), Some("{\"score\": 7.2}"));
    }

    #[test]
    fn handles_nested_objects() {
        let text = r#"before {"outer": {"inner": 1}} after {"second": 2}"#;
        assert_eq!(extract_json_object(text), Some(r#"{"outer": {"inner": 1}}"#));
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let text = r#"{"note": "unbalanced } inside", "ok": true}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn no_object_yields_none() {
        assert_eq!(extract_json_object("geen json hier"), None);
        assert_eq!(extract_json_object("{ nooit gesloten"), None);
    }

    #[test]
    fn normalize_clamps_score_and_defaults_sector() {
        let value = json!({"score": 14.0, "findings": []});
        let result = normalize_analysis(&value).unwrap();
        assert_eq!(result.score, 10.0);
        assert_eq!(result.sector, "general");
        assert_eq!(result.sector_display, "Algemeen");
    }

    #[test]
    fn normalize_accepts_snake_case_keys() {
        let value = json!({
            "score": 6.5,
            "sector": "techniek",
            "sector_display": "Techniek",
            "findings": [
                {"title": "Test", "description": "d", "type": "success", "impact_percentage": 20.0}
            ],
            "quick_wins": [
                {"action": "Doe iets", "expected_improvement": 10, "implementation": "Nu"}
            ],
            "rewritten_intro": "Intro",
            "full_analysis": "Analyse"
        });
        let result = normalize_analysis(&value).unwrap();
        assert_eq!(result.sector_display, "Techniek");
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].impact_percentage, Some(20));
        assert_eq!(result.quick_wins[0].expected_improvement, 10);
        assert_eq!(result.rewritten_intro.as_deref(), Some("Intro"));
        assert_eq!(result.full_analysis, "Analyse");
    }

    #[test]
    fn normalize_requires_score() {
        assert!(normalize_analysis(&json!({"sector": "general"})).is_none());
    }

    #[test]
    fn unknown_finding_type_becomes_warning() {
        let value = json!({
            "score": 5.0,
            "findings": [{"title": "T", "description": "", "type": "kritiek"}]
        });
        let result = normalize_analysis(&value).unwrap();
        assert_eq!(result.findings[0].finding_type, FindingType::Warning);
    }
}
