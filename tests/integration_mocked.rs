/// Integration tests with mocked external APIs
/// Tests the provider adapters and workflows without hitting real services
use kandidatentekort_api::analysis;
use kandidatentekort_api::config::{empty_test_config, Config};
use kandidatentekort_api::crm;
use kandidatentekort_api::email;
use kandidatentekort_api::models::{AnalysisResult, ConversionEvent, Lead};
use kandidatentekort_api::services::{
    ClaudeService, FacebookGraphService, Ga4Service, MetaCapiService, PipedriveService,
    ResendService,
};
use kandidatentekort_api::tracking::{self, TrackingContext};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn claude_config(base_url: &str) -> Config {
    let mut config = empty_test_config();
    config.claude_api_key = Some("test_claude_key".to_string());
    config.claude_base_url = base_url.to_string();
    config
}

fn pipedrive_config(base_url: &str) -> Config {
    let mut config = empty_test_config();
    config.pipedrive_api_token = Some("test_pd_token".to_string());
    config.pipedrive_base_url = base_url.to_string();
    config
}

fn sample_lead() -> Lead {
    Lead {
        name: "Jan de Vries".to_string(),
        email: "jan@bakkerij.nl".to_string(),
        company: "Bakkerij de Vries".to_string(),
        job_title: "Bakker".to_string(),
        vacancy_text: "Wij zoeken een bakker. Salaris: €3.200 bruto.".to_string(),
        submitted_at: "2025-03-01T10:00:00Z".to_string(),
    }
}

#[tokio::test]
async fn claude_json_response_is_normalized() {
    let mock_server = MockServer::start().await;

    let analysis_json = serde_json::json!({
        "score": 7.2,
        "sector": "horeca",
        "sectorDisplay": "Horeca",
        "findings": [
            {"title": "Salarisindicatie gevonden", "description": "Goed.", "type": "success"}
        ],
        "quickWins": [
            {"action": "Meer structuur", "expectedImprovement": 15, "implementation": "Bullets."}
        ],
        "rewrittenIntro": "Word jij onze bakker?",
        "fullAnalysis": "Degelijke tekst."
    });
    let model_reply = format!("Hier is de analyse:\n{}\nSucces ermee!", analysis_json);

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test_claude_key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(serde_json::json!({
            "max_tokens": 2000,
            "temperature": 0.3
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{"type": "text", "text": model_reply}],
            "model": "claude-3-5-sonnet-20241022",
            "usage": {"input_tokens": 500, "output_tokens": 300}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = claude_config(&mock_server.uri());
    let claude = ClaudeService::from_config(&config);

    let result = analysis::analyze_vacancy(
        claude.as_ref(),
        "Wij zoeken een bakker.",
        "Bakkerij de Vries",
        "Bakker",
    )
    .await;

    assert_eq!(result.score, 7.2);
    assert_eq!(result.sector, "horeca");
    assert_eq!(result.findings.len(), 1);
    assert_eq!(result.quick_wins[0].expected_improvement, 15);
    assert!(result.error.is_none());
    assert!(!result.is_fallback());
}

#[tokio::test]
async fn claude_prose_response_yields_fixed_fallback() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{"type": "text", "text": "Sorry, ik kan deze tekst niet analyseren."}],
            "model": "claude-3-5-sonnet-20241022"
        })))
        .mount(&mock_server)
        .await;

    let config = claude_config(&mock_server.uri());
    let claude = ClaudeService::from_config(&config);

    let result = analysis::analyze_vacancy(claude.as_ref(), "Wij zoeken iemand.", "", "").await;

    assert_eq!(result.score, 5.0);
    assert!(result.error.is_some());
    assert!(result.is_fallback());
}

#[tokio::test]
async fn claude_server_error_yields_fixed_fallback() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
        .mount(&mock_server)
        .await;

    let config = claude_config(&mock_server.uri());
    let claude = ClaudeService::from_config(&config);

    let result = analysis::analyze_vacancy(claude.as_ref(), "Tekst.", "", "").await;

    assert_eq!(result.score, 5.0);
    assert!(result.is_fallback());
}

#[tokio::test]
async fn unconfigured_claude_uses_heuristic_scorer() {
    let config = empty_test_config();
    let claude = ClaudeService::from_config(&config);
    assert!(claude.is_none());

    let result = analysis::analyze_vacancy(
        claude.as_ref(),
        "Salaris: €3.000 bruto. Jij werkt in ons team.",
        "",
        "",
    )
    .await;

    assert!(result.is_fallback());
    assert_eq!(result.findings.len(), 3);
    assert!((3.0..=8.5).contains(&result.score));
}

#[tokio::test]
async fn pipedrive_registration_runs_full_sequence() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/organizations/search"))
        .and(query_param("api_token", "test_pd_token"))
        .and(query_param("term", "Bakkerij de Vries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": {"items": []}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/organizations"))
        .and(query_param("api_token", "test_pd_token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "success": true,
            "data": {"id": 41}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/persons"))
        .and(body_partial_json(serde_json::json!({
            "name": "Jan de Vries",
            "org_id": 41
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "success": true,
            "data": {"id": 7}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    // score 6.5 -> deal value round((10 - 6.5) * 500) = 1750 EUR
    Mock::given(method("POST"))
        .and(path("/v1/deals"))
        .and(body_partial_json(serde_json::json!({
            "title": "Bakkerij de Vries - Bakker",
            "value": 1750,
            "currency": "EUR"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "success": true,
            "data": {"id": 99}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/notes"))
        .and(body_partial_json(serde_json::json!({"deal_id": 99})))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "success": true,
            "data": {"id": 12}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = pipedrive_config(&mock_server.uri());
    let pipedrive = PipedriveService::from_config(&config).unwrap();

    let analysis_result: AnalysisResult = serde_json::from_value(serde_json::json!({
        "score": 6.5,
        "sector": "horeca",
        "sectorDisplay": "Horeca",
        "findings": [
            {"title": "Salarisindicatie gevonden", "description": "Goed.", "type": "success"}
        ],
        "fullAnalysis": "Prima."
    }))
    .unwrap();

    let outcome = crm::register_lead(&pipedrive, &sample_lead(), Some(&analysis_result)).await;

    assert_eq!(outcome.org_id, Some(41));
    assert_eq!(outcome.person_id, Some(7));
    assert_eq!(outcome.deal_id, Some(99));
    assert!(outcome.note_added);
}

#[tokio::test]
async fn pipedrive_reuses_exactly_matching_organization() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/organizations/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": {"items": [
                {"item": {"id": 10, "name": "Bakkerij de Vries Holding"}},
                {"item": {"id": 11, "name": "bakkerij de vries"}}
            ]}
        })))
        .mount(&mock_server)
        .await;

    let config = pipedrive_config(&mock_server.uri());
    let pipedrive = PipedriveService::from_config(&config).unwrap();

    let found = pipedrive
        .search_organization("Bakkerij de Vries")
        .await
        .unwrap();
    // Substring hit 10 is skipped, case-insensitive exact match 11 wins
    assert_eq!(found, Some(11));
}

#[tokio::test]
async fn pipedrive_continues_past_person_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/organizations/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": {"items": [{"item": {"id": 41, "name": "Bakkerij de Vries"}}]}
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/persons"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/deals"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "success": true,
            "data": {"id": 99}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = pipedrive_config(&mock_server.uri());
    let pipedrive = PipedriveService::from_config(&config).unwrap();

    let outcome = crm::register_lead(&pipedrive, &sample_lead(), None).await;

    assert_eq!(outcome.org_id, Some(41));
    assert_eq!(outcome.person_id, None);
    // Deal creation still ran, without a person id
    assert_eq!(outcome.deal_id, Some(99));
    // No analysis, no note
    assert!(!outcome.note_added);
}

#[tokio::test]
async fn resend_rejection_collapses_to_false() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
            "message": "Invalid `to` address"
        })))
        .mount(&mock_server)
        .await;

    let mut config = empty_test_config();
    config.resend_api_key = Some("test_resend_key".to_string());
    config.resend_base_url = mock_server.uri();
    let resend = ResendService::from_config(&config).unwrap();

    let analysis_result: AnalysisResult = serde_json::from_value(serde_json::json!({
        "score": 6.0,
        "sector": "general",
        "sectorDisplay": "Algemeen",
        "findings": [],
        "fullAnalysis": ""
    }))
    .unwrap();

    let sent = email::send_analysis_email(&resend, &sample_lead(), &analysis_result).await;
    assert!(!sent);
}

#[tokio::test]
async fn resend_acceptance_returns_true() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("Authorization", "Bearer test_resend_key"))
        .and(body_partial_json(serde_json::json!({
            "to": ["jan@bakkerij.nl"],
            "subject": "Jouw vacature-analyse: 6.0/10"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "4ef0c221"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = empty_test_config();
    config.resend_api_key = Some("test_resend_key".to_string());
    config.resend_base_url = mock_server.uri();
    let resend = ResendService::from_config(&config).unwrap();

    let analysis_result: AnalysisResult = serde_json::from_value(serde_json::json!({
        "score": 6.0,
        "sector": "general",
        "sectorDisplay": "Algemeen",
        "findings": [],
        "fullAnalysis": ""
    }))
    .unwrap();

    let sent = email::send_analysis_email(&resend, &sample_lead(), &analysis_result).await;
    assert!(sent);
}

#[tokio::test]
async fn tracking_with_only_ga4_configured_skips_facebook() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mp/collect"))
        .and(query_param("measurement_id", "G-TEST123"))
        .and(query_param("api_secret", "test_secret"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = empty_test_config();
    config.ga4_measurement_id = Some("G-TEST123".to_string());
    config.ga4_api_secret = Some("test_secret".to_string());
    config.ga4_base_url = mock_server.uri();

    let meta = MetaCapiService::from_config(&config);
    assert!(meta.is_none());
    let ga4 = Ga4Service::from_config(&config);

    let mut event = ConversionEvent::new("vacature_analyse".to_string(), None);
    event.email = Some("jan@bakkerij.nl".to_string());

    let (facebook, ga4_outcome) = tracking::send_conversion_event(
        meta.as_ref(),
        ga4.as_ref(),
        &event,
        &TrackingContext::default(),
        "https://kandidatentekort.nl",
    )
    .await;

    assert!(facebook.is_skipped());
    assert!(ga4_outcome.is_delivered());
}

#[tokio::test]
async fn meta_capi_failure_never_touches_ga4_outcome() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/123456/events"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {"message": "Invalid parameter"}
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/mp/collect"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let mut config = empty_test_config();
    config.meta_pixel_id = Some("123456".to_string());
    config.meta_access_token = Some("test_meta_token".to_string());
    config.meta_graph_base_url = mock_server.uri();
    config.ga4_measurement_id = Some("G-TEST123".to_string());
    config.ga4_api_secret = Some("test_secret".to_string());
    config.ga4_base_url = mock_server.uri();

    let meta = MetaCapiService::from_config(&config);
    let ga4 = Ga4Service::from_config(&config);

    let event = ConversionEvent::new("lead".to_string(), Some("evt_abc".to_string()));
    let (facebook, ga4_outcome) = tracking::send_conversion_event(
        meta.as_ref(),
        ga4.as_ref(),
        &event,
        &TrackingContext::default(),
        "https://kandidatentekort.nl",
    )
    .await;

    assert!(!facebook.is_delivered());
    assert!(!facebook.is_skipped());
    assert!(ga4_outcome.is_delivered());
}

#[tokio::test]
async fn facebook_lead_is_dereferenced_and_mapped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/987654"))
        .and(query_param("access_token", "test_page_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "987654",
            "created_time": "2025-03-01T10:00:00+0000",
            "field_data": [
                {"name": "first_name", "values": ["Jan"]},
                {"name": "last_name", "values": ["de Vries"]},
                {"name": "email", "values": ["jan@bakkerij.nl"]},
                {"name": "phone_number", "values": ["+31612345678"]}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = empty_test_config();
    config.fb_page_access_token = Some("test_page_token".to_string());
    config.meta_graph_base_url = mock_server.uri();
    let graph = FacebookGraphService::from_config(&config).unwrap();

    let detail = graph.fetch_lead("987654").await.unwrap();
    assert_eq!(detail.full_name().as_deref(), Some("Jan de Vries"));
    assert_eq!(detail.email(), Some("jan@bakkerij.nl"));
    assert_eq!(detail.phone(), Some("+31612345678"));
    assert_eq!(detail.company(), None);
}

#[tokio::test]
async fn graph_error_body_with_200_status_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/987654"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": {"message": "Unsupported get request.", "code": 100}
        })))
        .mount(&mock_server)
        .await;

    let mut config = empty_test_config();
    config.fb_page_access_token = Some("test_page_token".to_string());
    config.meta_graph_base_url = mock_server.uri();
    let graph = FacebookGraphService::from_config(&config).unwrap();

    assert!(graph.fetch_lead("987654").await.is_err());
}
