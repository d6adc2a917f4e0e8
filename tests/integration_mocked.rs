/// Integration tests with a mocked upstream Gemini API
/// Tests the complete lead-generation workflow without hitting the real service
use rust_leadgen_api::errors::AppError;
use rust_leadgen_api::gemini_client::GeminiClient;
use rust_leadgen_api::leadgen;
use rust_leadgen_api::models::LeadQuery;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gemini-3-flash-preview";

fn generate_content_path() -> String {
    format!("/v1beta/models/{}:generateContent", MODEL)
}

/// Helper to create a client pointing at the mock server
fn create_test_client(base_url: String) -> GeminiClient {
    GeminiClient::new(base_url, "test_key".to_string(), MODEL.to_string()).unwrap()
}

fn test_query() -> LeadQuery {
    LeadQuery {
        category: "Dental Clinics".to_string(),
        location: "New York, NY".to_string(),
        target_gaps: Some("SEO".to_string()),
    }
}

fn lead_value(id: &str, probability: f64) -> serde_json::Value {
    json!({
        "id": id,
        "companyName": format!("Company {}", id),
        "decisionMaker": "Dana Ortiz",
        "role": "Practice Owner",
        "phoneNumber": "+1 212 555 0101",
        "email": format!("{}@example.com", id),
        "location": "New York, NY",
        "conversionProbability": probability,
        "gapAnalysis": [
            { "title": "SEO", "score": 75, "description": "Thin local rankings" }
        ],
        "outreachEmail": format!("Hi, this is a note for {}", id)
    })
}

/// Wraps a payload text in the generateContent response envelope, optionally
/// with grounding chunks
fn gemini_envelope(payload: &str, source_uris: &[&str]) -> serde_json::Value {
    let chunks: Vec<serde_json::Value> = source_uris
        .iter()
        .map(|uri| json!({ "web": { "uri": uri, "title": format!("Title for {}", uri) } }))
        .collect();

    json!({
        "candidates": [{
            "content": { "parts": [{ "text": payload }] },
            "groundingMetadata": { "groundingChunks": chunks }
        }]
    })
}

#[tokio::test]
async fn test_successful_generation_ranks_and_attaches_sources() {
    let mock_server = MockServer::start().await;

    // Unsorted payload with an out-of-range score and a duplicate id
    let payload = json!([
        lead_value("a", 40.0),
        lead_value("b", 150.0),
        lead_value("a", 72.0)
    ])
    .to_string();

    Mock::given(method("POST"))
        .and(path(generate_content_path()))
        .and(header("x-goog-api-key", "test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope(
            &payload,
            &["https://one.example", "https://two.example"],
        )))
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    let batch = leadgen::generate_leads(&client, &test_query(), 10)
        .await
        .unwrap();

    assert_eq!(batch.leads.len(), 3);
    // Out-of-range score clamped and ranked first
    assert_eq!(batch.leads[0].conversion_probability, 100);
    for pair in batch.leads.windows(2) {
        assert!(pair[0].conversion_probability >= pair[1].conversion_probability);
    }
    // Duplicate ids re-issued
    let mut ids: Vec<&str> = batch.leads.iter().map(|l| l.id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    // Every lead carries the identical batch-level source set
    assert_eq!(batch.sources.len(), 2);
    for lead in &batch.leads {
        assert_eq!(lead.sources.as_deref(), Some(&batch.sources[..]));
    }
}

#[tokio::test]
async fn test_fenced_payload_parses_like_bare_payload() {
    let mock_server = MockServer::start().await;

    let bare = json!([lead_value("a", 66.0)]).to_string();
    let fenced = format!("```json\n{}\n```", bare);

    Mock::given(method("POST"))
        .and(path(generate_content_path()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(gemini_envelope(&fenced, &[])),
        )
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    let batch = leadgen::generate_leads(&client, &test_query(), 10)
        .await
        .unwrap();

    assert_eq!(batch.leads.len(), 1);
    assert_eq!(batch.leads[0].conversion_probability, 66);
}

#[tokio::test]
async fn test_zero_sources_leave_leads_without_sources() {
    let mock_server = MockServer::start().await;

    let payload = json!([lead_value("a", 50.0), lead_value("b", 60.0)]).to_string();

    Mock::given(method("POST"))
        .and(path(generate_content_path()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(gemini_envelope(&payload, &[])),
        )
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    let batch = leadgen::generate_leads(&client, &test_query(), 10)
        .await
        .unwrap();

    assert!(batch.sources.is_empty());
    assert!(batch.leads.iter().all(|l| l.sources.is_none()));
}

#[tokio::test]
async fn test_upstream_error_surfaces_as_external_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(generate_content_path()))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    let result = leadgen::generate_leads(&client, &test_query(), 10).await;

    match result.unwrap_err() {
        AppError::WithContext { source, .. } => {
            assert!(matches!(*source, AppError::ExternalApiError(_)))
        }
        other => panic!("expected ExternalApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_payload_surfaces_as_format_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(generate_content_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope(
            "I could not find any leads, sorry!",
            &[],
        )))
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    let result = leadgen::generate_leads(&client, &test_query(), 10).await;

    match result.unwrap_err() {
        AppError::WithContext { source, .. } => {
            assert!(matches!(*source, AppError::UpstreamFormat(_)))
        }
        other => panic!("expected UpstreamFormat, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_candidate_list_surfaces_as_format_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(generate_content_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    let result = leadgen::generate_leads(&client, &test_query(), 10).await;

    match result.unwrap_err() {
        AppError::WithContext { source, .. } => {
            assert!(matches!(*source, AppError::UpstreamFormat(_)))
        }
        other => panic!("expected UpstreamFormat, got {:?}", other),
    }
}

#[tokio::test]
async fn test_validation_failure_never_reaches_upstream() {
    let mock_server = MockServer::start().await;

    // Expect zero calls: validation fails before the network
    Mock::given(method("POST"))
        .and(path(generate_content_path()))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    let query = LeadQuery {
        category: "".to_string(),
        location: "New York, NY".to_string(),
        target_gaps: None,
    };
    let result = leadgen::generate_leads(&client, &query, 10).await;

    assert!(matches!(result.unwrap_err(), AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_rerunning_a_query_replaces_the_batch() {
    let mock_server = MockServer::start().await;

    // Same query twice: the upstream is free to answer differently each time,
    // so every run produces a fresh batch.
    Mock::given(method("POST"))
        .and(path(generate_content_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope(
            &json!([lead_value("fresh", 90.0)]).to_string(),
            &[],
        )))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    let first = leadgen::generate_leads(&client, &test_query(), 10)
        .await
        .unwrap();
    let second = leadgen::generate_leads(&client, &test_query(), 10)
        .await
        .unwrap();

    assert_eq!(first.leads.len(), second.leads.len());
    assert!(second.generated_at >= first.generated_at);
}
