/// Tests for the lead-generation building blocks: query validation, prompt
/// construction, normalization policy and the wire contract of the models.
use rust_leadgen_api::errors::AppError;
use rust_leadgen_api::leadgen::{build_prompt, lead_response_schema, validate_query};
use rust_leadgen_api::models::{GapFinding, Lead, LeadQuery, Source};
use rust_leadgen_api::normalize::{
    attach_sources, clamp_score, parse_leads, rank_leads, strip_code_fences,
};

fn query(category: &str, location: &str, target_gaps: Option<&str>) -> LeadQuery {
    LeadQuery {
        category: category.to_string(),
        location: location.to_string(),
        target_gaps: target_gaps.map(str::to_string),
    }
}

fn make_lead(id: &str, probability: u8) -> Lead {
    Lead {
        id: id.to_string(),
        company_name: format!("Company {}", id),
        decision_maker: "Dana Ortiz".to_string(),
        role: "Owner".to_string(),
        phone_number: "+1 212 555 0101".to_string(),
        email: format!("{}@example.com", id),
        location: "New York, NY".to_string(),
        conversion_probability: probability,
        gap_analysis: vec![GapFinding {
            title: "SEO".to_string(),
            score: 70,
            description: "Weak local search presence".to_string(),
        }],
        outreach_email: "Hi Dana, ...".to_string(),
        sources: None,
    }
}

#[test]
fn validation_rejects_blank_inputs_before_any_dispatch() {
    let err = validate_query(&query("", "Austin, TX", None)).unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = validate_query(&query("Gyms", "   ", None)).unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    assert!(validate_query(&query("Gyms", "Austin, TX", None)).is_ok());
}

#[test]
fn prompt_round_trip_is_deterministic() {
    let q = query("Dental Clinics", "New York, NY", Some("SEO, Social Media"));
    let first = build_prompt(&q, 10);
    let second = build_prompt(&q, 10);
    assert_eq!(first, second);

    // A different query yields a different instruction
    let other = build_prompt(&query("Gyms", "New York, NY", Some("SEO, Social Media")), 10);
    assert_ne!(first, other);
}

#[test]
fn prompt_switches_between_focused_and_general_gap_analysis() {
    let focused = build_prompt(&query("Gyms", "Austin, TX", Some("Tech Stack")), 10);
    assert!(focused.contains("focus the \"Gap Analysis\" on these areas: Tech Stack"));
    assert!(!focused.contains("general market strategy"));

    let general = build_prompt(&query("Gyms", "Austin, TX", None), 10);
    assert!(general.contains("general market strategy"));
}

#[test]
fn prompt_requests_a_bare_json_array_of_the_configured_size() {
    let prompt = build_prompt(&query("Gyms", "Austin, TX", None), 7);
    assert!(prompt.contains("Find 7 high-potential business leads"));
    assert!(prompt.contains("Generate ONLY a valid JSON array of objects."));
}

#[test]
fn schema_marks_every_lead_field_required() {
    let schema = lead_response_schema();
    assert_eq!(schema["type"], "ARRAY");
    let required = schema["items"]["required"].as_array().unwrap();
    assert_eq!(required.len(), 10);
}

#[test]
fn fences_with_surrounding_whitespace_still_strip() {
    let payload = "  \n```json\n[1, 2]\n```  \n";
    assert_eq!(strip_code_fences(payload), "[1, 2]");
}

#[test]
fn clamp_policy_is_clamp_not_reject() {
    assert_eq!(clamp_score(-10.0), 0);
    assert_eq!(clamp_score(0.0), 0);
    assert_eq!(clamp_score(55.0), 55);
    assert_eq!(clamp_score(100.0), 100);
    assert_eq!(clamp_score(250.0), 100);
}

#[test]
fn ranking_orders_adjacent_pairs_descending() {
    let mut leads = vec![
        make_lead("a", 12),
        make_lead("b", 97),
        make_lead("c", 55),
        make_lead("d", 97),
    ];
    rank_leads(&mut leads);
    for pair in leads.windows(2) {
        assert!(pair[0].conversion_probability >= pair[1].conversion_probability);
    }
    // Stability: 'b' came before 'd' at the same score
    assert_eq!(leads[0].id, "b");
    assert_eq!(leads[1].id, "d");
}

#[test]
fn lead_serializes_with_camel_case_wire_names() {
    let lead = make_lead("a", 80);
    let value = serde_json::to_value(&lead).unwrap();
    assert_eq!(value["companyName"], "Company a");
    assert_eq!(value["conversionProbability"], 80);
    assert_eq!(value["gapAnalysis"][0]["title"], "SEO");
    // Absent sources are omitted entirely, not serialized as null
    assert!(value.get("sources").is_none());
}

#[test]
fn attached_sources_appear_on_the_wire() {
    let mut leads = vec![make_lead("a", 80)];
    attach_sources(
        &mut leads,
        &[Source {
            uri: "https://example.com".to_string(),
            title: "Example".to_string(),
        }],
    );
    let value = serde_json::to_value(&leads[0]).unwrap();
    assert_eq!(value["sources"][0]["uri"], "https://example.com");
}

#[test]
fn parse_accepts_integer_and_float_scores() {
    let payload = r#"[{
        "id": "a",
        "companyName": "Acme",
        "decisionMaker": "Dana",
        "role": "Owner",
        "phoneNumber": "555",
        "email": "d@a.example",
        "location": "NY",
        "conversionProbability": 88,
        "gapAnalysis": [{ "title": "SEO", "score": 61.7, "description": "thin" }],
        "outreachEmail": "Hi"
    }]"#;
    let leads = parse_leads(payload).unwrap();
    assert_eq!(leads[0].conversion_probability, 88);
    assert_eq!(leads[0].gap_analysis[0].score, 62);
}
