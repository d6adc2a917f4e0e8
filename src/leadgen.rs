/// Lead generation workflow
///
/// This module provides the reusable steps behind the generate endpoint:
/// 1. Validate the query (category and location required)
/// 2. Build the prompt and requested response schema
/// 3. Call the search-grounded Gemini API
/// 4. Normalize and rank the returned batch
/// 5. Attach batch-level grounding sources
use crate::errors::{AppError, ResultExt};
use crate::gemini_client::GeminiClient;
use crate::models::{LeadBatch, LeadQuery};
use crate::normalize;
use chrono::Utc;
use serde_json::{json, Value};

/// Validate a lead query before any upstream call is made.
///
/// Both category and location must be non-empty after trimming; the optional
/// gap focus is free text and never rejected.
pub fn validate_query(query: &LeadQuery) -> Result<(), AppError> {
    if query.category.trim().is_empty() {
        return Err(AppError::BadRequest(
            "category is required and cannot be empty".to_string(),
        ));
    }
    if query.location.trim().is_empty() {
        return Err(AppError::BadRequest(
            "location is required and cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Build the instruction text for one query.
///
/// Pure function of its inputs: identical query and batch size always yield
/// the identical prompt.
pub fn build_prompt(query: &LeadQuery, max_leads: usize) -> String {
    let gap_instruction = match query.target_gaps.as_deref().map(str::trim) {
        Some(focus) if !focus.is_empty() => format!(
            "Specifically focus the \"Gap Analysis\" on these areas: {}.",
            focus
        ),
        _ => "Perform a deep \"Gap Analysis\" identifying what they are currently missing \
              in their general market strategy (e.g., SEO, Social Media, Tech Stack, \
              Customer Experience, etc.)."
            .to_string(),
    };

    format!(
        "Act as a world-class B2B Lead Generation and Market Intelligence expert.\n\
         Find {max_leads} high-potential business leads in the {category} industry \
         located in or around {location}.\n\
         \n\
         {gap_instruction}\n\
         \n\
         Assign a \"Conversion Probability\" (0-100) based on how much they likely \
         need help based on their gaps.\n\
         Craft a first-touchpoint highly personalized email for each lead.\n\
         \n\
         Ensure you provide a valid mobile phone number for each lead.\n\
         Rank the leads in the response from highest to lowest Conversion Probability.\n\
         \n\
         Generate ONLY a valid JSON array of objects.",
        max_leads = max_leads,
        category = query.category.trim(),
        location = query.location.trim(),
        gap_instruction = gap_instruction,
    )
}

/// JSON schema requested from the model: an array of lead objects with every
/// contact, probability, gap-analysis and outreach field required.
pub fn lead_response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "STRING" },
                "companyName": { "type": "STRING" },
                "decisionMaker": { "type": "STRING" },
                "role": { "type": "STRING" },
                "phoneNumber": { "type": "STRING" },
                "email": { "type": "STRING" },
                "location": { "type": "STRING" },
                "conversionProbability": { "type": "NUMBER" },
                "gapAnalysis": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "title": { "type": "STRING" },
                            "score": { "type": "NUMBER" },
                            "description": { "type": "STRING" }
                        },
                        "required": ["title", "score", "description"]
                    }
                },
                "outreachEmail": { "type": "STRING" }
            },
            "required": [
                "id", "companyName", "decisionMaker", "role", "phoneNumber",
                "email", "location", "conversionProbability", "gapAnalysis",
                "outreachEmail"
            ]
        }
    })
}

/// Run the full lead-generation workflow for one query.
///
/// # Arguments
///
/// * `client` - Gemini client to call.
/// * `query` - Validated or unvalidated query; validation runs first.
/// * `max_leads` - Batch size requested from the model.
///
/// # Returns
///
/// * `Result<LeadBatch, AppError>` - Ranked batch with sources attached.
pub async fn generate_leads(
    client: &GeminiClient,
    query: &LeadQuery,
    max_leads: usize,
) -> Result<LeadBatch, AppError> {
    // Step 1: Validate before any network traffic
    validate_query(query)?;

    tracing::info!(
        "Starting lead generation for category='{}' location='{}'",
        query.category.trim(),
        query.location.trim()
    );

    // Step 2: Build prompt and schema
    let prompt = build_prompt(query, max_leads);
    let schema = lead_response_schema();

    // Step 3: Call the upstream model
    tracing::info!("Step 1: Requesting up to {} leads from Gemini", max_leads);
    let outcome = client
        .generate(&prompt, &schema)
        .await
        .context("lead generation call")?;

    // Step 4: Normalize
    tracing::info!("Step 2: Normalizing upstream payload");
    let mut leads = normalize::parse_leads(&outcome.text).context("lead payload normalization")?;

    // Step 5: Rank (the upstream ordering is not trusted)
    tracing::info!("Step 3: Ranking {} lead(s) by conversion probability", leads.len());
    normalize::rank_leads(&mut leads);

    // Step 6: Attach batch-level grounding sources
    tracing::info!(
        "Step 4: Attaching {} grounding source(s)",
        outcome.sources.len()
    );
    normalize::attach_sources(&mut leads, &outcome.sources);

    Ok(LeadBatch {
        leads,
        sources: outcome.sources,
        generated_at: Utc::now(),
    })
}
