/// Response normalization for lead batches
///
/// The upstream model is asked for a bare JSON array, but its output is not
/// trusted: payloads may arrive wrapped in markdown code fences, scores may
/// fall outside 0-100 or carry fractions, and ids may be empty or repeated.
/// This module turns that raw text into validated `Lead` records:
/// 1. Strip code-fence delimiters
/// 2. Parse the remainder as a JSON array of lead-shaped objects
/// 3. Clamp/round scores into 0-100
/// 4. Re-issue empty or duplicate ids
/// 5. Stable-sort descending by conversion probability
/// 6. Attach the batch's grounding sources to every lead
use crate::errors::AppError;
use crate::models::{GapFinding, Lead, Source};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use uuid::Uuid;

/// Raw lead shape as produced by the model, before validation.
///
/// Scores are accepted as floats; identifiers may be missing entirely.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLead {
    #[serde(default)]
    id: Option<String>,
    company_name: String,
    decision_maker: String,
    role: String,
    phone_number: String,
    email: String,
    location: String,
    conversion_probability: f64,
    gap_analysis: Vec<RawGapFinding>,
    outreach_email: String,
}

/// Raw gap finding shape as produced by the model.
#[derive(Debug, Deserialize)]
struct RawGapFinding {
    title: String,
    score: f64,
    description: String,
}

/// Strip leading/trailing markdown code-fence markers from a payload.
///
/// Runs to a fixpoint so stacked fence runs are fully removed and the result
/// is idempotent; a payload without fences is returned unchanged.
pub fn strip_code_fences(text: &str) -> String {
    let opening = Regex::new(r"^```(?:json)?\s*").unwrap();
    let closing = Regex::new(r"\s*```$").unwrap();

    let mut current = text.trim().to_string();
    loop {
        let without_open = opening.replace(&current, "");
        let stripped = closing.replace(&without_open, "").trim().to_string();
        if stripped == current {
            return current;
        }
        current = stripped;
    }
}

/// Clamp a raw model score into 0-100, rounding fractions to the nearest
/// integer. Infinities clamp like any other out-of-range value; NaN clamps
/// to 0.
pub fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

/// Parse a raw upstream payload into validated leads.
///
/// Propagates a format error on unparseable payloads or missing required
/// fields; there is no partial recovery.
pub fn parse_leads(payload: &str) -> Result<Vec<Lead>, AppError> {
    let cleaned = strip_code_fences(payload);

    let raw: Vec<RawLead> = serde_json::from_str(&cleaned).map_err(|e| {
        AppError::UpstreamFormat(format!("Payload is not a valid lead array: {}", e))
    })?;

    let mut leads: Vec<Lead> = raw
        .into_iter()
        .map(|r| Lead {
            id: r.id.unwrap_or_default(),
            company_name: r.company_name,
            decision_maker: r.decision_maker,
            role: r.role,
            phone_number: r.phone_number,
            email: r.email,
            location: r.location,
            conversion_probability: clamp_score(r.conversion_probability),
            gap_analysis: r
                .gap_analysis
                .into_iter()
                .map(|g| GapFinding {
                    title: g.title,
                    score: clamp_score(g.score),
                    description: g.description,
                })
                .collect(),
            outreach_email: r.outreach_email,
            sources: None,
        })
        .collect();

    ensure_unique_ids(&mut leads);
    Ok(leads)
}

/// Replace empty or duplicate lead ids with fresh UUIDs so identifiers are
/// unique within the batch. The first occurrence of an id keeps it.
pub fn ensure_unique_ids(leads: &mut [Lead]) {
    let mut seen: HashSet<String> = HashSet::new();
    for lead in leads.iter_mut() {
        if lead.id.trim().is_empty() || !seen.insert(lead.id.clone()) {
            let fresh = Uuid::new_v4().to_string();
            tracing::debug!("Re-issued lead id '{}' -> '{}'", lead.id, fresh);
            seen.insert(fresh.clone());
            lead.id = fresh;
        }
    }
}

/// Stable-sort leads descending by conversion probability.
///
/// Ties retain their relative input order (`sort_by` is stable), keeping the
/// ranking deterministic for equal scores.
pub fn rank_leads(leads: &mut [Lead]) {
    leads.sort_by(|a, b| b.conversion_probability.cmp(&a.conversion_probability));
}

/// Attach the batch-level grounding sources to every lead.
///
/// With zero sources the field stays absent on every lead; with M>0 sources
/// every lead carries the identical set.
pub fn attach_sources(leads: &mut [Lead], sources: &[Source]) {
    for lead in leads.iter_mut() {
        lead.sources = if sources.is_empty() {
            None
        } else {
            Some(sources.to_vec())
        };
    }
}
