use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============ Domain Models ============

/// A web reference cited by the search-grounded model in support of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// URI of the cited page.
    pub uri: String,
    /// Display title for the citation.
    pub title: String,
}

/// A single named deficiency finding inside a lead's gap analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapFinding {
    /// Short label for the gap (e.g., "SEO", "Social Media Presence").
    pub title: String,
    /// Severity of the gap, 0-100.
    pub score: u8,
    /// Free-text rationale for the finding.
    pub description: String,
}

/// A prospective business record returned by one lead-generation query.
///
/// Field names on the wire are camelCase to match the dashboard contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    /// Opaque identifier, unique within one batch.
    pub id: String,
    /// Company name.
    pub company_name: String,
    /// Name of the decision maker to contact.
    pub decision_maker: String,
    /// Role of the decision maker.
    pub role: String,
    /// Contact phone number (opaque display string).
    pub phone_number: String,
    /// Contact email address.
    pub email: String,
    /// Company location.
    pub location: String,
    /// Estimated conversion likelihood, 0-100. Sole ranking key.
    pub conversion_probability: u8,
    /// Ordered gap findings; the first three feed the dashboard summary.
    pub gap_analysis: Vec<GapFinding>,
    /// Generated first-touchpoint outreach email.
    pub outreach_email: String,
    /// Grounding sources for the batch this lead belongs to, when any were
    /// surfaced. Identical for every lead in a batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
}

/// Parameters of one lead-generation query.
#[derive(Debug, Clone, Deserialize)]
pub struct LeadQuery {
    /// Market segment / industry to prospect in.
    pub category: String,
    /// Region to prospect in.
    pub location: String,
    /// Optional free-text focus for the gap analysis.
    #[serde(default)]
    pub target_gaps: Option<String>,
}

/// A ranked batch of leads produced by one query.
///
/// Held in memory only; replaced wholesale by the next successful query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadBatch {
    /// Leads sorted descending by conversion probability.
    pub leads: Vec<Lead>,
    /// Grounding sources surfaced by the search-augmented call, batch-level.
    pub sources: Vec<Source>,
    /// When this batch was generated.
    pub generated_at: DateTime<Utc>,
}

// ============ API Request/Response Models ============

/// Request payload for POST /api/v1/leads/generate.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateLeadsRequest {
    /// Market segment / industry (required, non-empty).
    pub category: String,
    /// Region (required, non-empty).
    pub location: String,
    /// Optional gap-analysis focus.
    #[serde(default)]
    pub target_gaps: Option<String>,
}

impl From<GenerateLeadsRequest> for LeadQuery {
    fn from(req: GenerateLeadsRequest) -> Self {
        LeadQuery {
            category: req.category,
            location: req.location,
            target_gaps: req.target_gaps,
        }
    }
}

/// Response payload carrying the current batch and selection.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    /// Ranked leads with their batch sources attached.
    pub leads: Vec<Lead>,
    /// Id of the currently selected lead, if any.
    pub selected_id: Option<String>,
    /// When the batch was generated.
    pub generated_at: DateTime<Utc>,
}
