use crate::config::Config;
use crate::errors::AppError;
use crate::gemini_client::GeminiClient;
use crate::leadgen;
use crate::models::*;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// The batch currently held for the dashboard, together with its selection.
///
/// Replaced wholesale (batch and selection together) after each successful
/// query; never mutated in place across requests.
#[derive(Debug, Clone)]
pub struct CurrentBatch {
    pub batch: LeadBatch,
    /// Id of the selected lead; `None` only when the batch is empty.
    pub selected_id: Option<String>,
}

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Client for the upstream Gemini API.
    pub gemini: GeminiClient,
    /// Current batch + selection slot.
    pub current: RwLock<Option<CurrentBatch>>,
    /// Single in-flight generation slot: a second concurrent generation is
    /// rejected while this is held.
    pub generating: Mutex<()>,
}

impl AppState {
    pub fn new(config: Config, gemini: GeminiClient) -> Self {
        Self {
            config,
            gemini,
            current: RwLock::new(None),
            generating: Mutex::new(()),
        }
    }
}

/// The versioned API route table. `main` layers rate limiting and body
/// limits on top of this; `create_router` wraps it for tests. Both go
/// through here so the tested routes cannot drift from the shipped ones.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/leads/generate", post(generate_leads))
        .route("/api/v1/leads", get(current_batch))
        .route("/api/v1/leads/selected/:id", put(select_lead))
}

/// Builds the full router without middleware; tests call this directly.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(api_routes())
        .with_state(state)
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-leadgen-api",
            "version": "0.1.0"
        })),
    )
}

/// POST /api/v1/leads/generate
///
/// Runs one lead-generation query and replaces the held batch and selection
/// atomically on success. The first-ranked lead is auto-selected.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `req` - Query parameters (category, location, optional gap focus).
///
/// # Returns
///
/// * `Result<Json<BatchResponse>, AppError>` - The ranked batch or an error.
pub async fn generate_leads(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateLeadsRequest>,
) -> Result<Json<BatchResponse>, AppError> {
    tracing::info!(
        "POST /api/v1/leads/generate - category='{}' location='{}'",
        req.category,
        req.location
    );

    let query: LeadQuery = req.into();

    // Validation errors surface synchronously, before the in-flight check
    // and before any upstream traffic.
    leadgen::validate_query(&query)?;

    // One generation at a time per instance. The dashboard disables its
    // trigger while a request is outstanding; this guard enforces the same
    // rule server-side.
    let _guard = state.generating.try_lock().map_err(|_| {
        AppError::Busy("A lead generation request is already in progress".to_string())
    })?;

    let batch = leadgen::generate_leads(&state.gemini, &query, state.config.lead_batch_size).await?;

    let selected_id = batch.leads.first().map(|lead| lead.id.clone());
    let response = BatchResponse {
        leads: batch.leads.clone(),
        selected_id: selected_id.clone(),
        generated_at: batch.generated_at,
    };

    tracing::info!(
        "Generated batch of {} lead(s), {} source(s), selected={:?}",
        batch.leads.len(),
        batch.sources.len(),
        selected_id
    );

    // Replace batch and selection together, only after full success.
    let mut slot = state
        .current
        .write()
        .map_err(|_| AppError::InternalError("batch state lock poisoned".to_string()))?;
    *slot = Some(CurrentBatch { batch, selected_id });

    Ok(Json(response))
}

/// GET /api/v1/leads
///
/// Returns the currently held batch and selection.
pub async fn current_batch(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BatchResponse>, AppError> {
    let slot = state
        .current
        .read()
        .map_err(|_| AppError::InternalError("batch state lock poisoned".to_string()))?;

    let current = slot
        .as_ref()
        .ok_or_else(|| AppError::NotFound("No lead batch has been generated yet".to_string()))?;

    Ok(Json(BatchResponse {
        leads: current.batch.leads.clone(),
        selected_id: current.selected_id.clone(),
        generated_at: current.batch.generated_at,
    }))
}

/// PUT /api/v1/leads/selected/:id
///
/// Selects a lead from the current batch for detail display. Selecting a
/// different lead replaces the previous selection.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `id` - Id of the lead to select.
pub async fn select_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BatchResponse>, AppError> {
    tracing::info!("PUT /api/v1/leads/selected/{}", id);

    let mut slot = state
        .current
        .write()
        .map_err(|_| AppError::InternalError("batch state lock poisoned".to_string()))?;

    let current = slot
        .as_mut()
        .ok_or_else(|| AppError::NotFound("No lead batch has been generated yet".to_string()))?;

    if !current.batch.leads.iter().any(|lead| lead.id == id) {
        return Err(AppError::BadRequest(format!(
            "Lead '{}' is not part of the current batch",
            id
        )));
    }

    current.selected_id = Some(id);

    Ok(Json(BatchResponse {
        leads: current.batch.leads.clone(),
        selected_id: current.selected_id.clone(),
        generated_at: current.batch.generated_at,
    }))
}
