use crate::errors::AppError;
use crate::models::Source;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Client for the Gemini `generateContent` API.
///
/// The base URL is injectable so tests can point it at a mock server.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

/// Raw outcome of one `generateContent` call: the text of the first candidate
/// plus any web grounding citations the model attached.
#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub text: String,
    pub sources: Vec<Source>,
}

// ---- Wire models (only the fields we consume) ----

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl GeminiClient {
    /// Creates a new `GeminiClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the Gemini API (no trailing slash).
    /// * `api_key` - API key for authentication.
    /// * `model` - Model identifier to call.
    pub fn new(base_url: String, api_key: String, model: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create Gemini client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model,
        })
    }

    /// Runs one search-grounded `generateContent` call with a requested JSON
    /// output schema.
    ///
    /// # Arguments
    ///
    /// * `prompt` - The constructed instruction text.
    /// * `response_schema` - JSON schema the model is asked to conform to.
    ///
    /// # Returns
    ///
    /// * `Result<GenerateOutcome, AppError>` - First candidate text plus any
    ///   grounding sources.
    pub async fn generate(
        &self,
        prompt: &str,
        response_schema: &Value,
    ) -> Result<GenerateOutcome, AppError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        tracing::info!("Calling Gemini model {}", self.model);

        let body = json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema,
            },
            "tools": [{ "googleSearch": {} }]
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Gemini returned {}: {}",
                status, error_text
            )));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Gemini response: {}", e))
        })?;

        let candidate = parsed.candidates.into_iter().next().ok_or_else(|| {
            AppError::UpstreamFormat("Gemini response contained no candidates".to_string())
        })?;

        let sources: Vec<Source> = candidate
            .grounding_metadata
            .map(|m| {
                m.grounding_chunks
                    .into_iter()
                    .filter_map(|chunk| chunk.web)
                    .filter_map(|web| {
                        let uri = web.uri?;
                        // Fall back to the URI when no title is given
                        let title = web.title.unwrap_or_else(|| uri.clone());
                        Some(Source { uri, title })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        tracing::debug!(
            "Gemini response: {} chars of text, {} grounding source(s)",
            text.len(),
            sources.len()
        );

        Ok(GenerateOutcome { text, sources })
    }
}
