use crate::config::ProviderConfig;
use crate::error::{SolverError, SolverResult};
use crate::provider::{CompletionProvider, SYSTEM_INSTRUCTION};
use crate::types::{ChatTurn, Role};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Adapter for the Google Gemini generateContent API
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GeminiProvider {
    pub fn new(config: &ProviderConfig) -> SolverResult<Self> {
        Ok(GeminiProvider {
            client: crate::provider::http_client(config.request_timeout_secs)?,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    fn vendor_role(role: Role) -> &'static str {
        match role {
            Role::User => "user",
            Role::Model => "model",
        }
    }

    /// Extract the completion text from the vendor response shape. The rest
    /// of the service never touches candidate/part field paths.
    fn extract_text(response: GenerateContentResponse) -> SolverResult<String> {
        response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .map(|part| part.text)
            .filter(|text| !text.is_empty())
            .ok_or(SolverError::EmptyCompletion)
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    async fn complete(&self, turns: &[ChatTurn]) -> SolverResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let body = GenerateContentRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            contents: turns
                .iter()
                .map(|turn| Content {
                    role: Some(Self::vendor_role(turn.role).to_string()),
                    parts: vec![Part {
                        text: turn.text.clone(),
                    }],
                })
                .collect(),
        };

        debug!("Calling Gemini model {} ({} turns)", self.model, turns.len());

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SolverError::UpstreamError(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SolverError::UpstreamQuota);
        }

        if !status.is_success() {
            let detail = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .map(|error| error.message)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(SolverError::UpstreamError(format!(
                "Gemini API error ({}): {}",
                status, detail
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| SolverError::UpstreamError(format!("Invalid Gemini response: {}", e)))?;

        Self::extract_text(parsed)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
