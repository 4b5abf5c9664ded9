use crate::config::ProviderConfig;
use crate::error::{SolverError, SolverResult};
use crate::provider::{CompletionProvider, SYSTEM_INSTRUCTION};
use crate::types::{ChatTurn, Role};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Shared client for the OpenAI chat-completions wire format.
///
/// Groq exposes the same request/response shape under a different base URL,
/// so both adapters delegate here and only differ in defaults and naming.
pub(crate) struct ChatCompletionsClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    vendor: &'static str,
}

#[derive(Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<Message>,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
pub(crate) struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<Message>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl ChatCompletionsClient {
    pub(crate) fn new(
        config: &ProviderConfig,
        default_base_url: &str,
        vendor: &'static str,
    ) -> SolverResult<Self> {
        Ok(ChatCompletionsClient {
            client: crate::provider::http_client(config.request_timeout_secs)?,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url.to_string()),
            vendor,
        })
    }

    fn vendor_role(role: Role) -> &'static str {
        match role {
            Role::User => "user",
            Role::Model => "assistant",
        }
    }

    /// Extract the completion text from the vendor response shape
    pub(crate) fn extract_text(response: ChatCompletionsResponse) -> SolverResult<String> {
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .map(|message| message.content)
            .filter(|text| !text.is_empty())
            .ok_or(SolverError::EmptyCompletion)
    }

    pub(crate) async fn complete(&self, turns: &[ChatTurn]) -> SolverResult<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut messages = vec![Message {
            role: "system".to_string(),
            content: SYSTEM_INSTRUCTION.to_string(),
        }];
        messages.extend(turns.iter().map(|turn| Message {
            role: Self::vendor_role(turn.role).to_string(),
            content: turn.text.clone(),
        }));

        let body = ChatCompletionsRequest {
            model: self.model.clone(),
            messages,
        };

        debug!(
            "Calling {} model {} ({} turns)",
            self.vendor,
            self.model,
            turns.len()
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                SolverError::UpstreamError(format!("{} request failed: {}", self.vendor, e))
            })?;

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
                "{} API error ({}): {}",
                self.vendor, status, detail
            )));
        }

        let parsed: ChatCompletionsResponse = response.json().await.map_err(|e| {
            SolverError::UpstreamError(format!("Invalid {} response: {}", self.vendor, e))
        })?;

        Self::extract_text(parsed)
    }
}

/// Adapter for the OpenAI chat-completions API
pub struct OpenAiProvider {
    inner: ChatCompletionsClient,
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig) -> SolverResult<Self> {
        Ok(OpenAiProvider {
            inner: ChatCompletionsClient::new(config, DEFAULT_BASE_URL, "openai")?,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, turns: &[ChatTurn]) -> SolverResult<String> {
        self.inner.complete(turns).await
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_from_vendor_shape() {
        let raw = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "The answer is 1."}}
            ]
        }"#;
        let parsed: ChatCompletionsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            ChatCompletionsClient::extract_text(parsed).unwrap(),
            "The answer is 1."
        );
    }

    #[test]
    fn test_extract_text_empty_choices() {
        let parsed: ChatCompletionsResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            ChatCompletionsClient::extract_text(parsed),
            Err(SolverError::EmptyCompletion)
        ));
    }

    #[test]
    fn test_vendor_role_mapping() {
        assert_eq!(ChatCompletionsClient::vendor_role(Role::User), "user");
        assert_eq!(ChatCompletionsClient::vendor_role(Role::Model), "assistant");
    }
}
