use crate::config::ProviderConfig;
use crate::error::SolverResult;
use crate::provider::openai::ChatCompletionsClient;
use crate::provider::CompletionProvider;
use crate::types::ChatTurn;
use async_trait::async_trait;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Adapter for the Groq API (OpenAI-compatible chat-completions shape)
pub struct GroqProvider {
    inner: ChatCompletionsClient,
}

impl GroqProvider {
    pub fn new(config: &ProviderConfig) -> SolverResult<Self> {
        Ok(GroqProvider {
            inner: ChatCompletionsClient::new(config, DEFAULT_BASE_URL, "groq")?,
        })
    }
}

#[async_trait]
impl CompletionProvider for GroqProvider {
    async fn complete(&self, turns: &[ChatTurn]) -> SolverResult<String> {
        self.inner.complete(turns).await
    }

    fn name(&self) -> &'static str {
        "groq"
    }
}
