/// Upstream completion provider module
///
/// Each vendor returns a differently shaped JSON document; the adapters in
/// this module normalize those shapes at the boundary so the rest of the
/// service only ever sees plain completion text or a typed error. Vendor
/// quota exhaustion (HTTP 429) is mapped to [`SolverError::UpstreamQuota`]
/// so callers can distinguish "try again later" from a genuine failure.
pub mod gemini;
pub mod groq;
pub mod openai;

#[cfg(test)]
mod tests;

pub use gemini::GeminiProvider;
pub use groq::GroqProvider;
pub use openai::OpenAiProvider;

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::SolverResult;
use crate::types::ChatTurn;
use async_trait::async_trait;
use std::sync::Arc;

/// System instruction sent with every upstream request
pub const SYSTEM_INSTRUCTION: &str = "You are a meticulous mathematics \
assistant. Solve the given problem step by step, using clean LaTeX \
($$ x^2 $$) for math expressions. Be concise but thorough, and respond in \
the same language the user uses.";

/// Text-in, text-out contract every vendor adapter implements
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send a conversation to the vendor and return the completion text
    async fn complete(&self, turns: &[ChatTurn]) -> SolverResult<String>;

    /// Human-readable vendor name for logs
    fn name(&self) -> &'static str;
}

/// Build the configured provider adapter
pub fn build_provider(config: &ProviderConfig) -> SolverResult<Arc<dyn CompletionProvider>> {
    let provider: Arc<dyn CompletionProvider> = match config.kind {
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(config)?),
        ProviderKind::Groq => Arc::new(GroqProvider::new(config)?),
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config)?),
    };

    Ok(provider)
}

pub(crate) fn http_client(timeout_secs: u64) -> SolverResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| {
            crate::error::SolverError::ConfigError(format!("Failed to build HTTP client: {}", e))
        })
}
