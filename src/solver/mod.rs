#[cfg(test)]
mod tests;

use crate::cache::{derive_key, CacheManager};
use crate::error::SolverResult;
use crate::normalizer::Normalizer;
use crate::provider::CompletionProvider;
use crate::types::{CacheEntry, ChatResponse, ChatTurn, ResponseSource, SolveResponse};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Main solver service coordinating normalization, cache and provider.
///
/// Handles one request end to end: normalize the expression, consult the
/// solution cache, call the upstream provider on a miss, and write the fresh
/// result back without blocking the response. Two requests racing on the
/// same key may both reach the provider; the second cache write is a benign
/// no-op, not an error.
pub struct SolverService {
    normalizer: Normalizer,
    provider: Arc<dyn CompletionProvider>,
    /// Absent when Redis was unavailable at startup; the service then runs
    /// with caching disabled and every request goes upstream
    cache: Option<Arc<CacheManager>>,
}

impl SolverService {
    pub fn new(
        normalizer: Normalizer,
        provider: Arc<dyn CompletionProvider>,
        cache: Option<Arc<CacheManager>>,
    ) -> Self {
        SolverService {
            normalizer,
            provider,
            cache,
        }
    }

    pub fn caching_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Solve a math expression, serving from cache when possible.
    ///
    /// The cache read always completes (or is skipped entirely) before the
    /// upstream call is issued. A cache read failure downgrades to a miss;
    /// it never fails the request.
    pub async fn solve(&self, prompt: &str) -> SolverResult<SolveResponse> {
        let normalized = self.normalizer.normalize(prompt);
        let cache_key = derive_key(&normalized);

        info!(
            "Solving expression (normalized: '{}', policy: {:?})",
            normalized,
            self.normalizer.policy()
        );

        if let Some(cache) = &self.cache {
            match cache.get_entry(&cache_key).await {
                Ok(Some(entry)) => {
                    info!("Cache hit for normalized expression '{}'", normalized);
                    return Ok(SolveResponse {
                        text: entry.result_text,
                        source: ResponseSource::Cache,
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Cache read failed, falling through to provider: {}", e);
                }
            }
        }

        info!(
            "Cache miss, calling {} provider for '{}'",
            self.provider.name(),
            normalized
        );

        let payload = format!("Solve this math problem in detail: {}", normalized);
        let result_text = self.provider.complete(&[ChatTurn::user(payload)]).await?;

        if let Some(cache) = &self.cache {
            let cache = cache.clone();
            let entry = CacheEntry {
                result_text: result_text.clone(),
                created_at: Utc::now(),
            };

            // Fire-and-forget: the response must not wait on, or fail with,
            // the cache write. A racing write for the same key loses silently.
            tokio::spawn(async move {
                match cache.put_entry_if_absent(&cache_key, &entry).await {
                    Ok(true) => info!("Cached solution for key {}", cache_key),
                    Ok(false) => {
                        info!("Cache write ignored, key {} already present", cache_key)
                    }
                    Err(e) => error!("Cache write failed: {}", e),
                }
            });
        }

        Ok(SolveResponse {
            text: result_text,
            source: ResponseSource::Api,
        })
    }

    /// Forward a chat conversation to the provider.
    ///
    /// Chat turns are conversational, not canonical expressions, so they are
    /// neither normalized nor cached.
    pub async fn chat(&self, message: &str, history: &[ChatTurn]) -> SolverResult<ChatResponse> {
        let mut turns = history.to_vec();
        turns.push(ChatTurn::user(message));

        let text = self.provider.complete(&turns).await?;

        Ok(ChatResponse { text })
    }

    /// Check cache connectivity; trivially healthy when caching is disabled
    pub async fn health_check(&self) -> SolverResult<()> {
        match &self.cache {
            Some(cache) => cache.health_check().await,
            None => Ok(()),
        }
    }
}
