use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request body for the solve endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveRequest {
    /// Raw math expression as submitted by the user
    pub prompt: String,
}

/// Request body for the chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Latest user message
    pub message: String,
    /// Prior conversation turns, oldest first
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

/// One turn of a conversation with the upstream provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        ChatTurn {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        ChatTurn {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Conversation role, mapped to vendor-specific role names by each adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// Where a solve response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Api,
}

/// Response body for the solve endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveResponse {
    /// Solution text produced by the provider (or replayed from cache)
    pub text: String,
    /// Whether the result was served from cache or a fresh upstream call
    pub source: ResponseSource,
}

/// Response body for the chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub text: String,
}

/// Immutable cached solution, written once on first successful upstream call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Solution text as returned by the provider
    pub result_text: String,
    /// Write timestamp
    pub created_at: DateTime<Utc>,
}

/// Per-day visitor statistics as reported by the stats endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyVisitorStats {
    /// Calendar day in YYYY-MM-DD (UTC)
    pub date: String,
    /// Number of distinct caller IPs seen that day
    pub unique_users_count: u64,
    /// Truncated sample of the last observed user agent
    pub sample_device: String,
}

/// Response body for the daily-stats endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStatsResponse {
    pub message: String,
    pub stats: Vec<DailyVisitorStats>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Model).unwrap(), "\"model\"");
    }

    #[test]
    fn test_response_source_serialization() {
        let resp = SolveResponse {
            text: "42".to_string(),
            source: ResponseSource::Cache,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"source\":\"cache\""));
    }

    #[test]
    fn test_chat_request_default_history() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert!(req.history.is_empty());
    }
}
