use super::*;
use crate::config::{ProviderConfig, ProviderKind};

fn test_provider_config(kind: ProviderKind) -> ProviderConfig {
    ProviderConfig {
        kind,
        api_key: "test-key".to_string(),
        model: kind.default_model().to_string(),
        base_url: None,
        request_timeout_secs: 5,
    }
}

#[test]
fn test_build_provider_selects_adapter() {
    let gemini = build_provider(&test_provider_config(ProviderKind::Gemini)).unwrap();
    assert_eq!(gemini.name(), "gemini");

    let groq = build_provider(&test_provider_config(ProviderKind::Groq)).unwrap();
    assert_eq!(groq.name(), "groq");

    let openai = build_provider(&test_provider_config(ProviderKind::OpenAi)).unwrap();
    assert_eq!(openai.name(), "openai");
}

#[test]
fn test_system_instruction_is_nonempty() {
    assert!(!SYSTEM_INSTRUCTION.is_empty());
    assert!(SYSTEM_INSTRUCTION.contains("LaTeX"));
}

#[tokio::test]
async fn test_unreachable_provider_surfaces_upstream_error() {
    let config = ProviderConfig {
        kind: ProviderKind::Gemini,
        api_key: "test-key".to_string(),
        model: "test-model".to_string(),
        // Reserved TEST-NET address, nothing listens there
        base_url: Some("http://192.0.2.1:1".to_string()),
        request_timeout_secs: 1,
    };

    let provider = build_provider(&config).unwrap();
    let result = provider
        .complete(&[crate::types::ChatTurn::user("1+1")])
        .await;

    match result {
        Err(crate::error::SolverError::UpstreamError(_)) => {}
        other => panic!("expected UpstreamError, got {:?}", other.map(|_| ())),
    }
}
