/// Input normalization module
///
/// Rewrites messy user-submitted math expressions into a canonical ASCII form
/// so that cosmetic variants of the same expression share one cache entry:
/// - Case folding and whitespace stripping
/// - Unicode superscript digit folding
/// - Implicit exponent insertion (`sin12x` -> `sin^12x`)
/// - Power-of-function consolidation (`(sinx)^2` -> `sin^2x`)
/// - Algebraic identities applied as text rewrites (`a/a` -> `1`)
///
/// The transform is a heuristic, not a symbolic-math engine: it is a total,
/// deterministic string function with no parsing and no correctness guarantee
/// for the rewritten expression.
mod rules;


use crate::config::NormalizationPolicy;

/// Stateless normalizer bound to one deployment-wide policy.
///
/// Safe to share across tasks; normalization does no I/O and holds no
/// mutable state.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    policy: NormalizationPolicy,
}

impl Normalizer {
    pub fn new(policy: NormalizationPolicy) -> Self {
        Normalizer { policy }
    }

    pub fn policy(&self) -> NormalizationPolicy {
        self.policy
    }

    /// Normalize a raw expression according to the configured policy.
    pub fn normalize(&self, raw: &str) -> String {
        normalize(raw, self.policy)
    }
}

/// Normalize a raw expression under an explicit policy.
///
/// Total over all inputs: empty input yields an empty string, and no input
/// can make this fail.
pub fn normalize(raw: &str, policy: NormalizationPolicy) -> String {
    if raw.is_empty() {
        return String::new();
    }

    match policy {
        NormalizationPolicy::Raw => raw.to_string(),
        NormalizationPolicy::Minimal => raw.to_lowercase().trim().to_string(),
        NormalizationPolicy::Full => rules::apply_pipeline(raw),
    }
}

/// Names of the full-policy rewrite rules, in application order.
pub fn rule_names() -> Vec<&'static str> {
    rules::PIPELINE.iter().map(|rule| rule.name).collect()
}
