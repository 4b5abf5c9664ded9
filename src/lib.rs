pub mod cache;
pub mod config;
pub mod error;
pub mod normalizer;
pub mod provider;
pub mod server;
pub mod solver;
pub mod types;
pub mod visitors;

pub use cache::{derive_key, CacheManager, RedisClient};
pub use config::{Config, NormalizationPolicy, ProviderKind};
pub use error::{SolverError, SolverResult};
pub use normalizer::{normalize, Normalizer};
pub use provider::{CompletionProvider, GeminiProvider, GroqProvider, OpenAiProvider};
pub use server::SolverServer;
pub use solver::SolverService;
pub use types::*;
pub use visitors::VisitorLog;
