//! Language model providers and routing.

mod ollama;
mod openai;
mod provider;
mod router;

pub use ollama::OllamaProvider;
pub use openai::{ApiKeySource, OpenAiProvider};
pub use provider::{CompletionOptions, LlmError, LlmProvider};
pub use router::{Generation, ModelRouter, ProviderAttempt, RouterError};
