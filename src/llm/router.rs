//! Provider routing with ordered failover.
//!
//! The router owns an ordered list of interchangeable providers and presents
//! a single generation contract. Failures are classified before deciding the
//! next step: pure network failures get one same-provider retry, everything
//! else advances to the next provider immediately. Model output is only
//! accepted after it deserializes into the caller's expected shape.

use super::provider::{CompletionOptions, LlmError, LlmProvider};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// A successful generation, with the provider that produced it.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub provider: String,
    pub model: String,
}

/// Outcome of one failed provider attempt, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    pub provider: String,
    pub error: String,
}

/// Errors that can occur when routing a generation request.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("No providers configured")]
    NoProviders,

    #[error("All providers exhausted after {} failed attempts", attempts.len())]
    AllProvidersExhausted { attempts: Vec<ProviderAttempt> },
}

/// Routes generation requests across an ordered list of providers.
pub struct ModelRouter {
    providers: Vec<Arc<dyn LlmProvider>>,
    options: CompletionOptions,
}

impl ModelRouter {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>, options: CompletionOptions) -> Self {
        Self { providers, options }
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Generate raw text from the first provider that succeeds.
    pub async fn generate(&self, prompt: &str) -> Result<Generation, RouterError> {
        if self.providers.is_empty() {
            return Err(RouterError::NoProviders);
        }

        let mut attempts = Vec::new();
        for provider in &self.providers {
            match self.attempt(provider.as_ref(), prompt).await {
                Ok(text) => {
                    return Ok(Generation {
                        text,
                        provider: provider.name().to_string(),
                        model: provider.model().to_string(),
                    })
                }
                Err(e) => attempts.push(ProviderAttempt {
                    provider: provider.name().to_string(),
                    error: e.to_string(),
                }),
            }
        }

        Err(RouterError::AllProvidersExhausted { attempts })
    }

    /// Generate output and validate it against the expected JSON shape.
    ///
    /// Output that fails to parse into `T` counts as a provider failure and
    /// advances to the next provider rather than being propagated raw.
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
    ) -> Result<(T, Generation), RouterError> {
        if self.providers.is_empty() {
            return Err(RouterError::NoProviders);
        }

        let mut attempts = Vec::new();
        for provider in &self.providers {
            let text = match self.attempt(provider.as_ref(), prompt).await {
                Ok(text) => text,
                Err(e) => {
                    attempts.push(ProviderAttempt {
                        provider: provider.name().to_string(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            match extract_json::<T>(&text) {
                Ok(value) => {
                    let generation = Generation {
                        text,
                        provider: provider.name().to_string(),
                        model: provider.model().to_string(),
                    };
                    return Ok((value, generation));
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        error = %e,
                        "Provider output failed schema validation"
                    );
                    attempts.push(ProviderAttempt {
                        provider: provider.name().to_string(),
                        error: format!("schema validation failed: {}", e),
                    });
                }
            }
        }

        Err(RouterError::AllProvidersExhausted { attempts })
    }

    /// One provider attempt, with a single retry for transient failures.
    async fn attempt(&self, provider: &dyn LlmProvider, prompt: &str) -> Result<String, LlmError> {
        match provider.complete(prompt, &self.options).await {
            Ok(text) => Ok(text),
            Err(e) if e.is_transient() => {
                warn!(
                    provider = provider.name(),
                    error = %e,
                    "Transient provider failure, retrying once"
                );
                provider.complete(prompt, &self.options).await
            }
            Err(e) => {
                debug!(provider = provider.name(), error = %e, "Provider failed");
                Err(e)
            }
        }
    }
}

/// Extract the first JSON value from model output and deserialize it.
///
/// Models routinely wrap JSON in markdown fences or prose; strip the fences
/// and locate the outermost array/object before parsing.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();

    let start = cleaned
        .find(['[', '{'])
        .ok_or_else(|| "no JSON value in output".to_string())?;
    let close = if cleaned.as_bytes()[start] == b'[' {
        ']'
    } else {
        '}'
    };
    let end = cleaned
        .rfind(close)
        .filter(|&end| end > start)
        .ok_or_else(|| "unterminated JSON value in output".to_string())?;

    serde_json::from_str(&cleaned[start..=end]).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Provider double that replays a scripted sequence of outcomes.
    struct ScriptedProvider {
        name: String,
        script: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(name: &str, script: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _prompt: &str,
            _options: &CompletionOptions,
        ) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Connection("script exhausted".to_string())))
        }

        async fn health_check(&self) -> Result<(), LlmError> {
            Ok(())
        }
    }

    fn router(providers: Vec<Arc<ScriptedProvider>>) -> ModelRouter {
        ModelRouter::new(
            providers
                .into_iter()
                .map(|p| p as Arc<dyn LlmProvider>)
                .collect(),
            CompletionOptions::default(),
        )
    }

    // ==========================================================================
    // Failover tests
    // ==========================================================================

    #[tokio::test]
    async fn test_first_provider_success() {
        let first = ScriptedProvider::new("first", vec![Ok("hello".to_string())]);
        let second = ScriptedProvider::new("second", vec![Ok("unused".to_string())]);
        let r = router(vec![first.clone(), second.clone()]);

        let generation = r.generate("prompt").await.unwrap();
        assert_eq!(generation.text, "hello");
        assert_eq!(generation.provider, "first");
        assert_eq!(second.call_count(), 0);
    }

    #[tokio::test]
    async fn test_advances_on_api_error_without_retry() {
        let first = ScriptedProvider::new(
            "first",
            vec![Err(LlmError::Api {
                status: 500,
                message: "boom".to_string(),
            })],
        );
        let second = ScriptedProvider::new("second", vec![Ok("fallback".to_string())]);
        let r = router(vec![first.clone(), second.clone()]);

        let generation = r.generate("prompt").await.unwrap();
        assert_eq!(generation.provider, "second");
        // API errors are permanent: no same-provider retry
        assert_eq!(first.call_count(), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_failure_once() {
        let flaky = ScriptedProvider::new(
            "flaky",
            vec![
                Err(LlmError::Connection("reset".to_string())),
                Ok("recovered".to_string()),
            ],
        );
        let r = router(vec![flaky.clone()]);

        let generation = r.generate("prompt").await.unwrap();
        assert_eq!(generation.text, "recovered");
        assert_eq!(flaky.call_count(), 2);
    }

    #[tokio::test]
    async fn test_rate_limited_advances_immediately() {
        let limited = ScriptedProvider::new("limited", vec![Err(LlmError::RateLimited)]);
        let second = ScriptedProvider::new("second", vec![Ok("ok".to_string())]);
        let r = router(vec![limited.clone(), second]);

        let generation = r.generate("prompt").await.unwrap();
        assert_eq!(generation.provider, "second");
        assert_eq!(limited.call_count(), 1);
    }

    #[tokio::test]
    async fn test_all_providers_exhausted() {
        let first = ScriptedProvider::new("first", vec![Err(LlmError::RateLimited)]);
        let second = ScriptedProvider::new(
            "second",
            vec![Err(LlmError::Api {
                status: 503,
                message: "down".to_string(),
            })],
        );
        let r = router(vec![first, second]);

        let err = r.generate("prompt").await.unwrap_err();
        match err {
            RouterError::AllProvidersExhausted { attempts } => {
                assert_eq!(attempts.len(), 2);
                assert_eq!(attempts[0].provider, "first");
                assert_eq!(attempts[1].provider, "second");
            }
            other => panic!("Expected exhaustion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_providers() {
        let r = ModelRouter::new(vec![], CompletionOptions::default());
        assert!(matches!(
            r.generate("prompt").await,
            Err(RouterError::NoProviders)
        ));
    }

    // ==========================================================================
    // Schema validation tests
    // ==========================================================================

    #[tokio::test]
    async fn test_invalid_json_advances_to_next_provider() {
        let bad = ScriptedProvider::new("bad", vec![Ok("not json at all".to_string())]);
        let good = ScriptedProvider::new("good", vec![Ok(r#"["a","b"]"#.to_string())]);
        let r = router(vec![bad, good]);

        let (value, generation) = r.generate_json::<Vec<String>>("prompt").await.unwrap();
        assert_eq!(value, vec!["a", "b"]);
        assert_eq!(generation.provider, "good");
    }

    #[tokio::test]
    async fn test_wrong_shape_counts_as_failure() {
        // Valid JSON but not the expected shape
        let bad = ScriptedProvider::new("bad", vec![Ok(r#"{"foo": 1}"#.to_string())]);
        let r = router(vec![bad]);

        let err = r.generate_json::<Vec<String>>("prompt").await.unwrap_err();
        match err {
            RouterError::AllProvidersExhausted { attempts } => {
                assert!(attempts[0].error.contains("schema validation failed"));
            }
            other => panic!("Expected exhaustion, got {:?}", other),
        }
    }

    // ==========================================================================
    // JSON extraction tests
    // ==========================================================================

    #[test]
    fn test_extract_json_plain() {
        let value: Vec<String> = extract_json(r#"["x","y"]"#).unwrap();
        assert_eq!(value, vec!["x", "y"]);
    }

    #[test]
    fn test_extract_json_fenced() {
        let text = "Here you go:\n```json\n[\"x\"]\n```\nEnjoy!";
        let value: Vec<String> = extract_json(text).unwrap();
        assert_eq!(value, vec!["x"]);
    }

    #[test]
    fn test_extract_json_object_with_prose() {
        let text = "Sure! {\"genres\": [\"rock\"]} hope that helps";
        let value: serde_json::Value = extract_json(text).unwrap();
        assert_eq!(value["genres"][0], "rock");
    }

    #[test]
    fn test_extract_json_no_value() {
        let result: Result<serde_json::Value, _> = extract_json("nothing here");
        assert!(result.is_err());
    }
}
