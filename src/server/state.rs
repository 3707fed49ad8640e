use crate::recommend::RecommendationEngine;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<RecommendationEngine>,
    pub start_time: Instant,
    /// Overall request deadline; lanes degrade under their own deadlines
    /// well before this backstop fires.
    pub request_timeout: Duration,
    /// Configured provider names, reported by /health.
    pub providers: Vec<String>,
}

impl ServerState {
    pub fn new(
        engine: Arc<RecommendationEngine>,
        request_timeout: Duration,
        providers: Vec<String>,
    ) -> Self {
        Self {
            engine,
            start_time: Instant::now(),
            request_timeout,
            providers,
        }
    }
}
