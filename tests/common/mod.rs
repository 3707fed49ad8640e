//! Common test infrastructure
//!
//! In-memory doubles for the two external collaborators (catalog service,
//! LLM providers) plus fixture builders, so the full recommendation flow
//! can be exercised without a network.

mod doubles;
mod fixtures;

pub use doubles::{StubCatalog, StubProvider};
pub use fixtures::{feats, history_track, search_track};

use moodify_server::catalog::{CatalogClient, CatalogCredential};
use moodify_server::llm::{CompletionOptions, LlmProvider, ModelRouter};
use moodify_server::profile::{ProfileBuilder, ProfileConfig};
use moodify_server::query::QueryAnalyzer;
use moodify_server::recommend::{
    DiscoveryConfig, DiscoveryRecommender, EngineConfig, HistoryConfig, RecommendationEngine,
};
use std::sync::Arc;

pub fn credential() -> CatalogCredential {
    CatalogCredential {
        user_id: "user-1".to_string(),
        access_token: "test-token".to_string(),
    }
}

/// Wire a full engine from doubles with default tunables.
pub fn build_engine(catalog: Arc<StubCatalog>, providers: Vec<Arc<StubProvider>>) -> RecommendationEngine {
    let catalog_client = catalog as Arc<dyn CatalogClient>;
    let router = Arc::new(ModelRouter::new(
        providers
            .into_iter()
            .map(|p| p as Arc<dyn LlmProvider>)
            .collect(),
        CompletionOptions::default(),
    ));
    let profiles = Arc::new(ProfileBuilder::new(
        catalog_client.clone(),
        ProfileConfig::default(),
    ));
    let discovery = DiscoveryRecommender::new(
        router,
        catalog_client,
        DiscoveryConfig::default(),
    );

    RecommendationEngine::new(
        QueryAnalyzer::new(),
        profiles,
        discovery,
        HistoryConfig::default(),
        EngineConfig::default(),
    )
}
