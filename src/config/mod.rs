//! Configuration: CLI flags merged over an optional TOML file.
//!
//! Empirically tuned values (scoring weights, noise denylist, popularity
//! floor, thresholds) are deliberately configuration, not constants.

mod file_config;

pub use file_config::{
    DiscoverySection, FileConfig, GenerationConfig, ProfileSection, ProviderEntry, ProviderKind,
    ScoringSection,
};

use crate::llm::CompletionOptions;
use crate::profile::ProfileConfig;
use crate::recommend::{DiscoveryConfig, EngineConfig, HistoryConfig};
use anyhow::{bail, Result};
use std::time::Duration;

/// Fully resolved application configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub port: u16,
    pub catalog_url: String,
    pub catalog_timeout: Duration,
    pub request_timeout: Duration,
    pub providers: Vec<ProviderEntry>,
    pub completion: CompletionOptions,
    pub profile: ProfileConfig,
    pub history: HistoryConfig,
    pub discovery: DiscoveryConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Merge CLI-provided values over the file config, filling defaults.
    ///
    /// CLI wins over file; the catalog URL is required from one of them.
    pub fn resolve(
        file: FileConfig,
        cli_catalog_url: Option<String>,
        cli_port: Option<u16>,
    ) -> Result<Self> {
        let Some(catalog_url) = cli_catalog_url.or(file.catalog_url) else {
            bail!("catalog URL is required (--catalog-url or catalog_url in the config file)");
        };

        let providers = file.providers.unwrap_or_else(|| {
            // Bare setups get a local Ollama, the original default
            vec![ProviderEntry {
                kind: ProviderKind::Ollama,
                base_url: "http://localhost:11434".to_string(),
                model: "llama3.1:8b".to_string(),
                api_key: None,
                api_key_command: None,
            }]
        });

        let generation = file.generation.unwrap_or_default();
        let completion = CompletionOptions {
            temperature: generation.temperature.unwrap_or(0.3),
            max_tokens: Some(generation.max_tokens.unwrap_or(800)),
            timeout: Duration::from_secs(generation.attempt_timeout_sec.unwrap_or(20)),
        };

        let profile_section = file.profile.unwrap_or_default();
        let profile_defaults = ProfileConfig::default();
        let profile = ProfileConfig {
            sample_size: profile_section
                .sample_size
                .unwrap_or(profile_defaults.sample_size),
            top_genres: profile_section
                .top_genres
                .unwrap_or(profile_defaults.top_genres),
            cache_ttl: profile_section
                .cache_ttl_sec
                .map(Duration::from_secs)
                .unwrap_or(profile_defaults.cache_ttl),
        };

        let scoring = file.scoring.unwrap_or_default();
        let history_defaults = HistoryConfig::default();
        let history = HistoryConfig {
            query_weight: scoring
                .query_weight
                .unwrap_or(history_defaults.query_weight),
            profile_weight: scoring
                .profile_weight
                .unwrap_or(history_defaults.profile_weight),
            lane_cap: scoring.lane_cap.unwrap_or(history_defaults.lane_cap),
            featureless_cap: scoring
                .featureless_cap
                .unwrap_or(history_defaults.featureless_cap),
        };

        let discovery_section = file.discovery.unwrap_or_default();
        let discovery_defaults = DiscoveryConfig::default();
        let discovery = DiscoveryConfig {
            candidate_count: discovery_section
                .candidate_count
                .unwrap_or(discovery_defaults.candidate_count),
            lane_cap: discovery_section
                .lane_cap
                .unwrap_or(discovery_defaults.lane_cap),
            search_limit: discovery_section
                .search_limit
                .unwrap_or(discovery_defaults.search_limit),
            name_match_threshold: discovery_section
                .name_match_threshold
                .unwrap_or(discovery_defaults.name_match_threshold),
            popularity_floor: discovery_section
                .popularity_floor
                .unwrap_or(discovery_defaults.popularity_floor),
            denylist: discovery_section
                .denylist
                .unwrap_or(discovery_defaults.denylist),
        };

        let engine_defaults = EngineConfig::default();
        let engine = EngineConfig {
            profile_timeout: profile_section
                .fetch_timeout_sec
                .map(Duration::from_secs)
                .unwrap_or(engine_defaults.profile_timeout),
            discovery_timeout: discovery_section
                .timeout_sec
                .map(Duration::from_secs)
                .unwrap_or(engine_defaults.discovery_timeout),
        };

        Ok(Self {
            port: cli_port.or(file.port).unwrap_or(3001),
            catalog_url,
            catalog_timeout: Duration::from_secs(file.catalog_timeout_sec.unwrap_or(15)),
            request_timeout: Duration::from_secs(file.request_timeout_sec.unwrap_or(60)),
            providers,
            completion,
            profile,
            history,
            discovery,
            engine,
        })
    }
}
