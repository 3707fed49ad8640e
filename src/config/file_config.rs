use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub port: Option<u16>,
    pub catalog_url: Option<String>,
    pub catalog_timeout_sec: Option<u64>,
    pub request_timeout_sec: Option<u64>,
    pub logging_level: Option<String>,

    /// Ordered provider list; configuration order is priority order.
    pub providers: Option<Vec<ProviderEntry>>,

    // Feature configs
    pub generation: Option<GenerationConfig>,
    pub profile: Option<ProfileSection>,
    pub scoring: Option<ScoringSection>,
    pub discovery: Option<DiscoverySection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderEntry {
    pub kind: ProviderKind,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Shell command that outputs the API key, for rotating tokens.
    pub api_key_command: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    Openai,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub attempt_timeout_sec: Option<u64>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ProfileSection {
    pub sample_size: Option<usize>,
    pub top_genres: Option<usize>,
    pub cache_ttl_sec: Option<u64>,
    pub fetch_timeout_sec: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ScoringSection {
    pub query_weight: Option<f64>,
    pub profile_weight: Option<f64>,
    pub lane_cap: Option<usize>,
    pub featureless_cap: Option<f64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct DiscoverySection {
    pub candidate_count: Option<usize>,
    pub lane_cap: Option<usize>,
    pub search_limit: Option<usize>,
    pub name_match_threshold: Option<f64>,
    pub popularity_floor: Option<u8>,
    pub denylist: Option<Vec<String>>,
    pub timeout_sec: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
