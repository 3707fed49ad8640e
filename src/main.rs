use anyhow::{Context, Result};
use clap::Parser;
use moodify_server::catalog::HttpCatalogClient;
use moodify_server::config::{AppConfig, FileConfig, ProviderEntry, ProviderKind};
use moodify_server::llm::{LlmProvider, ModelRouter, OllamaProvider, OpenAiProvider};
use moodify_server::profile::ProfileBuilder;
use moodify_server::query::QueryAnalyzer;
use moodify_server::recommend::{DiscoveryRecommender, RecommendationEngine};
use moodify_server::server::{run_server, ServerState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML configuration file.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the catalog service. Overrides the config file.
    #[clap(long)]
    pub catalog_url: Option<String>,

    /// The port to listen on. Overrides the config file.
    #[clap(short, long)]
    pub port: Option<u16>,
}

fn build_provider(entry: &ProviderEntry) -> Arc<dyn LlmProvider> {
    match entry.kind {
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(&entry.base_url, &entry.model)),
        ProviderKind::Openai => match &entry.api_key_command {
            Some(command) => Arc::new(OpenAiProvider::with_key_command(
                &entry.base_url,
                &entry.model,
                command.clone(),
            )),
            None => Arc::new(OpenAiProvider::new(
                &entry.base_url,
                &entry.model,
                entry.api_key.clone(),
            )),
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let config = AppConfig::resolve(file_config, cli_args.catalog_url, cli_args.port)?;

    info!("Connecting to catalog at {}", config.catalog_url);
    let catalog = Arc::new(
        HttpCatalogClient::new(config.catalog_url.clone(), config.catalog_timeout)
            .context("Failed to build catalog client")?,
    );

    let providers: Vec<Arc<dyn LlmProvider>> =
        config.providers.iter().map(build_provider).collect();
    let provider_names: Vec<String> = providers
        .iter()
        .map(|p| format!("{} ({})", p.name(), p.model()))
        .collect();

    // Startup probe only; request-time selection is purely priority order
    for provider in &providers {
        match provider.health_check().await {
            Ok(()) => info!(provider = provider.name(), "Provider reachable"),
            Err(e) => warn!(provider = provider.name(), error = %e, "Provider unreachable"),
        }
    }

    let router = Arc::new(ModelRouter::new(providers, config.completion.clone()));
    let profiles = Arc::new(ProfileBuilder::new(catalog.clone(), config.profile.clone()));
    let discovery = DiscoveryRecommender::new(
        router.clone(),
        catalog.clone(),
        config.discovery.clone(),
    );
    let analyzer = QueryAnalyzer::with_router(router.clone());

    let engine = Arc::new(RecommendationEngine::new(
        analyzer,
        profiles,
        discovery,
        config.history.clone(),
        config.engine.clone(),
    ));

    let state = ServerState::new(engine, config.request_timeout, provider_names);
    run_server(state, config.port).await
}
