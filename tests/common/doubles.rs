//! In-memory doubles for the catalog service and LLM providers.

use async_trait::async_trait;
use moodify_server::catalog::{
    AudioFeatures, CatalogClient, CatalogCredential, CatalogError, TimeWindow, Track,
};
use moodify_server::llm::{CompletionOptions, LlmError, LlmProvider};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Catalog double: serves a fixed user library and search index, counts
/// every call, and can simulate a full outage.
pub struct StubCatalog {
    /// The user's listening history, returned by top_tracks.
    history: Vec<Track>,
    /// Genre tags per artist name.
    genres: HashMap<String, Vec<String>>,
    /// Search results returned when the key appears in the query
    /// (case-insensitive).
    search_index: HashMap<String, Vec<Track>>,
    /// When true, every call fails with a 500.
    unavailable: bool,
    pub calls: CallCounters,
}

#[derive(Default)]
pub struct CallCounters {
    pub top_tracks: AtomicUsize,
    pub recently_played: AtomicUsize,
    pub search: AtomicUsize,
    pub audio_features: AtomicUsize,
    pub artist_genres: AtomicUsize,
}

impl CallCounters {
    pub fn total(&self) -> usize {
        self.top_tracks.load(Ordering::SeqCst)
            + self.recently_played.load(Ordering::SeqCst)
            + self.search.load(Ordering::SeqCst)
            + self.audio_features.load(Ordering::SeqCst)
            + self.artist_genres.load(Ordering::SeqCst)
    }
}

impl StubCatalog {
    pub fn new(
        history: Vec<Track>,
        genres: HashMap<String, Vec<String>>,
        search_index: HashMap<String, Vec<Track>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            history,
            genres,
            search_index,
            unavailable: false,
            calls: CallCounters::default(),
        })
    }

    /// A catalog where every call returns a 500.
    pub fn down() -> Arc<Self> {
        Arc::new(Self {
            history: Vec::new(),
            genres: HashMap::new(),
            search_index: HashMap::new(),
            unavailable: true,
            calls: CallCounters::default(),
        })
    }

    fn outage() -> CatalogError {
        CatalogError::Api {
            status: 500,
            message: "internal error".to_string(),
        }
    }
}

#[async_trait]
impl CatalogClient for StubCatalog {
    async fn search_tracks(
        &self,
        _credential: &CatalogCredential,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Track>, CatalogError> {
        self.calls.search.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(Self::outage());
        }
        let query = query.to_lowercase();
        let mut hits: Vec<Track> = self
            .search_index
            .iter()
            .filter(|(key, _)| query.contains(key.as_str()))
            .flat_map(|(_, tracks)| tracks.clone())
            .collect();
        hits.truncate(limit);
        Ok(hits)
    }

    async fn top_tracks(
        &self,
        _credential: &CatalogCredential,
        window: TimeWindow,
        _limit: usize,
    ) -> Result<Vec<Track>, CatalogError> {
        self.calls.top_tracks.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(Self::outage());
        }
        // The whole library counts as "short term"; other windows are
        // empty so the union is stable across windows.
        match window {
            TimeWindow::Short => Ok(self.history.clone()),
            _ => Ok(Vec::new()),
        }
    }

    async fn recently_played(
        &self,
        _credential: &CatalogCredential,
        _limit: usize,
    ) -> Result<Vec<Track>, CatalogError> {
        self.calls.recently_played.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(Self::outage());
        }
        Ok(Vec::new())
    }

    async fn audio_features(
        &self,
        _credential: &CatalogCredential,
        track_ids: &[String],
    ) -> Result<HashMap<String, AudioFeatures>, CatalogError> {
        self.calls.audio_features.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(Self::outage());
        }
        Ok(self
            .history
            .iter()
            .filter(|t| track_ids.contains(&t.id))
            .filter_map(|t| t.features.map(|f| (t.id.clone(), f)))
            .collect())
    }

    async fn artist_genres(
        &self,
        _credential: &CatalogCredential,
        artist_names: &[String],
    ) -> Result<HashMap<String, Vec<String>>, CatalogError> {
        self.calls.artist_genres.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(Self::outage());
        }
        Ok(self
            .genres
            .iter()
            .filter(|(name, _)| artist_names.contains(name))
            .map(|(name, tags)| (name.clone(), tags.clone()))
            .collect())
    }
}

/// Provider double: always replies with the same text, or always fails
/// with the same status.
pub struct StubProvider {
    name: String,
    reply: Result<String, u16>,
    pub calls: AtomicUsize,
}

impl StubProvider {
    pub fn replying(name: &str, text: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(name: &str, status: u16) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            reply: Err(status),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LlmProvider for StubProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        "stub"
    }

    async fn complete(
        &self,
        _prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(429) => Err(LlmError::RateLimited),
            Err(status) => Err(LlmError::Api {
                status: *status,
                message: "provider error".to_string(),
            }),
        }
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        Ok(())
    }
}
