//! Discovery lane: generate candidate tracks and resolve them against the
//! catalog.
//!
//! The happy path asks the model router for `{title, artist}` candidates
//! and resolves each through catalog search. When the router is exhausted
//! or no candidate survives resolution, a keyword search built from the
//! detected genres/moods keeps the lane from going empty on provider
//! outage.

use super::{popularity_score, ScoreBreakdown, ScoredTrack};
use crate::catalog::{CatalogClient, CatalogCredential, Track};
use crate::llm::ModelRouter;
use crate::query::{MoodProfile, Query};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How many candidate resolutions run concurrently.
const RESOLVE_CONCURRENCY: usize = 4;

/// Maximum keyword-search queries attempted in the fallback path.
const MAX_FALLBACK_QUERIES: usize = 4;

/// Tunables for the discovery lane.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// How many candidates to request from the model.
    pub candidate_count: usize,
    /// Maximum tracks in the lane.
    pub lane_cap: usize,
    /// Search hits fetched per candidate.
    pub search_limit: usize,
    /// Minimum name similarity between a candidate title and its search
    /// hit, 0-1.
    pub name_match_threshold: f64,
    /// Minimum catalog popularity, skipped only if the lane would
    /// otherwise be empty.
    pub popularity_floor: u8,
    /// Lowercase substrings that mark non-music noise.
    pub denylist: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            candidate_count: 15,
            lane_cap: 10,
            search_limit: 5,
            name_match_threshold: 0.55,
            popularity_floor: 10,
            denylist: default_denylist(),
        }
    }
}

/// Substrings that mark karaoke, ambience and filler content. Tuned by
/// inspection of noisy search results; configurable, not an invariant.
pub fn default_denylist() -> Vec<String> {
    [
        "karaoke",
        "instrumental version",
        "sound effect",
        "white noise",
        "rain sounds",
        "nature sounds",
        "sleep aid",
        "asmr",
        "8d audio",
        "ringtone",
        "background music",
        "elevator music",
        "therapy music",
        "study breaks",
        "meme",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// A title/artist pair proposed by a provider, prior to catalog resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackCandidate {
    pub title: String,
    pub artist: String,
}

/// Which path produced the discovery lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryPath {
    /// Model-generated candidates resolved via catalog search.
    ModelCandidates,
    /// LLM-free keyword search over detected genres/moods.
    KeywordFallback,
}

/// The discovery lane's result, with enough context for the assembler to
/// attach metadata and classify failures.
#[derive(Debug)]
pub struct DiscoveryOutcome {
    pub tracks: Vec<ScoredTrack>,
    pub path: DiscoveryPath,
    /// Provider that produced the candidates, when the model path ran.
    pub provider: Option<String>,
    /// True when every catalog search failed and the lane is empty; used
    /// to distinguish catalog outage from a genuinely empty result.
    pub catalog_failed: bool,
}

/// Resolves newly discovered tracks for a query.
pub struct DiscoveryRecommender {
    router: Arc<ModelRouter>,
    catalog: Arc<dyn CatalogClient>,
    config: DiscoveryConfig,
}

/// Counters for catalog search attempts within one lane run.
#[derive(Default)]
struct SearchStats {
    attempted: usize,
    failed: usize,
}

impl DiscoveryRecommender {
    pub fn new(
        router: Arc<ModelRouter>,
        catalog: Arc<dyn CatalogClient>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            router,
            catalog,
            config,
        }
    }

    /// Produce the discovery lane. `exclude` holds every track id already
    /// present in the user's history sample.
    pub async fn recommend(
        &self,
        credential: &CatalogCredential,
        mood: &MoodProfile,
        query: &Query,
        exclude: &HashSet<String>,
    ) -> DiscoveryOutcome {
        let mut stats = SearchStats::default();
        let mut provider = None;

        let prompt = self.candidate_prompt(mood, query);
        match self.router.generate_json::<Vec<TrackCandidate>>(&prompt).await {
            Ok((candidates, generation)) => {
                info!(
                    provider = %generation.provider,
                    candidates = candidates.len(),
                    "Model proposed discovery candidates"
                );
                provider = Some(generation.provider);

                let resolved = self
                    .resolve_candidates(credential, candidates, exclude, &mut stats)
                    .await;
                if !resolved.is_empty() {
                    return DiscoveryOutcome {
                        tracks: self.finalize(resolved),
                        path: DiscoveryPath::ModelCandidates,
                        provider,
                        catalog_failed: false,
                    };
                }
                warn!("No model candidate survived resolution, trying keyword search");
            }
            Err(e) => {
                warn!(error = %e, "Model routing failed, falling back to keyword search");
            }
        }

        let tracks = self
            .keyword_search(credential, mood, query, exclude, &mut stats)
            .await;
        let catalog_failed =
            tracks.is_empty() && stats.attempted > 0 && stats.failed == stats.attempted;

        DiscoveryOutcome {
            tracks: self.finalize(tracks),
            path: DiscoveryPath::KeywordFallback,
            provider,
            catalog_failed,
        }
    }

    /// Resolve candidates through catalog search, keeping confident,
    /// novel, non-noise matches.
    async fn resolve_candidates(
        &self,
        credential: &CatalogCredential,
        candidates: Vec<TrackCandidate>,
        exclude: &HashSet<String>,
        stats: &mut SearchStats,
    ) -> Vec<Track> {
        let candidates: Vec<TrackCandidate> = candidates
            .into_iter()
            .take(self.config.candidate_count)
            .collect();

        let searches: Vec<(TrackCandidate, _)> = stream::iter(candidates)
            .map(|candidate| {
                let catalog = self.catalog.clone();
                let credential = credential.clone();
                let limit = self.config.search_limit;
                async move {
                    let search_query = format!("{} {}", candidate.title, candidate.artist);
                    let result = catalog.search_tracks(&credential, &search_query, limit).await;
                    (candidate, result)
                }
            })
            .buffered(RESOLVE_CONCURRENCY)
            .collect()
            .await;

        let mut picked = Vec::new();
        let mut picked_ids = HashSet::new();
        for (candidate, result) in searches {
            stats.attempted += 1;
            let hits = match result {
                Ok(hits) => hits,
                Err(e) => {
                    stats.failed += 1;
                    debug!(
                        title = %candidate.title,
                        error = %e,
                        "Candidate search failed"
                    );
                    continue;
                }
            };

            // Only the top hit counts, and only if it convincingly
            // matches the requested title
            let best = hits.into_iter().next().filter(|hit| {
                name_similarity(&hit.name, &candidate.title) >= self.config.name_match_threshold
            });
            let Some(track) = best else {
                debug!(
                    title = %candidate.title,
                    artist = %candidate.artist,
                    "No confident catalog match for candidate"
                );
                continue;
            };

            if exclude.contains(&track.id) || !picked_ids.insert(track.id.clone()) {
                continue;
            }
            if is_noise(&self.config.denylist, &track) {
                debug!(name = %track.name, "Dropping noisy candidate");
                continue;
            }
            picked.push(track);
        }
        picked
    }

    /// LLM-free fallback: search the catalog with queries built from the
    /// detected genres, moods and languages.
    async fn keyword_search(
        &self,
        credential: &CatalogCredential,
        mood: &MoodProfile,
        query: &Query,
        exclude: &HashSet<String>,
        stats: &mut SearchStats,
    ) -> Vec<Track> {
        let mut picked = Vec::new();
        let mut picked_ids = HashSet::new();

        for search_query in keyword_queries(mood, query) {
            if picked.len() >= self.config.lane_cap {
                break;
            }
            stats.attempted += 1;
            let hits = match self
                .catalog
                .search_tracks(credential, &search_query, self.config.lane_cap)
                .await
            {
                Ok(hits) => hits,
                Err(e) => {
                    stats.failed += 1;
                    warn!(query = %search_query, error = %e, "Keyword search failed");
                    continue;
                }
            };

            for track in hits {
                if exclude.contains(&track.id) || !picked_ids.insert(track.id.clone()) {
                    continue;
                }
                if is_noise(&self.config.denylist, &track) {
                    continue;
                }
                picked.push(track);
            }
        }
        picked
    }

    /// Popularity floor, scoring and lane cap.
    fn finalize(&self, tracks: Vec<Track>) -> Vec<ScoredTrack> {
        let floor = self.config.popularity_floor;
        let (kept, below): (Vec<Track>, Vec<Track>) =
            tracks.into_iter().partition(|t| t.popularity >= floor);

        // An empty lane is worse than low-popularity tracks
        let mut tracks = if kept.is_empty() { below } else { kept };

        tracks.sort_by(|a, b| b.popularity.cmp(&a.popularity));
        tracks.truncate(self.config.lane_cap);

        tracks
            .into_iter()
            .map(|track| {
                let score = popularity_score(track.popularity);
                ScoredTrack {
                    track,
                    match_score: score,
                    // These are not yet known-liked tracks: popularity is
                    // the only signal, carried as the query component.
                    breakdown: ScoreBreakdown {
                        query_component: score,
                        profile_component: 0.0,
                    },
                }
            })
            .collect()
    }

    fn candidate_prompt(&self, mood: &MoodProfile, query: &Query) -> String {
        let mut context = String::new();
        if !mood.genres.is_empty() {
            context.push_str(&format!("Detected genres: {}.\n", mood.genres.join(", ")));
        }
        if !mood.moods.is_empty() {
            context.push_str(&format!("Detected moods: {}.\n", mood.moods.join(", ")));
        }
        if !mood.languages.is_empty() {
            // Regional requests drift to global hits without a hard rule
            context.push_str(&format!(
                "IMPORTANT: the listener asked for {lang} music. Every suggestion \
                 must be a {lang} song by a {lang} artist.\n",
                lang = mood.languages.join("/")
            ));
        }

        format!(
            "Suggest {count} real, released songs for this listener request: \"{request}\".\n\
             {context}\
             Respond with a JSON array only, no other text:\n\
             [{{\"title\": \"song title\", \"artist\": \"artist name\"}}]\n\
             Rules: real songs only, no duplicates, one artist-title pair per entry.",
            count = self.config.candidate_count,
            request = query.raw,
            context = context,
        )
    }
}

/// Keyword queries derived from the detected tags, most specific first.
fn keyword_queries(mood: &MoodProfile, query: &Query) -> Vec<String> {
    let mut queries = Vec::new();

    let first_mood = mood.moods.first();
    for language in &mood.languages {
        match first_mood {
            Some(m) => queries.push(format!("{} {} songs", language, m)),
            None => queries.push(format!("{} songs", language)),
        }
        queries.push(format!("{} hits", language));
    }
    for genre in mood.genres.iter().filter(|g| !mood.languages.contains(g)) {
        queries.push(format!("{} music", genre));
    }
    for m in &mood.moods {
        queries.push(format!("{} songs", m));
    }
    queries.push(query.raw.clone());

    queries.truncate(MAX_FALLBACK_QUERIES);
    queries
}

/// Whether a track's text matches the noise denylist.
fn is_noise(denylist: &[String], track: &Track) -> bool {
    let text = track.matchable_text();
    denylist.iter().any(|term| text.contains(term.as_str()))
}

/// Name similarity as normalized edit distance, 0-1.
fn name_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein_distance(&a, &b) as f64 / max_len as f64)
}

/// Minimum single-character edits (insert, delete, substitute) between
/// two strings. Two-row rolling implementation.
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (a_len, b_len) = (a_chars.len(), b_chars.len());

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row: Vec<usize> = vec![0; b_len + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = if a_char == b_char { 0 } else { 1 };
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        AudioFeatures, CatalogError, CatalogCredential, TimeWindow, TrackSource,
    };
    use crate::llm::{CompletionOptions, LlmError, LlmProvider};
    use crate::query::QueryAnalyzer;
    use async_trait::async_trait;
    use std::collections::HashMap;

    fn track(id: &str, name: &str, popularity: u8) -> Track {
        Track {
            id: id.to_string(),
            name: name.to_string(),
            artists: vec!["Artist".to_string()],
            album: "Album".to_string(),
            features: None,
            popularity,
            source: TrackSource::Discovery,
        }
    }

    /// Provider double returning one fixed reply (or error) every call.
    struct FixedProvider {
        reply: Result<String, u16>,
    }

    #[async_trait]
    impl LlmProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn model(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            _prompt: &str,
            _options: &CompletionOptions,
        ) -> Result<String, LlmError> {
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(429) => Err(LlmError::RateLimited),
                Err(status) => Err(LlmError::Api {
                    status: *status,
                    message: "error".to_string(),
                }),
            }
        }

        async fn health_check(&self) -> Result<(), LlmError> {
            Ok(())
        }
    }

    /// Catalog double serving search results by substring match on the
    /// query.
    struct SearchCatalog {
        results: HashMap<String, Vec<Track>>,
        fail: bool,
    }

    #[async_trait]
    impl CatalogClient for SearchCatalog {
        async fn search_tracks(
            &self,
            _credential: &CatalogCredential,
            query: &str,
            _limit: usize,
        ) -> Result<Vec<Track>, CatalogError> {
            if self.fail {
                return Err(CatalogError::Api {
                    status: 500,
                    message: "down".to_string(),
                });
            }
            let query = query.to_lowercase();
            Ok(self
                .results
                .iter()
                .filter(|(key, _)| query.contains(key.as_str()))
                .flat_map(|(_, tracks)| tracks.clone())
                .collect())
        }

        async fn top_tracks(
            &self,
            _credential: &CatalogCredential,
            _window: TimeWindow,
            _limit: usize,
        ) -> Result<Vec<Track>, CatalogError> {
            Ok(Vec::new())
        }

        async fn recently_played(
            &self,
            _credential: &CatalogCredential,
            _limit: usize,
        ) -> Result<Vec<Track>, CatalogError> {
            Ok(Vec::new())
        }

        async fn audio_features(
            &self,
            _credential: &CatalogCredential,
            _track_ids: &[String],
        ) -> Result<HashMap<String, AudioFeatures>, CatalogError> {
            Ok(HashMap::new())
        }

        async fn artist_genres(
            &self,
            _credential: &CatalogCredential,
            _artist_names: &[String],
        ) -> Result<HashMap<String, Vec<String>>, CatalogError> {
            Ok(HashMap::new())
        }
    }

    fn recommender(
        reply: Result<String, u16>,
        results: HashMap<String, Vec<Track>>,
        fail: bool,
    ) -> DiscoveryRecommender {
        let provider = Arc::new(FixedProvider { reply }) as Arc<dyn LlmProvider>;
        let router = Arc::new(ModelRouter::new(vec![provider], CompletionOptions::default()));
        let catalog = Arc::new(SearchCatalog { results, fail }) as Arc<dyn CatalogClient>;
        DiscoveryRecommender::new(router, catalog, DiscoveryConfig::default())
    }

    fn credential() -> CatalogCredential {
        CatalogCredential {
            user_id: "user-1".to_string(),
            access_token: "token".to_string(),
        }
    }

    async fn mood_and_query(text: &str) -> (MoodProfile, Query) {
        let query = Query::new(text).unwrap();
        let mood = QueryAnalyzer::new().analyze(&query).await;
        (mood, query)
    }

    // ==========================================================================
    // Similarity and filter tests
    // ==========================================================================

    #[test]
    fn test_name_similarity_exact_and_close() {
        assert_eq!(name_similarity("Shape of You", "shape of you"), 1.0);
        assert!(name_similarity("Shape of You", "Shape of You - Remix") < 1.0);
        assert!(name_similarity("Shape of You", "Totally Different Song") < 0.4);
    }

    #[test]
    fn test_levenshtein_basics() {
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("same", "same"), 0);
    }

    #[test]
    fn test_noise_filter() {
        let denylist = default_denylist();
        assert!(is_noise(&denylist, &track("a", "Love Song (Karaoke Version)", 50)));
        assert!(is_noise(&denylist, &track("b", "Rain Sounds for Sleeping", 50)));
        assert!(!is_noise(&denylist, &track("c", "Ordinary Love Song", 50)));
    }

    #[test]
    fn test_keyword_queries_regional_first() {
        let (mood, query) = futures::executor::block_on(mood_and_query("chill telugu songs"));
        let queries = keyword_queries(&mood, &query);
        assert_eq!(queries[0], "telugu chill songs");
        assert!(queries.len() <= MAX_FALLBACK_QUERIES);
    }

    // ==========================================================================
    // Lane behavior tests
    // ==========================================================================

    #[tokio::test]
    async fn test_model_candidates_resolved() {
        let reply = Ok(r#"[{"title": "Samajavaragamana", "artist": "Sid Sriram"}]"#.to_string());
        let results = HashMap::from([(
            "samajavaragamana".to_string(),
            vec![track("d1", "Samajavaragamana", 70)],
        )]);
        let rec = recommender(reply, results, false);
        let (mood, query) = mood_and_query("telugu melodies").await;

        let outcome = rec
            .recommend(&credential(), &mood, &query, &HashSet::new())
            .await;
        assert_eq!(outcome.path, DiscoveryPath::ModelCandidates);
        assert_eq!(outcome.provider.as_deref(), Some("fixed"));
        assert_eq!(outcome.tracks.len(), 1);
        assert_eq!(outcome.tracks[0].track.id, "d1");
        assert!((outcome.tracks[0].match_score - 7.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_excluded_ids_skipped() {
        let reply = Ok(r#"[{"title": "Known Song", "artist": "A"}]"#.to_string());
        let results = HashMap::from([(
            "known song".to_string(),
            vec![track("seen", "Known Song", 80)],
        )]);
        let rec = recommender(reply, results, false);
        let (mood, query) = mood_and_query("pop").await;
        let exclude = HashSet::from(["seen".to_string()]);

        let outcome = rec.recommend(&credential(), &mood, &query, &exclude).await;
        assert!(outcome.tracks.iter().all(|t| t.track.id != "seen"));
    }

    #[tokio::test]
    async fn test_low_similarity_hits_skipped() {
        let reply = Ok(r#"[{"title": "Quiet Morning", "artist": "A"}]"#.to_string());
        // The search "matches" but returns something entirely different
        let results = HashMap::from([(
            "quiet morning".to_string(),
            vec![track("junk", "MEGA PARTY ANTHEM 3000", 90)],
        )]);
        let rec = recommender(reply, results, false);
        let (mood, query) = mood_and_query("calm acoustic").await;

        let outcome = rec
            .recommend(&credential(), &mood, &query, &HashSet::new())
            .await;
        assert!(outcome.tracks.iter().all(|t| t.track.id != "junk"));
    }

    #[tokio::test]
    async fn test_provider_exhaustion_falls_back_to_keyword_search() {
        // 429 everywhere: router exhausts, keyword search must fill the lane
        let results = HashMap::from([(
            "chill songs".to_string(),
            vec![track("k1", "Evening Chill", 45)],
        )]);
        let rec = recommender(Err(429), results, false);
        let (mood, query) = mood_and_query("chill vibes").await;

        let outcome = rec
            .recommend(&credential(), &mood, &query, &HashSet::new())
            .await;
        assert_eq!(outcome.path, DiscoveryPath::KeywordFallback);
        assert!(outcome.provider.is_none());
        assert_eq!(outcome.tracks.len(), 1);
        assert!(!outcome.catalog_failed);
    }

    #[tokio::test]
    async fn test_catalog_outage_flagged() {
        let rec = recommender(Err(429), HashMap::new(), true);
        let (mood, query) = mood_and_query("anything at all pop").await;

        let outcome = rec
            .recommend(&credential(), &mood, &query, &HashSet::new())
            .await;
        assert!(outcome.tracks.is_empty());
        assert!(outcome.catalog_failed);
    }

    #[tokio::test]
    async fn test_popularity_floor_restores_when_lane_would_be_empty() {
        let reply = Ok(r#"[{"title": "Obscure Gem", "artist": "A"}]"#.to_string());
        let results = HashMap::from([(
            "obscure gem".to_string(),
            vec![track("rare", "Obscure Gem", 3)],
        )]);
        let rec = recommender(reply, results, false);
        let (mood, query) = mood_and_query("deep cuts pop").await;

        let outcome = rec
            .recommend(&credential(), &mood, &query, &HashSet::new())
            .await;
        // Below the floor, but the only result: kept rather than emptying
        // the lane
        assert_eq!(outcome.tracks.len(), 1);
        assert_eq!(outcome.tracks[0].track.id, "rare");
    }
}
