//! User taste profile aggregation.
//!
//! Builds a per-user summary of listening history: top genres by frequency
//! and mean audio features over a bounded sample of top/recent tracks.
//! Results are cached per user with a TTL, and concurrent first requests
//! for the same user coalesce into a single catalog fetch.

use crate::catalog::{
    AudioFeatures, CatalogClient, CatalogCredential, CatalogError, TimeWindow, Track,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Tunables for profile aggregation.
#[derive(Debug, Clone)]
pub struct ProfileConfig {
    /// Maximum tracks in the history sample.
    pub sample_size: usize,
    /// How many top genres to keep.
    pub top_genres: usize,
    /// How long a built profile stays valid.
    pub cache_ttl: Duration,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            sample_size: 50,
            top_genres: 5,
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

/// Aggregated summary of a user's listening history.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TasteProfile {
    /// Ranked, deduplicated genre tags.
    pub top_genres: Vec<String>,
    /// Mean audio features over the sampled tracks that have them.
    pub mean_features: Option<AudioFeatures>,
    /// How many tracks the profile was built from. 0 means neutral.
    pub sample_size: usize,
    pub built_at: DateTime<Utc>,
}

impl TasteProfile {
    /// Profile for a user with no usable history. Downstream scoring
    /// weights the profile term to zero at sample_size 0.
    pub fn neutral() -> Self {
        Self {
            top_genres: Vec::new(),
            mean_features: None,
            sample_size: 0,
            built_at: Utc::now(),
        }
    }
}

/// A profile plus the raw material it was built from, for reuse by the
/// history lane without re-fetching.
#[derive(Debug)]
pub struct ProfileSnapshot {
    pub profile: TasteProfile,
    /// The history sample, with audio features attached where available.
    pub sample: Vec<Track>,
    /// Genre tags per artist name, resolved during the build.
    pub artist_genres: HashMap<String, Vec<String>>,
    /// Set when the catalog fetch failed entirely and the profile
    /// degraded to neutral.
    pub fetch_error: Option<CatalogError>,
}

impl ProfileSnapshot {
    /// Empty snapshot for callers that must degrade without a fetch
    /// result (e.g. on a profile deadline).
    pub fn neutral() -> Self {
        Self {
            profile: TasteProfile::neutral(),
            sample: Vec::new(),
            artist_genres: HashMap::new(),
            fetch_error: None,
        }
    }
}

struct CacheEntry {
    profile: TasteProfile,
    sample: Vec<Track>,
    artist_genres: HashMap<String, Vec<String>>,
    cached_at: Instant,
}

/// Builds and caches taste profiles.
pub struct ProfileBuilder {
    catalog: Arc<dyn CatalogClient>,
    config: ProfileConfig,
    cache: Mutex<HashMap<String, CacheEntry>>,
    build_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ProfileBuilder {
    pub fn new(catalog: Arc<dyn CatalogClient>, config: ProfileConfig) -> Self {
        Self {
            catalog,
            config,
            cache: Mutex::new(HashMap::new()),
            build_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Get the user's profile, from cache or by building it.
    ///
    /// Never fails: a total fetch failure degrades to a neutral profile
    /// carrying the error for the caller to inspect.
    pub async fn profile_for(&self, credential: &CatalogCredential) -> ProfileSnapshot {
        if let Some(snapshot) = self.cached(&credential.user_id) {
            debug!(user_id = %credential.user_id, "Profile cache hit");
            return snapshot;
        }

        // Single writer per key: concurrent first requests for the same
        // user wait here instead of issuing duplicate fetches.
        let build_lock = {
            let mut locks = self.build_locks.lock().unwrap();
            locks
                .entry(credential.user_id.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        let _guard = build_lock.lock().await;

        if let Some(snapshot) = self.cached(&credential.user_id) {
            debug!(user_id = %credential.user_id, "Profile built while waiting");
            return snapshot;
        }

        match self.build(credential).await {
            Ok(entry) => {
                let snapshot = ProfileSnapshot {
                    profile: entry.profile.clone(),
                    sample: entry.sample.clone(),
                    artist_genres: entry.artist_genres.clone(),
                    fetch_error: None,
                };
                self.cache
                    .lock()
                    .unwrap()
                    .insert(credential.user_id.clone(), entry);
                snapshot
            }
            Err(e) => {
                warn!(
                    user_id = %credential.user_id,
                    error = %e,
                    "Profile fetch failed, degrading to neutral"
                );
                ProfileSnapshot {
                    profile: TasteProfile::neutral(),
                    sample: Vec::new(),
                    artist_genres: HashMap::new(),
                    fetch_error: Some(e),
                }
            }
        }
    }

    fn cached(&self, user_id: &str) -> Option<ProfileSnapshot> {
        let mut cache = self.cache.lock().unwrap();
        match cache.get(user_id) {
            Some(entry) if entry.cached_at.elapsed() < self.config.cache_ttl => {
                Some(ProfileSnapshot {
                    profile: entry.profile.clone(),
                    sample: entry.sample.clone(),
                    artist_genres: entry.artist_genres.clone(),
                    fetch_error: None,
                })
            }
            Some(_) => {
                debug!(user_id = %user_id, "Profile cache entry expired");
                cache.remove(user_id);
                None
            }
            None => None,
        }
    }

    async fn build(&self, credential: &CatalogCredential) -> Result<CacheEntry, CatalogError> {
        let mut sample = Vec::new();
        let mut seen = HashSet::new();
        let mut last_error = None;

        // Union of top tracks across all history windows plus recent plays,
        // deduplicated by id. Individual window failures are tolerated.
        for window in TimeWindow::ALL {
            match self
                .catalog
                .top_tracks(credential, window, self.config.sample_size)
                .await
            {
                Ok(tracks) => {
                    for track in tracks {
                        if seen.insert(track.id.clone()) {
                            sample.push(track);
                        }
                    }
                }
                Err(e) => {
                    warn!(window = window.as_str(), error = %e, "Top tracks fetch failed");
                    last_error = Some(e);
                }
            }
        }

        match self
            .catalog
            .recently_played(credential, self.config.sample_size)
            .await
        {
            Ok(tracks) => {
                for track in tracks {
                    if seen.insert(track.id.clone()) {
                        sample.push(track);
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Recently played fetch failed");
                last_error = Some(e);
            }
        }

        if sample.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
            // The user genuinely has no history
            info!(user_id = %credential.user_id, "No listening history found");
            return Ok(CacheEntry {
                profile: TasteProfile::neutral(),
                sample: Vec::new(),
                artist_genres: HashMap::new(),
                cached_at: Instant::now(),
            });
        }

        sample.truncate(self.config.sample_size);

        // Attach audio features; failure here degrades scoring quality
        // but not the profile.
        let ids: Vec<String> = sample.iter().map(|t| t.id.clone()).collect();
        match self.catalog.audio_features(credential, &ids).await {
            Ok(features) => {
                for track in &mut sample {
                    if let Some(f) = features.get(&track.id) {
                        track.features = Some(*f);
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Audio features fetch failed");
            }
        }

        let mean_features = mean_features(&sample);

        // Resolve artist genre tags and rank genres by frequency
        let mut artist_names: Vec<String> = Vec::new();
        let mut seen_artists = HashSet::new();
        for track in &sample {
            for artist in &track.artists {
                if seen_artists.insert(artist.to_lowercase()) {
                    artist_names.push(artist.clone());
                }
            }
        }

        let artist_genres = match self.catalog.artist_genres(credential, &artist_names).await {
            Ok(genres) => genres,
            Err(e) => {
                warn!(error = %e, "Artist genres fetch failed");
                HashMap::new()
            }
        };

        let top_genres = rank_genres(&sample, &artist_genres, self.config.top_genres);

        info!(
            user_id = %credential.user_id,
            sample_size = sample.len(),
            top_genres = ?top_genres,
            "Built taste profile"
        );

        Ok(CacheEntry {
            profile: TasteProfile {
                top_genres,
                mean_features,
                sample_size: sample.len(),
                built_at: Utc::now(),
            },
            sample,
            artist_genres,
            cached_at: Instant::now(),
        })
    }
}

/// Per-feature means over the tracks that have features.
fn mean_features(sample: &[Track]) -> Option<AudioFeatures> {
    let features: Vec<&AudioFeatures> = sample.iter().filter_map(|t| t.features.as_ref()).collect();
    if features.is_empty() {
        return None;
    }
    let n = features.len() as f32;
    Some(AudioFeatures {
        energy: features.iter().map(|f| f.energy).sum::<f32>() / n,
        valence: features.iter().map(|f| f.valence).sum::<f32>() / n,
        tempo: features.iter().map(|f| f.tempo).sum::<f32>() / n,
        danceability: features.iter().map(|f| f.danceability).sum::<f32>() / n,
    })
}

/// Rank genre tags by how many sampled tracks they cover.
fn rank_genres(
    sample: &[Track],
    artist_genres: &HashMap<String, Vec<String>>,
    top_k: usize,
) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for track in sample {
        for artist in &track.artists {
            if let Some(genres) = artist_genres.get(artist) {
                for genre in genres {
                    *counts.entry(genre.as_str()).or_insert(0) += 1;
                }
            }
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    // Alphabetical tiebreak keeps the ranking deterministic
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(top_k)
        .map(|(genre, _)| genre.to_string())
        .collect()
}
