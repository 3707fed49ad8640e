//! History lane: re-rank the user's own tracks against the query.
//!
//! Purely CPU-bound; the history sample and artist genre tags come from
//! the profile build and are reused, never re-fetched.

use super::{ScoreBreakdown, ScoredTrack};
use crate::catalog::{AudioFeatures, Track};
use crate::profile::TasteProfile;
use crate::query::{FeatureRange, MoodProfile, Query};
use std::collections::HashMap;

/// BPM span used to normalize tempo distances onto [0, 1].
const TEMPO_SPAN: f32 = 200.0;

/// Decay applied to the profile component when a track's genres do not
/// overlap the user's top genres and only feature proximity remains.
const PARTIAL_PROFILE_DECAY: f64 = 0.5;

/// Tunables for history-lane scoring.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Weight of the query-similarity component. Query intent dominates.
    pub query_weight: f64,
    /// Weight of the taste-profile component. The profile nudges.
    pub profile_weight: f64,
    /// Maximum tracks in the lane.
    pub lane_cap: usize,
    /// Score ceiling for tracks without audio features, so name/genre
    /// heuristics never outrank fully-scored tracks.
    pub featureless_cap: f64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            query_weight: 0.7,
            profile_weight: 0.3,
            lane_cap: 10,
            featureless_cap: 6.0,
        }
    }
}

/// Score and rank the history sample. Returns at most `lane_cap` tracks,
/// sorted by score descending with popularity as tiebreak.
pub fn rank_history(
    mood: &MoodProfile,
    profile: &TasteProfile,
    sample: &[Track],
    artist_genres: &HashMap<String, Vec<String>>,
    query: &Query,
    config: &HistoryConfig,
) -> Vec<ScoredTrack> {
    // A neutral profile contributes nothing: weight the profile term to
    // zero and let query similarity carry the whole score.
    let (query_weight, profile_weight) = if profile.sample_size == 0 {
        (1.0, 0.0)
    } else {
        (config.query_weight, config.profile_weight)
    };
    let weight_sum = query_weight + profile_weight;

    let mut scored: Vec<ScoredTrack> = sample
        .iter()
        .map(|track| {
            let genres = genres_for(track, artist_genres);
            let profile_component = profile_similarity(track, &genres, profile);

            let (query_component, capped) = match &track.features {
                Some(features) => (feature_similarity(features, &mood.target), false),
                None => (text_heuristic(track, &genres, mood, query, config), true),
            };

            let mut match_score =
                (query_weight * query_component + profile_weight * profile_component) / weight_sum;
            if capped {
                match_score = match_score.min(config.featureless_cap);
            }
            match_score = match_score.clamp(0.0, 10.0);

            ScoredTrack {
                track: track.clone(),
                match_score,
                breakdown: ScoreBreakdown {
                    query_component,
                    profile_component,
                },
            }
        })
        .collect();

    // Stable sort: score desc, then popularity desc, then input order
    scored.sort_by(|a, b| {
        b.match_score
            .partial_cmp(&a.match_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.track.popularity.cmp(&a.track.popularity))
    });
    scored.truncate(config.lane_cap);
    scored
}

/// Lowercased genre tags for a track's artists.
fn genres_for(track: &Track, artist_genres: &HashMap<String, Vec<String>>) -> Vec<String> {
    let mut genres = Vec::new();
    for artist in &track.artists {
        if let Some(tags) = artist_genres.get(artist) {
            for tag in tags {
                let tag = tag.to_lowercase();
                if !genres.contains(&tag) {
                    genres.push(tag);
                }
            }
        }
    }
    genres
}

/// Inverse distance from track features to the target region, 0-10.
fn feature_similarity(features: &AudioFeatures, target: &FeatureRange) -> f64 {
    let distance = (interval_distance(features.energy, target.energy, 1.0)
        + interval_distance(features.valence, target.valence, 1.0)
        + interval_distance(features.danceability, target.danceability, 1.0)
        + interval_distance(features.tempo, target.tempo, TEMPO_SPAN))
        / 4.0;
    (1.0 - distance) * 10.0
}

/// Normalized gap between a value and an interval: 0 inside the interval,
/// growing with the gap to the nearest bound, clamped to 1.
fn interval_distance(value: f32, (lo, hi): (f32, f32), span: f32) -> f64 {
    let gap = if value < lo {
        lo - value
    } else if value > hi {
        value - hi
    } else {
        0.0
    };
    ((gap / span) as f64).min(1.0)
}

/// Normalized distance between two feature vectors, clamped to 1.
fn point_distance(a: &AudioFeatures, b: &AudioFeatures) -> f64 {
    let d = ((a.energy - b.energy).abs()
        + (a.valence - b.valence).abs()
        + (a.danceability - b.danceability).abs()
        + (a.tempo - b.tempo).abs() / TEMPO_SPAN)
        / 4.0;
    (d as f64).min(1.0)
}

/// Taste-profile similarity, 0-10: full score on top-genre overlap,
/// otherwise a decayed partial score from feature proximity.
fn profile_similarity(track: &Track, track_genres: &[String], profile: &TasteProfile) -> f64 {
    if profile.sample_size == 0 {
        return 0.0;
    }

    let overlaps = profile.top_genres.iter().any(|top| {
        let top = top.to_lowercase();
        track_genres
            .iter()
            .any(|tag| tag.contains(&top) || top.contains(tag.as_str()))
    });
    if overlaps {
        return 10.0;
    }

    match (&track.features, &profile.mean_features) {
        (Some(features), Some(mean)) => {
            (1.0 - point_distance(features, mean)) * 10.0 * PARTIAL_PROFILE_DECAY
        }
        _ => 0.0,
    }
}

/// Fallback scoring for tracks without audio features: token matches of
/// query words and detected tags against the track's text and genres.
fn text_heuristic(
    track: &Track,
    track_genres: &[String],
    mood: &MoodProfile,
    query: &Query,
    config: &HistoryConfig,
) -> f64 {
    let text = track.matchable_text();
    let genre_text = track_genres.join(" ");

    let mut hits = 0usize;
    for word in query.normalized.split_whitespace().filter(|w| w.len() > 2) {
        if text.contains(word) || genre_text.contains(word) {
            hits += 1;
        }
    }
    for tag in mood.all_tags() {
        if text.contains(tag) || genre_text.contains(tag) {
            hits += 1;
        }
    }

    ((hits as f64) * 2.0).min(config.featureless_cap)
}
