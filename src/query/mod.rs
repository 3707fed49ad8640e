//! Query understanding.
//!
//! Turns a free-text mood/taste description into a structured profile:
//! detected genres and moods, an audio-feature target region, and a
//! confidence score. Lexicon matching handles the common vocabulary; for
//! queries the lexicon cannot read, an optional model classification is
//! attempted before degrading to a neutral profile. Analysis never fails.

mod lexicon;

pub use lexicon::{FeatureRange, LexiconEntry, GENRES, LANGUAGES, MOODS};

use crate::error::RecommendError;
use crate::llm::ModelRouter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Longest query we analyze; anything longer is truncated, not rejected.
const MAX_QUERY_CHARS: usize = 200;

/// A received recommendation query. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Query {
    pub raw: String,
    pub normalized: String,
    pub received_at: DateTime<Utc>,
}

impl Query {
    /// Validate and normalize raw query text.
    ///
    /// Empty or whitespace-only text is rejected before any network call.
    pub fn new(raw: &str) -> Result<Self, RecommendError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RecommendError::InvalidQuery);
        }

        let mut text = trimmed.to_string();
        if text.chars().count() > MAX_QUERY_CHARS {
            warn!(
                len = text.chars().count(),
                "Query exceeds {} chars, truncating", MAX_QUERY_CHARS
            );
            text = text.chars().take(MAX_QUERY_CHARS).collect();
        }

        let normalized = text
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Self {
            raw: text,
            normalized,
            received_at: Utc::now(),
        })
    }
}

/// Structured interpretation of a query. Read-only downstream.
#[derive(Debug, Clone, Serialize)]
pub struct MoodProfile {
    /// Detected genre tags, including language/regional tags.
    pub genres: Vec<String>,
    /// Detected mood tags.
    pub moods: Vec<String>,
    /// Detected language/regional tags (subset of `genres`), kept separate
    /// to drive regional emphasis in generation prompts.
    pub languages: Vec<String>,
    /// Audio-feature target region for scoring.
    pub target: FeatureRange,
    /// How confident the analysis is, 0.0-1.0.
    pub confidence: f32,
    /// Human-readable summary of what was detected.
    pub rationale: String,
}

impl MoodProfile {
    /// Profile used when nothing could be detected: mid-range targets,
    /// zero confidence.
    pub fn neutral() -> Self {
        Self {
            genres: Vec::new(),
            moods: Vec::new(),
            languages: Vec::new(),
            target: FeatureRange::neutral(),
            confidence: 0.0,
            rationale: "No recognizable genres or moods detected".to_string(),
        }
    }

    /// All detected tags, genres first.
    pub fn all_tags(&self) -> Vec<&str> {
        self.genres
            .iter()
            .chain(self.moods.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Shape the model must return for open-ended query classification.
#[derive(Debug, Deserialize)]
struct MoodClassification {
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    moods: Vec<String>,
    energy: f32,
    valence: f32,
}

/// Parses query text into a [`MoodProfile`].
pub struct QueryAnalyzer {
    router: Option<Arc<ModelRouter>>,
}

impl QueryAnalyzer {
    /// Analyzer using lexicon matching only.
    pub fn new() -> Self {
        Self { router: None }
    }

    /// Analyzer that delegates lexicon misses to a model classification.
    pub fn with_router(router: Arc<ModelRouter>) -> Self {
        Self {
            router: Some(router),
        }
    }

    /// Analyze a query. Degrades to [`MoodProfile::neutral`], never fails.
    pub async fn analyze(&self, query: &Query) -> MoodProfile {
        if let Some(profile) = Self::lexicon_profile(&query.normalized) {
            debug!(
                genres = ?profile.genres,
                moods = ?profile.moods,
                confidence = profile.confidence,
                "Lexicon matched query"
            );
            return profile;
        }

        if let Some(router) = &self.router {
            if let Some(profile) = Self::classify_with_model(router, query).await {
                return profile;
            }
        }

        debug!("Query matched nothing, using neutral profile");
        MoodProfile::neutral()
    }

    fn lexicon_profile(normalized: &str) -> Option<MoodProfile> {
        let mut genres = lexicon::matching_tags(normalized, GENRES);
        let moods = lexicon::matching_tags(normalized, MOODS);
        let languages = lexicon::matching_tags(normalized, LANGUAGES);

        // Language tags ride in the genre set; the catalog's genre
        // taxonomy includes them.
        for language in &languages {
            if !genres.contains(language) {
                genres.push(language.clone());
            }
        }

        let match_count = genres.len() + moods.len();
        if match_count == 0 {
            return None;
        }

        // The first matched mood drives the feature target, falling back
        // to the first matched genre.
        let target = moods
            .iter()
            .chain(genres.iter())
            .find_map(|tag| lexicon::target_for(tag))
            .unwrap_or_else(FeatureRange::neutral);

        let confidence = (match_count as f32 * 0.25 + 0.1).min(1.0);

        let genre_text = if genres.is_empty() {
            "various genres".to_string()
        } else {
            genres[..genres.len().min(3)].join(", ")
        };
        let mood_text = if moods.is_empty() {
            "mixed moods".to_string()
        } else {
            moods[..moods.len().min(3)].join(", ")
        };
        let rationale = format!("Detected {} with {} vibes", genre_text, mood_text);

        Some(MoodProfile {
            genres,
            moods,
            languages,
            target,
            confidence,
            rationale,
        })
    }

    async fn classify_with_model(router: &ModelRouter, query: &Query) -> Option<MoodProfile> {
        let prompt = format!(
            "Classify this music request: \"{}\"\n\n\
             Respond with JSON only, no other text:\n\
             {{\"genres\": [\"...\"], \"moods\": [\"...\"], \"energy\": 0.0, \"valence\": 0.0}}\n\n\
             genres: up to 3 music genre tags (lowercase).\n\
             moods: up to 3 mood words (lowercase).\n\
             energy and valence: target values between 0.0 and 1.0.",
            query.raw
        );

        match router.generate_json::<MoodClassification>(&prompt).await {
            Ok((classification, generation)) => {
                debug!(
                    provider = %generation.provider,
                    genres = ?classification.genres,
                    "Model classified query"
                );
                Some(MoodProfile {
                    genres: classification.genres,
                    moods: classification.moods,
                    languages: Vec::new(),
                    target: FeatureRange::around(classification.energy, classification.valence),
                    confidence: 0.5,
                    rationale: format!("Classified by {} model", generation.provider),
                })
            }
            Err(e) => {
                warn!(error = %e, "Model classification failed, degrading to neutral");
                None
            }
        }
    }
}

impl Default for QueryAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
