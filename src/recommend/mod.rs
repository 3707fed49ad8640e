//! The two-lane recommendation core.
//!
//! `history` re-ranks the user's own tracks, `discovery` resolves newly
//! generated candidates against the catalog, and `engine` runs both lanes
//! concurrently and assembles the result.

pub mod discovery;
pub mod engine;
pub mod history;

pub use discovery::{DiscoveryConfig, DiscoveryOutcome, DiscoveryPath, DiscoveryRecommender};
pub use engine::{EngineConfig, RecommendationEngine, RecommendationMeta, Recommendations};
pub use history::{rank_history, HistoryConfig};

use crate::catalog::Track;
use serde::Serialize;

/// The components that produced a match score.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScoreBreakdown {
    /// Similarity to the query's audio-feature targets, 0-10.
    pub query_component: f64,
    /// Similarity to the user's taste profile, 0-10.
    pub profile_component: f64,
}

/// A track with its relevance score for one request.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredTrack {
    #[serde(flatten)]
    pub track: Track,
    /// Overall match score, 0-10.
    pub match_score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Scale catalog popularity (0-100) onto the 0-10 score range.
pub(crate) fn popularity_score(popularity: u8) -> f64 {
    (popularity as f64 / 10.0).clamp(0.0, 10.0)
}
