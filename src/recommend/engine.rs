//! Request orchestration and result assembly.
//!
//! One request flows: query validation → (analysis ∥ profile fetch) →
//! (history lane ∥ discovery lane) → assembly. Lane failures degrade the
//! lane; only a broad catalog outage fails the request.

use super::discovery::{DiscoveryPath, DiscoveryRecommender};
use super::history::{rank_history, HistoryConfig};
use super::ScoredTrack;
use crate::catalog::CatalogCredential;
use crate::error::RecommendError;
use crate::profile::{ProfileBuilder, ProfileSnapshot};
use crate::query::{MoodProfile, Query, QueryAnalyzer};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

/// Per-lane deadlines.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deadline for the profile fetch feeding the history lane.
    pub profile_timeout: Duration,
    /// Deadline for the discovery lane.
    pub discovery_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profile_timeout: Duration::from_secs(20),
            discovery_timeout: Duration::from_secs(30),
        }
    }
}

/// Provider and timing metadata attached to each result.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationMeta {
    pub request_id: String,
    /// Provider that generated discovery candidates, when one did.
    pub provider: Option<String>,
    /// Which path produced the discovery lane.
    pub discovery_path: Option<DiscoveryPath>,
    pub elapsed_ms: u64,
}

/// The unit returned to the caller. Never persisted; recomputed per
/// request. Lanes are always present, possibly empty.
#[derive(Debug, Serialize)]
pub struct Recommendations {
    pub user_history_recs: Vec<ScoredTrack>,
    pub new_recs: Vec<ScoredTrack>,
    pub analysis: MoodProfile,
    pub meta: RecommendationMeta,
}

/// Runs the full query-to-recommendation flow.
pub struct RecommendationEngine {
    analyzer: QueryAnalyzer,
    profiles: Arc<ProfileBuilder>,
    discovery: DiscoveryRecommender,
    history_config: HistoryConfig,
    config: EngineConfig,
}

impl RecommendationEngine {
    pub fn new(
        analyzer: QueryAnalyzer,
        profiles: Arc<ProfileBuilder>,
        discovery: DiscoveryRecommender,
        history_config: HistoryConfig,
        config: EngineConfig,
    ) -> Self {
        Self {
            analyzer,
            profiles,
            discovery,
            history_config,
            config,
        }
    }

    pub async fn recommend(
        &self,
        credential: &CatalogCredential,
        raw_query: &str,
    ) -> Result<Recommendations, RecommendError> {
        // Reject before any network call
        let query = Query::new(raw_query)?;
        let started = Instant::now();
        let request_id = Uuid::new_v4().to_string();

        info!(
            request_id = %request_id,
            user_id = %credential.user_id,
            query = %query.normalized,
            "Processing recommendation request"
        );

        // Analysis and profile fetch have no dependency on each other
        let (mood, profile_result) = tokio::join!(
            self.analyzer.analyze(&query),
            timeout(
                self.config.profile_timeout,
                self.profiles.profile_for(credential)
            ),
        );

        let snapshot = match profile_result {
            Ok(snapshot) => snapshot,
            Err(_) => {
                warn!(request_id = %request_id, "Profile fetch timed out, degrading lane");
                ProfileSnapshot::neutral()
            }
        };

        // Discovery excludes everything in the history sample, not just
        // the ranked lane, so the lanes can never intersect
        let exclusion: HashSet<String> =
            snapshot.sample.iter().map(|t| t.id.clone()).collect();

        let history_lane_fut = async {
            rank_history(
                &mood,
                &snapshot.profile,
                &snapshot.sample,
                &snapshot.artist_genres,
                &query,
                &self.history_config,
            )
        };
        let discovery_fut = timeout(
            self.config.discovery_timeout,
            self.discovery
                .recommend(credential, &mood, &query, &exclusion),
        );

        let (history_lane, discovery_result) = tokio::join!(history_lane_fut, discovery_fut);

        let (discovery_lane, discovery_path, provider, discovery_catalog_failed) =
            match discovery_result {
                Ok(outcome) => (
                    outcome.tracks,
                    Some(outcome.path),
                    outcome.provider,
                    outcome.catalog_failed,
                ),
                Err(_) => {
                    warn!(request_id = %request_id, "Discovery lane timed out, degrading");
                    (Vec::new(), None, None, false)
                }
            };

        // Both lanes dead on catalog transport: nothing to return and
        // nothing to degrade to
        if history_lane.is_empty()
            && discovery_lane.is_empty()
            && snapshot.fetch_error.is_some()
            && discovery_catalog_failed
        {
            return Err(RecommendError::CatalogUnavailable);
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            request_id = %request_id,
            history = history_lane.len(),
            discovery = discovery_lane.len(),
            elapsed_ms,
            "Assembled recommendations"
        );

        Ok(Recommendations {
            user_history_recs: history_lane,
            new_recs: discovery_lane,
            analysis: mood,
            meta: RecommendationMeta {
                request_id,
                provider,
                discovery_path,
                elapsed_ms,
            },
        })
    }
}
