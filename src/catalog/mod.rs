//! Catalog service client.
//!
//! The catalog is an external collaborator: it owns track metadata, text
//! search, per-user listening history and audio analysis. This module
//! defines the trait consumed by the recommendation core and an HTTP
//! implementation of it. Every call takes an explicit credential; there is
//! no ambient session state.

mod http;
mod models;

pub use http::HttpCatalogClient;
pub use models::{AudioFeatures, Track, TrackSource};

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// A validated caller identity plus the access credential for catalog calls.
///
/// Produced by the identity collaborator upstream; this core only carries it.
#[derive(Debug, Clone)]
pub struct CatalogCredential {
    pub user_id: String,
    pub access_token: String,
}

/// Errors from the catalog collaborator.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog connection error: {0}")]
    Http(String),

    #[error("Catalog API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Catalog response decode error: {0}")]
    Decode(String),
}

/// Listening history window for top-track queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    Short,
    Medium,
    Long,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Short => "short_term",
            TimeWindow::Medium => "medium_term",
            TimeWindow::Long => "long_term",
        }
    }

    pub const ALL: [TimeWindow; 3] = [TimeWindow::Short, TimeWindow::Medium, TimeWindow::Long];
}

/// The catalog operations this core consumes.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Full-text track search.
    async fn search_tracks(
        &self,
        credential: &CatalogCredential,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Track>, CatalogError>;

    /// The user's top tracks over one history window.
    async fn top_tracks(
        &self,
        credential: &CatalogCredential,
        window: TimeWindow,
        limit: usize,
    ) -> Result<Vec<Track>, CatalogError>;

    /// The user's recently played tracks.
    async fn recently_played(
        &self,
        credential: &CatalogCredential,
        limit: usize,
    ) -> Result<Vec<Track>, CatalogError>;

    /// Audio features for a batch of track ids. Tracks the catalog has not
    /// analyzed are simply absent from the returned map.
    async fn audio_features(
        &self,
        credential: &CatalogCredential,
        track_ids: &[String],
    ) -> Result<HashMap<String, AudioFeatures>, CatalogError>;

    /// Genre tags per artist name. Unknown artists are absent from the map.
    async fn artist_genres(
        &self,
        credential: &CatalogCredential,
        artist_names: &[String],
    ) -> Result<HashMap<String, Vec<String>>, CatalogError>;
}
