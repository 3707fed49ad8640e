//! HTTP implementation of the catalog client.
//!
//! Speaks the catalog's REST+JSON API with per-request bearer credentials
//! and a bounded timeout on every call.

use super::models::{AudioFeatures, Track, TrackSource};
use super::{CatalogClient, CatalogCredential, CatalogError, TimeWindow};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// How many artist-genre lookups run concurrently.
const GENRE_LOOKUP_CONCURRENCY: usize = 4;

pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpCatalogClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        credential: &CatalogCredential,
        path_and_query: &str,
    ) -> Result<T, CatalogError> {
        let url = format!("{}{}", self.base_url, path_and_query);
        debug!(url = %url, user_id = %credential.user_id, "Catalog request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&credential.access_token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| CatalogError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn search_tracks(
        &self,
        credential: &CatalogCredential,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Track>, CatalogError> {
        let path = format!(
            "/search?type=track&q={}&limit={}",
            urlencoding::encode(query),
            limit
        );
        let response: SearchResponse = self.get_json(credential, &path).await?;
        Ok(response
            .tracks
            .items
            .into_iter()
            .map(|dto| dto.into_track(TrackSource::Discovery))
            .collect())
    }

    async fn top_tracks(
        &self,
        credential: &CatalogCredential,
        window: TimeWindow,
        limit: usize,
    ) -> Result<Vec<Track>, CatalogError> {
        let path = format!(
            "/me/top/tracks?time_range={}&limit={}",
            window.as_str(),
            limit
        );
        let response: TrackPage = self.get_json(credential, &path).await?;
        Ok(response
            .items
            .into_iter()
            .map(|dto| dto.into_track(TrackSource::History))
            .collect())
    }

    async fn recently_played(
        &self,
        credential: &CatalogCredential,
        limit: usize,
    ) -> Result<Vec<Track>, CatalogError> {
        let path = format!("/me/player/recently-played?limit={}", limit);
        let response: RecentlyPlayedResponse = self.get_json(credential, &path).await?;
        Ok(response
            .items
            .into_iter()
            .map(|item| item.track.into_track(TrackSource::History))
            .collect())
    }

    async fn audio_features(
        &self,
        credential: &CatalogCredential,
        track_ids: &[String],
    ) -> Result<HashMap<String, AudioFeatures>, CatalogError> {
        if track_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let path = format!("/audio-features?ids={}", track_ids.join(","));
        let response: AudioFeaturesResponse = self.get_json(credential, &path).await?;

        // The catalog returns null entries for unanalyzed tracks
        let features = response
            .audio_features
            .into_iter()
            .flatten()
            .map(|dto| {
                (
                    dto.id,
                    AudioFeatures {
                        energy: dto.energy,
                        valence: dto.valence,
                        tempo: dto.tempo,
                        danceability: dto.danceability,
                    },
                )
            })
            .collect();
        Ok(features)
    }

    async fn artist_genres(
        &self,
        credential: &CatalogCredential,
        artist_names: &[String],
    ) -> Result<HashMap<String, Vec<String>>, CatalogError> {
        let lookups = stream::iter(artist_names.iter().cloned())
            .map(|name| async move {
                let path = format!(
                    "/search?type=artist&q={}&limit=1",
                    urlencoding::encode(&name)
                );
                let result: Result<ArtistSearchResponse, CatalogError> =
                    self.get_json(credential, &path).await;
                (name, result)
            })
            .buffer_unordered(GENRE_LOOKUP_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        let mut genres = HashMap::new();
        let mut last_error = None;
        for (name, result) in lookups {
            match result {
                Ok(response) => {
                    if let Some(artist) = response.artists.items.into_iter().next() {
                        genres.insert(name, artist.genres);
                    }
                }
                Err(e) => {
                    debug!(artist = %name, error = %e, "Artist genre lookup failed");
                    last_error = Some(e);
                }
            }
        }

        // Total failure propagates; partial results are fine
        if genres.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }
        Ok(genres)
    }
}

// Catalog API types

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    items: Vec<TrackDto>,
}

#[derive(Debug, Deserialize)]
struct RecentlyPlayedResponse {
    items: Vec<PlayedItem>,
}

#[derive(Debug, Deserialize)]
struct PlayedItem {
    track: TrackDto,
}

#[derive(Debug, Deserialize)]
struct TrackDto {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<ArtistRef>,
    #[serde(default)]
    album: Option<AlbumRef>,
    #[serde(default)]
    popularity: u8,
}

impl TrackDto {
    fn into_track(self, source: TrackSource) -> Track {
        Track {
            id: self.id,
            name: self.name,
            artists: self.artists.into_iter().map(|a| a.name).collect(),
            album: self
                .album
                .map(|a| a.name)
                .unwrap_or_else(|| "Unknown Album".to_string()),
            features: None,
            popularity: self.popularity,
            source,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArtistRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AudioFeaturesResponse {
    audio_features: Vec<Option<AudioFeaturesDto>>,
}

#[derive(Debug, Deserialize)]
struct AudioFeaturesDto {
    id: String,
    energy: f32,
    valence: f32,
    tempo: f32,
    danceability: f32,
}

#[derive(Debug, Deserialize)]
struct ArtistSearchResponse {
    artists: ArtistPage,
}

#[derive(Debug, Deserialize)]
struct ArtistPage {
    items: Vec<ArtistDto>,
}

#[derive(Debug, Deserialize)]
struct ArtistDto {
    #[serde(default)]
    genres: Vec<String>,
}
