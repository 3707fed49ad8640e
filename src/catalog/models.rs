//! Catalog data models.

use serde::{Deserialize, Serialize};

/// Audio feature vector for a track, as reported by the catalog.
///
/// `energy`, `valence` and `danceability` are in `[0, 1]`; `tempo` is BPM.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub energy: f32,
    pub valence: f32,
    pub tempo: f32,
    pub danceability: f32,
}

/// Where a recommended track came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackSource {
    /// Re-ranked from the user's own listening history.
    History,
    /// Newly discovered via generation + catalog resolution.
    Discovery,
}

/// A track as known to the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album: String,
    /// Audio features, when the catalog has analyzed the track.
    pub features: Option<AudioFeatures>,
    /// Catalog popularity, 0-100.
    pub popularity: u8,
    pub source: TrackSource,
}

impl Track {
    /// Lowercased searchable text: name, artists and album joined.
    pub fn matchable_text(&self) -> String {
        let mut text = self.name.to_lowercase();
        for artist in &self.artists {
            text.push(' ');
            text.push_str(&artist.to_lowercase());
        }
        text.push(' ');
        text.push_str(&self.album.to_lowercase());
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matchable_text() {
        let track = Track {
            id: "t1".to_string(),
            name: "Nuvvostanante".to_string(),
            artists: vec!["Sid Sriram".to_string()],
            album: "Telugu Hits".to_string(),
            features: None,
            popularity: 60,
            source: TrackSource::History,
        };
        let text = track.matchable_text();
        assert!(text.contains("nuvvostanante"));
        assert!(text.contains("sid sriram"));
        assert!(text.contains("telugu hits"));
    }
}
