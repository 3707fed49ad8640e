//! Track and feature fixture builders.

use moodify_server::catalog::{AudioFeatures, Track, TrackSource};

pub fn feats(energy: f32, valence: f32, tempo: f32) -> AudioFeatures {
    AudioFeatures {
        energy,
        valence,
        tempo,
        danceability: 0.5,
    }
}

pub fn history_track(
    id: &str,
    name: &str,
    artist: &str,
    popularity: u8,
    features: Option<AudioFeatures>,
) -> Track {
    Track {
        id: id.to_string(),
        name: name.to_string(),
        artists: vec![artist.to_string()],
        album: format!("{} - Album", artist),
        features,
        popularity,
        source: TrackSource::History,
    }
}

pub fn search_track(id: &str, name: &str, artist: &str, popularity: u8) -> Track {
    Track {
        id: id.to_string(),
        name: name.to_string(),
        artists: vec![artist.to_string()],
        album: format!("{} - Album", artist),
        features: None,
        popularity,
        source: TrackSource::Discovery,
    }
}
