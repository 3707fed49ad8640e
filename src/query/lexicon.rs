//! Curated genre/mood/language lexicon and audio-feature targets.
//!
//! Keyword tables map free-text terms onto canonical genre and mood tags,
//! and each tag onto the audio-feature region the catalog uses for it.
//! Matching is case-insensitive substring matching over the normalized
//! query, so "death metal" matches both "metal" phrases and single tokens.

use serde::{Deserialize, Serialize};

/// Target intervals for track audio features.
///
/// `energy`, `valence` and `danceability` are `[0, 1]` intervals; `tempo`
/// is a BPM interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRange {
    pub energy: (f32, f32),
    pub valence: (f32, f32),
    pub tempo: (f32, f32),
    pub danceability: (f32, f32),
}

impl FeatureRange {
    /// Mid-range targets used when nothing about the query is known.
    pub fn neutral() -> Self {
        Self {
            energy: (0.3, 0.7),
            valence: (0.3, 0.7),
            tempo: (80.0, 140.0),
            danceability: (0.3, 0.7),
        }
    }

    /// A range centered on point estimates, used for model-classified
    /// queries that return single values instead of intervals.
    pub fn around(energy: f32, valence: f32) -> Self {
        let clamp01 = |v: f32| v.clamp(0.0, 1.0);
        Self {
            energy: (clamp01(energy - 0.15), clamp01(energy + 0.15)),
            valence: (clamp01(valence - 0.15), clamp01(valence + 0.15)),
            tempo: (80.0, 140.0),
            danceability: (0.3, 0.7),
        }
    }
}

/// One lexicon entry: a canonical tag and the query terms that select it.
pub struct LexiconEntry {
    pub tag: &'static str,
    pub keywords: &'static [&'static str],
}

/// Genre vocabulary.
pub const GENRES: &[LexiconEntry] = &[
    LexiconEntry {
        tag: "metal",
        keywords: &["metal", "heavy metal", "death metal", "thrash", "power metal"],
    },
    LexiconEntry {
        tag: "rock",
        keywords: &["rock", "hard rock", "classic rock", "alternative", "indie rock"],
    },
    LexiconEntry {
        tag: "electronic",
        keywords: &["electronic", "edm", "house", "techno", "trance", "dubstep"],
    },
    LexiconEntry {
        tag: "hip-hop",
        keywords: &["hip hop", "hip-hop", "rap", "trap", "r&b", "soul"],
    },
    LexiconEntry {
        tag: "pop",
        keywords: &["pop", "synthpop", "indie pop"],
    },
    LexiconEntry {
        tag: "jazz",
        keywords: &["jazz", "bebop", "smooth jazz", "fusion"],
    },
    LexiconEntry {
        tag: "classical",
        keywords: &["classical", "orchestral", "symphony"],
    },
    LexiconEntry {
        tag: "country",
        keywords: &["country", "folk", "bluegrass"],
    },
    LexiconEntry {
        tag: "reggae",
        keywords: &["reggae", "dub", "ska"],
    },
    LexiconEntry {
        tag: "punk",
        keywords: &["punk", "hardcore", "emo"],
    },
    LexiconEntry {
        tag: "lo-fi",
        keywords: &["lofi", "lo-fi", "ambient", "study beats"],
    },
];

/// Mood vocabulary.
pub const MOODS: &[LexiconEntry] = &[
    LexiconEntry {
        tag: "happy",
        keywords: &["happy", "upbeat", "cheerful", "positive", "joyful"],
    },
    LexiconEntry {
        tag: "sad",
        keywords: &["sad", "melancholy", "heartbreak", "emotional", "depressing"],
    },
    LexiconEntry {
        tag: "chill",
        keywords: &["chill", "relaxing", "calm", "peaceful", "mellow"],
    },
    LexiconEntry {
        tag: "romantic",
        keywords: &["romantic", "love songs", "intimate", "passionate"],
    },
    LexiconEntry {
        tag: "energetic",
        keywords: &["energetic", "high energy", "intense", "powerful", "hype"],
    },
    LexiconEntry {
        tag: "party",
        keywords: &["party", "dance", "celebration", "festive", "club"],
    },
    LexiconEntry {
        tag: "workout",
        keywords: &["workout", "gym", "running", "cardio", "pump up"],
    },
    LexiconEntry {
        tag: "focus",
        keywords: &["focus", "concentration", "productivity", "deep work"],
    },
    LexiconEntry {
        tag: "sleep",
        keywords: &["sleep", "bedtime", "soothing", "lullaby"],
    },
    LexiconEntry {
        tag: "nostalgic",
        keywords: &["nostalgic", "retro", "vintage", "throwback", "old", "classics"],
    },
];

/// Language/region vocabulary. Matched tags ride in the genre set, since
/// the catalog's genre taxonomy carries language/regional tags, and they
/// drive explicit regional emphasis in discovery prompts.
pub const LANGUAGES: &[LexiconEntry] = &[
    LexiconEntry {
        tag: "telugu",
        keywords: &["telugu", "tollywood", "andhra"],
    },
    LexiconEntry {
        tag: "hindi",
        keywords: &["hindi", "bollywood", "desi"],
    },
    LexiconEntry {
        tag: "tamil",
        keywords: &["tamil", "kollywood", "chennai"],
    },
    LexiconEntry {
        tag: "kannada",
        keywords: &["kannada", "sandalwood", "karnataka"],
    },
    LexiconEntry {
        tag: "punjabi",
        keywords: &["punjabi", "bhangra"],
    },
    LexiconEntry {
        tag: "spanish",
        keywords: &["spanish", "latino", "latin", "reggaeton"],
    },
    LexiconEntry {
        tag: "korean",
        keywords: &["korean", "k-pop", "kpop"],
    },
    LexiconEntry {
        tag: "japanese",
        keywords: &["japanese", "j-pop", "anime"],
    },
    LexiconEntry {
        tag: "french",
        keywords: &["french", "chanson"],
    },
];

/// Audio-feature targets per canonical tag.
///
/// Values were tuned against the catalog's feature distributions; they are
/// lookup defaults, not invariants.
pub fn target_for(tag: &str) -> Option<FeatureRange> {
    let range = match tag {
        "metal" => FeatureRange {
            energy: (0.8, 1.0),
            valence: (0.2, 0.6),
            tempo: (120.0, 200.0),
            danceability: (0.2, 0.5),
        },
        "rock" => FeatureRange {
            energy: (0.7, 0.9),
            valence: (0.3, 0.7),
            tempo: (100.0, 160.0),
            danceability: (0.3, 0.6),
        },
        "electronic" => FeatureRange {
            energy: (0.6, 0.9),
            valence: (0.4, 0.8),
            tempo: (120.0, 140.0),
            danceability: (0.6, 0.9),
        },
        "hip-hop" => FeatureRange {
            energy: (0.5, 0.8),
            valence: (0.3, 0.7),
            tempo: (80.0, 120.0),
            danceability: (0.6, 0.9),
        },
        "pop" => FeatureRange {
            energy: (0.5, 0.8),
            valence: (0.4, 0.8),
            tempo: (100.0, 140.0),
            danceability: (0.5, 0.8),
        },
        "jazz" => FeatureRange {
            energy: (0.3, 0.6),
            valence: (0.4, 0.7),
            tempo: (60.0, 120.0),
            danceability: (0.3, 0.6),
        },
        "classical" => FeatureRange {
            energy: (0.2, 0.6),
            valence: (0.3, 0.6),
            tempo: (60.0, 140.0),
            danceability: (0.1, 0.4),
        },
        "country" => FeatureRange {
            energy: (0.4, 0.7),
            valence: (0.4, 0.7),
            tempo: (80.0, 120.0),
            danceability: (0.4, 0.7),
        },
        "reggae" => FeatureRange {
            energy: (0.4, 0.6),
            valence: (0.5, 0.8),
            tempo: (80.0, 100.0),
            danceability: (0.6, 0.8),
        },
        "punk" => FeatureRange {
            energy: (0.8, 1.0),
            valence: (0.3, 0.6),
            tempo: (140.0, 180.0),
            danceability: (0.3, 0.5),
        },
        "lo-fi" => FeatureRange {
            energy: (0.2, 0.4),
            valence: (0.3, 0.6),
            tempo: (60.0, 90.0),
            danceability: (0.4, 0.6),
        },
        "happy" => FeatureRange {
            energy: (0.6, 0.9),
            valence: (0.7, 1.0),
            tempo: (100.0, 140.0),
            danceability: (0.5, 0.9),
        },
        "sad" => FeatureRange {
            energy: (0.2, 0.4),
            valence: (0.1, 0.3),
            tempo: (60.0, 90.0),
            danceability: (0.2, 0.5),
        },
        "chill" => FeatureRange {
            energy: (0.2, 0.5),
            valence: (0.3, 0.7),
            tempo: (60.0, 100.0),
            danceability: (0.3, 0.6),
        },
        "romantic" => FeatureRange {
            energy: (0.3, 0.6),
            valence: (0.4, 0.7),
            tempo: (70.0, 110.0),
            danceability: (0.4, 0.7),
        },
        "energetic" => FeatureRange {
            energy: (0.8, 1.0),
            valence: (0.6, 0.9),
            tempo: (130.0, 180.0),
            danceability: (0.6, 0.9),
        },
        "party" => FeatureRange {
            energy: (0.8, 1.0),
            valence: (0.7, 1.0),
            tempo: (120.0, 140.0),
            danceability: (0.7, 1.0),
        },
        "workout" => FeatureRange {
            energy: (0.8, 1.0),
            valence: (0.6, 0.9),
            tempo: (120.0, 160.0),
            danceability: (0.6, 0.9),
        },
        "focus" => FeatureRange {
            energy: (0.4, 0.7),
            valence: (0.4, 0.7),
            tempo: (80.0, 120.0),
            danceability: (0.3, 0.6),
        },
        "sleep" => FeatureRange {
            energy: (0.1, 0.3),
            valence: (0.2, 0.5),
            tempo: (50.0, 80.0),
            danceability: (0.1, 0.4),
        },
        "nostalgic" => FeatureRange {
            energy: (0.4, 0.7),
            valence: (0.4, 0.7),
            tempo: (80.0, 120.0),
            danceability: (0.4, 0.7),
        },
        _ => return None,
    };
    Some(range)
}

/// Collect the tags whose keywords appear in the normalized query.
pub fn matching_tags(normalized: &str, entries: &[LexiconEntry]) -> Vec<String> {
    entries
        .iter()
        .filter(|entry| entry.keywords.iter().any(|kw| normalized.contains(kw)))
        .map(|entry| entry.tag.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_matching() {
        let tags = matching_tags("some heavy metal please", GENRES);
        assert_eq!(tags, vec!["metal"]);
    }

    #[test]
    fn test_mood_matching_multiple() {
        let tags = matching_tags("chill relaxing old songs", MOODS);
        assert!(tags.contains(&"chill".to_string()));
        assert!(tags.contains(&"nostalgic".to_string()));
    }

    #[test]
    fn test_language_matching() {
        let tags = matching_tags("chill old telugu songs", LANGUAGES);
        assert_eq!(tags, vec!["telugu"]);
    }

    #[test]
    fn test_every_tag_has_a_target() {
        for entry in GENRES.iter().chain(MOODS.iter()) {
            assert!(
                target_for(entry.tag).is_some(),
                "missing feature target for tag {}",
                entry.tag
            );
        }
    }

    #[test]
    fn test_targets_are_well_formed() {
        for entry in GENRES.iter().chain(MOODS.iter()) {
            let range = target_for(entry.tag).unwrap();
            for (lo, hi) in [range.energy, range.valence, range.danceability] {
                assert!((0.0..=1.0).contains(&lo) && (0.0..=1.0).contains(&hi) && lo <= hi);
            }
            assert!(range.tempo.0 <= range.tempo.1);
        }
    }
}
