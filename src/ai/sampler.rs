// Library sampler
//
// Reduces a library snapshot to a candidate set small enough to describe to the
// model in one request. The tier is picked from the library size alone:
// - full:    whole library, every field
// - compact: whole library, title and artist only
// - sampled: most-played cut plus a uniform random draw from the rest, compact fields

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::library::TrackRecord;
use rand::seq::index;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingTier {
    Full,
    Compact,
    Sampled,
}

impl EncodingTier {
    pub fn for_library_size(size: usize, config: &AgentConfig) -> Self {
        if size <= config.max_tracks_full {
            EncodingTier::Full
        } else if size <= config.max_tracks_compact {
            EncodingTier::Compact
        } else {
            EncodingTier::Sampled
        }
    }

    /// Whether album/genre/year/rating/plays are serialized
    pub fn includes_metadata(self) -> bool {
        matches!(self, EncodingTier::Full)
    }
}

impl fmt::Display for EncodingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingTier::Full => write!(f, "full"),
            EncodingTier::Compact => write!(f, "compact"),
            EncodingTier::Sampled => write!(f, "sampled"),
        }
    }
}

/// Candidate set chosen for one request, borrowing from the snapshot
#[derive(Debug)]
pub struct Sample<'a> {
    pub tier: EncodingTier,
    pub candidates: Vec<&'a TrackRecord>,
    pub library_size: usize,
    /// How many leading candidates came from the most-played cut
    pub top_played: usize,
}

impl<'a> Sample<'a> {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidate at a catalog index, as numbered in the prompt
    pub fn get(&self, catalog_index: usize) -> Option<&'a TrackRecord> {
        self.candidates.get(catalog_index).copied()
    }
}

/// Pick the candidate set and tier for `library`.
pub fn sample<'a, R: Rng + ?Sized>(
    library: &'a [TrackRecord],
    config: &AgentConfig,
    rng: &mut R,
) -> Result<Sample<'a>> {
    let size = library.len();
    if size == 0 {
        return Err(AgentError::EmptyLibrary);
    }

    let tier = EncodingTier::for_library_size(size, config);
    let sample = match tier {
        EncodingTier::Full | EncodingTier::Compact => {
            info!("Sending {} catalog for {} tracks", tier, size);
            Sample {
                tier,
                candidates: library.iter().collect(),
                library_size: size,
                top_played: 0,
            }
        }
        EncodingTier::Sampled => {
            let candidates = most_played_plus_random(library, config, rng);
            let top_played = config.top_played_sample.min(size);
            info!(
                "Sampling {} of {} tracks ({} most played, {} random)",
                candidates.len(),
                size,
                top_played,
                candidates.len() - top_played
            );
            Sample {
                tier,
                candidates,
                library_size: size,
                top_played,
            }
        }
    };

    Ok(sample)
}

fn most_played_plus_random<'a, R: Rng + ?Sized>(
    library: &'a [TrackRecord],
    config: &AgentConfig,
    rng: &mut R,
) -> Vec<&'a TrackRecord> {
    // Stable sort keeps snapshot order among equal play counts
    let mut by_plays: Vec<usize> = (0..library.len()).collect();
    by_plays.sort_by(|&a, &b| library[b].play_count.cmp(&library[a].play_count));

    let top_len = config.top_played_sample.min(library.len());
    let mut taken = vec![false; library.len()];
    let mut candidates = Vec::with_capacity(top_len + config.random_sample);
    for &i in &by_plays[..top_len] {
        taken[i] = true;
        candidates.push(&library[i]);
    }

    let rest: Vec<usize> = (0..library.len()).filter(|&i| !taken[i]).collect();
    if rest.len() <= config.random_sample {
        debug!("Remaining pool of {} fits entirely", rest.len());
        candidates.extend(rest.iter().map(|&i| &library[i]));
    } else {
        let picks = index::sample(rng, rest.len(), config.random_sample);
        candidates.extend(picks.iter().map(|p| &library[rest[p]]));
    }

    candidates
}
