// Reconciler
//
// Matches the model's references back to concrete tracks in the full library
// (not just the candidates that were sent). Lookup order per reference:
// 1. exact title + artist
// 2. normalized title + artist (sanitized, truncated, case-folded)
// 3. bare catalog index, only when the reference carries no title
// Several matches pick the most-played track, earliest in the snapshot on ties.

use super::context_builder::normalize_key;
use super::response::{ModelSelection, TrackReference};
use super::sampler::Sample;
use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::library::{LibraryId, TrackRecord};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Outcome of looking up one reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Position in the snapshot
    Resolved(usize),
    Ambiguous { chosen: usize, matches: usize },
    Unresolved,
}

/// Final, library-backed playlist for one run
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPlaylist {
    pub name: String,
    pub tracks: Vec<TrackRecord>,
    pub rationale: String,
    /// References in the reply
    pub references: usize,
    pub unresolved: usize,
    pub ambiguous: usize,
    /// References dropped because they repeated an earlier pick
    pub duplicates: usize,
}

impl ResolvedPlaylist {
    pub fn library_ids(&self) -> Vec<LibraryId> {
        self.tracks.iter().map(|t| t.library_id.clone()).collect()
    }

    /// Uniform shuffle; only ever applied right before materializing
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.tracks.shuffle(rng);
    }
}

/// Title/artist lookup tables over the snapshot
pub struct LibraryIndex<'a> {
    library: &'a [TrackRecord],
    exact: HashMap<(String, String), Vec<usize>>,
    normalized: HashMap<(String, String), Vec<usize>>,
    positions: HashMap<&'a LibraryId, usize>,
    max_chars: usize,
}

impl<'a> LibraryIndex<'a> {
    pub fn new(library: &'a [TrackRecord], max_chars: usize) -> Self {
        let mut exact: HashMap<(String, String), Vec<usize>> = HashMap::new();
        let mut normalized: HashMap<(String, String), Vec<usize>> = HashMap::new();
        let mut positions = HashMap::with_capacity(library.len());

        for (pos, track) in library.iter().enumerate() {
            exact
                .entry((track.title.clone(), track.artist.clone()))
                .or_default()
                .push(pos);
            normalized
                .entry((
                    normalize_key(&track.title, max_chars),
                    normalize_key(&track.artist, max_chars),
                ))
                .or_default()
                .push(pos);
            positions.insert(&track.library_id, pos);
        }

        Self {
            library,
            exact,
            normalized,
            positions,
            max_chars,
        }
    }

    pub fn resolve(&self, reference: &TrackReference, sample: &Sample<'_>) -> Resolution {
        if !reference.has_name() {
            return reference
                .index
                .and_then(|i| sample.get(i))
                .and_then(|track| self.positions.get(&track.library_id))
                .map_or(Resolution::Unresolved, |&pos| Resolution::Resolved(pos));
        }

        if let Some(matches) = self
            .exact
            .get(&(reference.title.clone(), reference.artist.clone()))
        {
            return self.pick(matches);
        }

        let key = (
            normalize_key(&reference.title, self.max_chars),
            normalize_key(&reference.artist, self.max_chars),
        );
        match self.normalized.get(&key) {
            Some(matches) => self.pick(matches),
            None => Resolution::Unresolved,
        }
    }

    fn pick(&self, matches: &[usize]) -> Resolution {
        match matches {
            [] => Resolution::Unresolved,
            [only] => Resolution::Resolved(*only),
            _ => {
                // Positions are in snapshot order, so keeping the first maximum breaks ties
                let mut chosen = matches[0];
                for &pos in &matches[1..] {
                    if self.library[pos].play_count > self.library[chosen].play_count {
                        chosen = pos;
                    }
                }
                Resolution::Ambiguous {
                    chosen,
                    matches: matches.len(),
                }
            }
        }
    }
}

/// Resolve every reference and apply the unresolved-share policy.
///
/// The share is measured against `requested`, or against the reply's own
/// length when the model sent back more references than were asked for.
pub fn reconcile(
    selection: ModelSelection,
    requested: usize,
    library: &[TrackRecord],
    sample: &Sample<'_>,
    config: &AgentConfig,
) -> Result<ResolvedPlaylist> {
    let index = LibraryIndex::new(library, config.max_field_chars);
    let references = selection.references.len();

    let mut tracks = Vec::with_capacity(references);
    let mut seen = HashSet::with_capacity(references);
    let mut unresolved = 0;
    let mut ambiguous = 0;
    let mut duplicates = 0;

    for reference in &selection.references {
        let pos = match index.resolve(reference, sample) {
            Resolution::Resolved(pos) => pos,
            Resolution::Ambiguous { chosen, matches } => {
                debug!(
                    "'{}' by '{}' matched {} tracks, using the most played",
                    reference.title, reference.artist, matches
                );
                ambiguous += 1;
                chosen
            }
            Resolution::Unresolved => {
                debug!(
                    "No library match for {:?} '{}' by '{}'",
                    reference.index, reference.title, reference.artist
                );
                unresolved += 1;
                continue;
            }
        };

        if !seen.insert(pos) {
            duplicates += 1;
            continue;
        }
        tracks.push(library[pos].clone());
    }

    let denominator = requested.max(references).max(1);
    let unresolved_share = unresolved as f64 / denominator as f64;
    if unresolved_share > config.max_unresolved_fraction || tracks.is_empty() {
        warn!(
            "{} of {} requested tracks unresolved, refusing to build playlist",
            unresolved, denominator
        );
        return Err(AgentError::ResolutionFailure {
            resolved: tracks.len(),
            unresolved,
            duplicates,
            references,
            library_size: library.len(),
            tier: sample.tier,
        });
    }

    info!(
        "Resolved {} tracks ({} unresolved, {} ambiguous, {} duplicates)",
        tracks.len(),
        unresolved,
        ambiguous,
        duplicates
    );

    let name = selection
        .playlist_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| config.default_playlist_name.clone());

    Ok(ResolvedPlaylist {
        name,
        tracks,
        rationale: selection.rationale,
        references,
        unresolved,
        ambiguous,
        duplicates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::sampler::EncodingTier;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn library() -> Vec<TrackRecord> {
        vec![
            TrackRecord::new("1", "Teardrop", "Massive Attack").with_play_count(10),
            TrackRecord::new("2", "Glory Box", "Portishead").with_play_count(3),
            TrackRecord::new("3", "Roads", "Portishead").with_play_count(7),
            TrackRecord::new("4", "Roads", "Portishead").with_play_count(12),
            TrackRecord::new("5", "Unfinished Sympathy", "Massive Attack"),
            TrackRecord::new("6", "Dup", "Twin").with_play_count(4),
            TrackRecord::new("7", "Dup", "Twin").with_play_count(4),
        ]
    }

    fn sample_of(tracks: &[TrackRecord]) -> Sample<'_> {
        Sample {
            tier: EncodingTier::Full,
            candidates: tracks.iter().collect(),
            library_size: tracks.len(),
            top_played: 0,
        }
    }

    fn selection(refs: Vec<TrackReference>) -> ModelSelection {
        ModelSelection {
            playlist_name: Some("Test".to_string()),
            references: refs,
            rationale: "because".to_string(),
        }
    }

    #[test]
    fn test_exact_single_match() {
        let lib = library();
        let sample = sample_of(&lib);
        let index = LibraryIndex::new(&lib, 120);

        let r = index.resolve(&TrackReference::named("Glory Box", "Portishead"), &sample);
        assert_eq!(r, Resolution::Resolved(1));
    }

    #[test]
    fn test_normalized_fallback() {
        let lib = library();
        let sample = sample_of(&lib);
        let index = LibraryIndex::new(&lib, 120);

        let r = index.resolve(&TrackReference::named("  glory   BOX", "portishead "), &sample);
        assert_eq!(r, Resolution::Resolved(1));
    }

    #[test]
    fn test_ambiguous_picks_most_played() {
        let lib = library();
        let sample = sample_of(&lib);
        let index = LibraryIndex::new(&lib, 120);

        let r = index.resolve(&TrackReference::named("Roads", "Portishead"), &sample);
        assert_eq!(r, Resolution::Ambiguous { chosen: 3, matches: 2 });
    }

    #[test]
    fn test_ambiguous_tie_keeps_snapshot_order() {
        let lib = library();
        let sample = sample_of(&lib);
        let index = LibraryIndex::new(&lib, 120);

        let r = index.resolve(&TrackReference::named("Dup", "Twin"), &sample);
        assert_eq!(r, Resolution::Ambiguous { chosen: 5, matches: 2 });
    }

    #[test]
    fn test_unknown_reference_is_unresolved() {
        let lib = library();
        let sample = sample_of(&lib);
        let index = LibraryIndex::new(&lib, 120);

        let r = index.resolve(&TrackReference::named("Karma Police", "Radiohead"), &sample);
        assert_eq!(r, Resolution::Unresolved);
    }

    #[test]
    fn test_index_only_reference_uses_candidate() {
        let lib = library();
        // Candidate order differs from snapshot order
        let sample = Sample {
            tier: EncodingTier::Sampled,
            candidates: vec![&lib[4], &lib[0]],
            library_size: lib.len(),
            top_played: 1,
        };
        let index = LibraryIndex::new(&lib, 120);

        let by_index = TrackReference {
            index: Some(1),
            title: String::new(),
            artist: String::new(),
        };
        assert_eq!(index.resolve(&by_index, &sample), Resolution::Resolved(0));

        let out_of_range = TrackReference {
            index: Some(9),
            ..by_index
        };
        assert_eq!(index.resolve(&out_of_range, &sample), Resolution::Unresolved);
    }

    #[test]
    fn test_match_against_truncated_and_piped_fields() {
        let long_title = "x".repeat(300);
        let lib = vec![
            TrackRecord::new("1", long_title.clone(), "Band"),
            TrackRecord::new("2", "Either|Or", "Band"),
        ];
        let sample = sample_of(&lib);
        let index = LibraryIndex::new(&lib, 120);

        let echoed = TrackReference::named("x".repeat(120), "Band");
        assert_eq!(index.resolve(&echoed, &sample), Resolution::Resolved(0));
        let echoed = TrackReference::named("Either/Or", "Band");
        assert_eq!(index.resolve(&echoed, &sample), Resolution::Resolved(1));
    }

    #[test]
    fn test_reconcile_preserves_model_order_and_counts() {
        let lib = library();
        let sample = sample_of(&lib);
        let refs = vec![
            TrackReference::named("Unfinished Sympathy", "Massive Attack"),
            TrackReference::named("Roads", "Portishead"),
            TrackReference::named("Teardrop", "Massive Attack"),
            TrackReference::named("Teardrop", "Massive Attack"),
            TrackReference::named("Nope", "Nobody"),
        ];

        let playlist = reconcile(selection(refs), 5, &lib, &sample, &AgentConfig::default()).unwrap();
        let ids: Vec<&str> = playlist.tracks.iter().map(|t| t.library_id.0.as_str()).collect();

        assert_eq!(ids, vec!["5", "4", "1"]);
        assert_eq!(playlist.references, 5);
        assert_eq!(playlist.unresolved, 1);
        assert_eq!(playlist.ambiguous, 1);
        assert_eq!(playlist.duplicates, 1);
        assert_eq!(playlist.name, "Test");
        assert_eq!(playlist.rationale, "because");
    }

    #[test]
    fn test_majority_unresolved_fails() {
        let lib = library();
        let sample = sample_of(&lib);
        let refs = vec![
            TrackReference::named("Teardrop", "Massive Attack"),
            TrackReference::named("Nope", "A"),
            TrackReference::named("Nope", "B"),
        ];

        let err = reconcile(selection(refs), 3, &lib, &sample, &AgentConfig::default()).unwrap_err();
        match err {
            AgentError::ResolutionFailure {
                resolved,
                unresolved,
                duplicates,
                references,
                library_size,
                tier,
            } => {
                assert_eq!((resolved, unresolved, duplicates, references), (1, 2, 0, 3));
                assert_eq!(library_size, 7);
                assert_eq!(tier, EncodingTier::Full);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_exactly_half_unresolved_is_allowed() {
        let lib = library();
        let sample = sample_of(&lib);
        let refs = vec![
            TrackReference::named("Teardrop", "Massive Attack"),
            TrackReference::named("Nope", "A"),
        ];

        let playlist = reconcile(selection(refs), 2, &lib, &sample, &AgentConfig::default()).unwrap();
        assert_eq!(playlist.tracks.len(), 1);
        assert_eq!(playlist.unresolved, 1);
    }

    #[test]
    fn test_unresolved_share_counts_against_requested_total() {
        let lib = library();
        let sample = sample_of(&lib);
        let mut refs = vec![
            TrackReference::named("Teardrop", "Massive Attack"),
            TrackReference::named("Glory Box", "Portishead"),
            TrackReference::named("Unfinished Sympathy", "Massive Attack"),
            TrackReference::named("Roads", "Portishead"),
        ];
        for i in 0..6 {
            refs.push(TrackReference::named(format!("Ghost {}", i), "Nobody"));
        }

        // 6 of 20 requested is under half, even though the reply itself is mostly unknown
        let playlist =
            reconcile(selection(refs.clone()), 20, &lib, &sample, &AgentConfig::default()).unwrap();
        assert_eq!(playlist.tracks.len(), 4);
        assert_eq!(playlist.unresolved, 6);
        assert_eq!(playlist.references, 10);

        let err = reconcile(selection(refs), 10, &lib, &sample, &AgentConfig::default()).unwrap_err();
        assert!(matches!(err, AgentError::ResolutionFailure { unresolved: 6, references: 10, .. }));
    }

    #[test]
    fn test_failure_reports_distinct_tracks_not_duplicates() {
        let lib = library();
        let sample = sample_of(&lib);
        let refs = vec![
            TrackReference::named("Teardrop", "Massive Attack"),
            TrackReference::named("Teardrop", "Massive Attack"),
            TrackReference::named("Teardrop", "Massive Attack"),
            TrackReference::named("Nope", "A"),
            TrackReference::named("Nope", "B"),
            TrackReference::named("Nope", "C"),
            TrackReference::named("Nope", "D"),
        ];

        let err = reconcile(selection(refs), 7, &lib, &sample, &AgentConfig::default()).unwrap_err();
        match err {
            AgentError::ResolutionFailure {
                resolved,
                unresolved,
                duplicates,
                ..
            } => assert_eq!((resolved, unresolved, duplicates), (1, 4, 2)),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_blank_name_falls_back_to_default() {
        let lib = library();
        let sample = sample_of(&lib);
        let mut sel = selection(vec![TrackReference::named("Teardrop", "Massive Attack")]);
        sel.playlist_name = Some("   ".to_string());

        let playlist = reconcile(sel, 1, &lib, &sample, &AgentConfig::default()).unwrap();
        assert_eq!(playlist.name, "AI Playlist");
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let lib: Vec<TrackRecord> = (0..30)
            .map(|i| TrackRecord::new(i.to_string(), format!("T{}", i), "A"))
            .collect();
        let sample = sample_of(&lib);
        let refs = lib
            .iter()
            .map(|t| TrackReference::named(t.title.clone(), t.artist.clone()))
            .collect();
        let mut playlist = reconcile(selection(refs), 30, &lib, &sample, &AgentConfig::default()).unwrap();
        let before = playlist.library_ids();

        playlist.shuffle(&mut StdRng::seed_from_u64(8));
        let after = playlist.library_ids();

        assert_ne!(before, after);
        let mut sorted_before = before.clone();
        let mut sorted_after = after.clone();
        sorted_before.sort_by(|a, b| a.0.cmp(&b.0));
        sorted_after.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(sorted_before, sorted_after);
    }
}
