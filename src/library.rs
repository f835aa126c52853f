// Library snapshot types and the reader interface
//
// A snapshot is a plain Vec<TrackRecord> owned by one generation run.
// Readers produce it in a single call; the core never writes back through them.

use crate::error::{AgentError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Opaque identifier understood by the host adapters. Never shown to the model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LibraryId(pub String);

impl fmt::Display for LibraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<usize> for LibraryId {
    fn from(position: usize) -> Self {
        LibraryId(position.to_string())
    }
}

/// One entry in the user's library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub library_id: LibraryId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub play_count: u32,
}

impl TrackRecord {
    pub fn new(library_id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            library_id: LibraryId(library_id.into()),
            title: title.into(),
            artist: artist.into(),
            album: None,
            genre: None,
            year: None,
            rating: None,
            play_count: 0,
        }
    }

    pub fn with_play_count(mut self, play_count: u32) -> Self {
        self.play_count = play_count;
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating);
        self
    }
}

/// Source of the full library snapshot
#[async_trait]
pub trait LibraryReader: Send + Sync {
    /// Read every track. Fails with `LibraryUnavailable` when the host can't be reached.
    async fn read_all_tracks(&self) -> Result<Vec<TrackRecord>>;
}

/// Reject snapshots whose ids collide; every downstream lookup relies on uniqueness.
pub fn ensure_unique_ids(tracks: &[TrackRecord]) -> Result<()> {
    let mut seen = HashSet::with_capacity(tracks.len());
    for track in tracks {
        if !seen.insert(&track.library_id) {
            return Err(AgentError::LibraryUnavailable(format!(
                "Library returned duplicate track id '{}'",
                track.library_id
            )));
        }
    }
    Ok(())
}

/// Fixed in-memory snapshot, used by tests and `--library-file` runs
#[derive(Debug, Clone, Default)]
pub struct InMemoryLibrary {
    tracks: Vec<TrackRecord>,
}

impl InMemoryLibrary {
    pub fn new(tracks: Vec<TrackRecord>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }
}

#[async_trait]
impl LibraryReader for InMemoryLibrary {
    async fn read_all_tracks(&self) -> Result<Vec<TrackRecord>> {
        // Each run gets its own copy of the snapshot
        Ok(self.tracks.clone())
    }
}

/// Reads a snapshot from a JSON export (an array of track records)
pub struct JsonLibraryReader {
    path: PathBuf,
}

impl JsonLibraryReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LibraryReader for JsonLibraryReader {
    async fn read_all_tracks(&self) -> Result<Vec<TrackRecord>> {
        info!("Reading library export from {}", self.path.display());

        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AgentError::LibraryUnavailable(format!(
                "Failed to read library file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let tracks: Vec<TrackRecord> = serde_json::from_str(&raw).map_err(|e| {
            AgentError::LibraryUnavailable(format!(
                "Failed to parse library file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        ensure_unique_ids(&tracks)?;
        debug!("Loaded {} tracks from export", tracks.len());
        Ok(tracks)
    }
}
