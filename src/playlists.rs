// Playlist materializer interface
//
// The agent hands over a finished, ordered list of library ids and a name.
// Implementations own every side effect of writing it to the host.

use crate::error::{AgentError, Result};
use crate::library::LibraryId;
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

#[async_trait]
pub trait PlaylistMaterializer: Send + Sync {
    /// Create `name` holding `tracks` in order. Returns how many tracks were written.
    async fn create_playlist(&self, name: &str, tracks: &[LibraryId]) -> Result<usize>;
}

/// A playlist handed to a [`DryRunMaterializer`]
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedPlaylist {
    pub name: String,
    pub tracks: Vec<LibraryId>,
}

/// Logs playlists instead of writing them and keeps them for inspection
#[derive(Debug, Default)]
pub struct DryRunMaterializer {
    created: Mutex<Vec<CreatedPlaylist>>,
}

impl DryRunMaterializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> Vec<CreatedPlaylist> {
        self.created
            .lock()
            .map(|created| created.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PlaylistMaterializer for DryRunMaterializer {
    async fn create_playlist(&self, name: &str, tracks: &[LibraryId]) -> Result<usize> {
        info!("Dry run: would create '{}' with {} tracks", name, tracks.len());

        let mut created = self
            .created
            .lock()
            .map_err(|e| AgentError::WriteFailure(format!("Dry run log poisoned: {}", e)))?;
        created.push(CreatedPlaylist {
            name: name.to_string(),
            tracks: tracks.to_vec(),
        });

        Ok(tracks.len())
    }
}
