// Playlist writer
//
// The host can't create playlists over AppleScript, so the playlist is made
// through File > New Playlist with UI scripting, then filled in batches with
// the host's `add tracks` command.

use super::{escape_applescript, run_applescript, HostApp};
use crate::error::{AgentError, Result};
use crate::library::LibraryId;
use crate::playlists::PlaylistMaterializer;
use async_trait::async_trait;
use tracing::info;

pub fn new_playlist_script(app: &str, name: &str) -> String {
    let app = escape_applescript(app);
    format!(
        r#"tell application "{app}" to activate
delay 0.5
tell application "System Events"
    tell process "{app}"
        click menu item "New Playlist" of menu "File" of menu bar 1
        delay 0.5
        keystroke "{name}"
        key code 36
    end tell
end tell"#,
        app = app,
        name = escape_applescript(name)
    )
}

/// Append `batch` to playlist `name`. Ids are 1-based positions in `every track`.
pub fn add_tracks_script(app: &str, name: &str, batch: &[LibraryId]) -> Result<String> {
    let mut items = Vec::with_capacity(batch.len());
    for id in batch {
        let position: usize = id.0.parse().map_err(|_| {
            AgentError::WriteFailure(format!("Track id '{}' is not a library position", id))
        })?;
        items.push(format!("item {} of allTracks", position));
    }

    Ok(format!(
        r#"tell application "{app}"
    set allTracks to every track
    add tracks {{{items}}} to normal playlist "{name}"
end tell"#,
        app = escape_applescript(app),
        items = items.join(", "),
        name = escape_applescript(name)
    ))
}

#[async_trait]
impl PlaylistMaterializer for HostApp {
    async fn create_playlist(&self, name: &str, tracks: &[LibraryId]) -> Result<usize> {
        if !self.is_running().await {
            return Err(AgentError::TargetAppUnavailable(format!(
                "{} isn't running. Please open it and try again.",
                self.app_name()
            )));
        }

        // Build every batch first so a bad id fails before anything is written
        let scripts = tracks
            .chunks(self.batch_size)
            .map(|batch| add_tracks_script(self.app_name(), name, batch))
            .collect::<Result<Vec<_>>>()?;

        info!("Creating playlist '{}' with {} tracks", name, tracks.len());
        run_applescript(&new_playlist_script(self.app_name(), name))
            .await
            .map_err(|e| AgentError::TargetAppUnavailable(format!("Could not create playlist: {}", e)))?;

        let mut added = 0;
        for (script, batch) in scripts.iter().zip(tracks.chunks(self.batch_size)) {
            run_applescript(script).await.map_err(|e| {
                AgentError::WriteFailure(format!("After {} of {} tracks: {}", added, tracks.len(), e))
            })?;
            added += batch.len();
            info!("Added {}/{} tracks", added, tracks.len());
        }

        Ok(added)
    }
}
