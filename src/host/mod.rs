// Host application adapter (AppleScript over osascript)
//
// Reads the library from, and writes playlists to, a scriptable macOS music
// player. Swinsian is the default; the application name is configurable.
// Track ids are 1-based positions in the host's `every track` list, so they
// are only valid while the host's library is unchanged.

mod reader;
mod writer;

pub use reader::{assemble_tracks, PropertyColumns};
pub use writer::{add_tracks_script, new_playlist_script};

use tokio::process::Command;
use tracing::debug;

/// Tracks added per AppleScript call
pub const ADD_BATCH_SIZE: usize = 50;

/// Run one AppleScript and return its trimmed stdout
pub async fn run_applescript(script: &str) -> Result<String, String> {
    let output = Command::new("osascript")
        .arg("-e")
        .arg(script)
        .output()
        .await
        .map_err(|e| format!("Failed to launch osascript: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("AppleScript error: {}", stderr.trim()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Escape text for interpolation inside an AppleScript string literal
pub fn escape_applescript(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Scriptable music player driven through osascript
#[derive(Debug, Clone)]
pub struct HostApp {
    app_name: String,
    batch_size: usize,
}

impl HostApp {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            batch_size: ADD_BATCH_SIZE,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Ask System Events whether the host process is up
    pub async fn is_running(&self) -> bool {
        let script = format!(
            "tell application \"System Events\" to return (name of processes) contains \"{}\"",
            escape_applescript(&self.app_name)
        );
        match run_applescript(&script).await {
            Ok(out) => out.trim().eq_ignore_ascii_case("true"),
            Err(e) => {
                debug!("Process check failed: {}", e);
                false
            }
        }
    }
}
