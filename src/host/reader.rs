// Library reader: bulk property fetch
//
// One osascript call per property returns that property for every track,
// joined with a delimiter. Columns are zipped back together by position, and
// that position is the id the writer adds tracks by, so every column must
// line up exactly.

use super::{escape_applescript, run_applescript, HostApp};
use crate::error::{AgentError, Result};
use crate::library::{ensure_unique_ids, LibraryId, LibraryReader, TrackRecord};
use async_trait::async_trait;
use tracing::{debug, info};

const DELIMITER: &str = "~~~";

/// Raw property columns as returned by the host, one entry per track
#[derive(Debug, Default)]
pub struct PropertyColumns {
    pub names: Vec<String>,
    pub artists: Vec<String>,
    pub albums: Vec<String>,
    pub genres: Vec<String>,
    pub years: Vec<String>,
    pub ratings: Vec<String>,
    pub plays: Vec<String>,
}

fn fetch_script(app: &str, property: &str) -> String {
    format!(
        r#"tell application "{app}"
    set vals to {property} of every track
    set AppleScript's text item delimiters to "{DELIMITER}"
    set output to vals as string
    set AppleScript's text item delimiters to ""
    return output
end tell"#,
        app = escape_applescript(app),
        property = property,
        DELIMITER = DELIMITER
    )
}

fn split_column(raw: &str) -> Vec<String> {
    raw.split(DELIMITER).map(|v| v.trim().to_string()).collect()
}

/// AppleScript renders absent values as "missing value"
fn text_cell(column: &[String], i: usize) -> Option<String> {
    column
        .get(i)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && *v != "missing value")
        .map(str::to_string)
}

impl PropertyColumns {
    /// Fails when any column's length differs from the name column
    fn check_aligned(&self) -> Result<()> {
        let expected = self.names.len();
        let others = [
            ("artist", &self.artists),
            ("album", &self.albums),
            ("genre", &self.genres),
            ("year", &self.years),
            ("rating", &self.ratings),
            ("play count", &self.plays),
        ];
        for (property, column) in others {
            if column.len() != expected {
                return Err(AgentError::LibraryUnavailable(format!(
                    "Got {} {} values for {} tracks; a field probably contains \"{}\"",
                    column.len(),
                    property,
                    expected,
                    DELIMITER
                )));
            }
        }
        Ok(())
    }
}

/// Zip property columns into records. Tracks without a title are skipped.
pub fn assemble_tracks(columns: &PropertyColumns) -> Result<Vec<TrackRecord>> {
    columns.check_aligned()?;

    let mut tracks = Vec::with_capacity(columns.names.len());

    for (i, name) in columns.names.iter().enumerate() {
        let title = name.trim();
        if title.is_empty() || title == "missing value" {
            continue;
        }

        tracks.push(TrackRecord {
            library_id: LibraryId::from(i + 1),
            title: title.to_string(),
            artist: text_cell(&columns.artists, i).unwrap_or_default(),
            album: text_cell(&columns.albums, i),
            genre: text_cell(&columns.genres, i),
            year: text_cell(&columns.years, i)
                .and_then(|y| y.parse().ok())
                .filter(|&y: &i32| y > 0),
            rating: text_cell(&columns.ratings, i).and_then(|r| r.parse().ok()),
            play_count: text_cell(&columns.plays, i)
                .and_then(|p| p.parse().ok())
                .unwrap_or(0),
        });
    }

    Ok(tracks)
}

impl HostApp {
    async fn fetch_property(&self, property: &str) -> Result<Vec<String>> {
        debug!("Fetching '{}' for every track", property);
        let raw = run_applescript(&fetch_script(self.app_name(), property))
            .await
            .map_err(AgentError::LibraryUnavailable)?;
        Ok(split_column(&raw))
    }
}

#[async_trait]
impl LibraryReader for HostApp {
    async fn read_all_tracks(&self) -> Result<Vec<TrackRecord>> {
        if !self.is_running().await {
            return Err(AgentError::LibraryUnavailable(format!(
                "{} doesn't appear to be running. Please open it and try again.",
                self.app_name()
            )));
        }

        info!("Reading your {} library", self.app_name());
        let columns = PropertyColumns {
            names: self.fetch_property("name").await?,
            artists: self.fetch_property("artist").await?,
            albums: self.fetch_property("album").await?,
            genres: self.fetch_property("genre").await?,
            years: self.fetch_property("year").await?,
            ratings: self.fetch_property("rating").await?,
            plays: self.fetch_property("play count").await?,
        };

        let tracks = assemble_tracks(&columns)?;
        ensure_unique_ids(&tracks)?;
        info!("Found {} tracks", tracks.len());
        Ok(tracks)
    }
}
