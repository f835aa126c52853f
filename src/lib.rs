// Modules
pub mod agent;
pub mod ai;
pub mod commands;
pub mod config;
pub mod error;
pub mod host;
pub mod library;
pub mod playlists;

pub use agent::{CuratedPlaylist, GenerateRequest, GenerationReport, PlaylistAgent};
pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use library::{LibraryId, LibraryReader, TrackRecord};
pub use playlists::PlaylistMaterializer;
