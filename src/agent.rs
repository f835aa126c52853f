// Playlist generation entry point
//
// One call to `PlaylistAgent::generate` is one invocation:
// read library -> sample -> build prompt -> ask model -> parse -> reconcile
// -> optional shuffle -> materialize.
// Every piece of data a run touches is owned by that run, so dropping the
// future cancels it without leaving anything half-updated in the agent.

use crate::ai::{
    parse_reply, reconcile, sample, EncodingTier, LlmClient, ResolvedPlaylist, TrackContextBuilder,
};
use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::library::{ensure_unique_ids, LibraryReader};
use crate::playlists::PlaylistMaterializer;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// What the user asked for
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub prompt: String,
    /// Falls back to the configured default count
    pub track_count: Option<usize>,
    /// Overrides the name suggested by the model
    pub playlist_name: Option<String>,
    /// Overrides the configured randomize flag
    pub randomize: Option<bool>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_track_count(mut self, count: usize) -> Self {
        self.track_count = Some(count);
        self
    }

    pub fn with_randomize(mut self, randomize: bool) -> Self {
        self.randomize = Some(randomize);
        self
    }

    pub fn with_playlist_name(mut self, name: impl Into<String>) -> Self {
        self.playlist_name = Some(name.into());
        self
    }
}

/// A reconciled playlist that has not been written yet
#[derive(Debug, Clone, Serialize)]
pub struct CuratedPlaylist {
    pub playlist: ResolvedPlaylist,
    pub tier: EncodingTier,
    pub library_size: usize,
    pub candidates: usize,
    pub top_played: usize,
}

/// Result of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub playlist: ResolvedPlaylist,
    pub tier: EncodingTier,
    pub library_size: usize,
    pub candidates: usize,
    pub top_played: usize,
    /// Tracks the materializer reported as written
    pub written: usize,
}

pub struct PlaylistAgent {
    config: AgentConfig,
    library: Arc<dyn LibraryReader>,
    llm: Arc<dyn LlmClient>,
    materializer: Arc<dyn PlaylistMaterializer>,
}

impl PlaylistAgent {
    pub fn new(
        config: AgentConfig,
        library: Arc<dyn LibraryReader>,
        llm: Arc<dyn LlmClient>,
        materializer: Arc<dyn PlaylistMaterializer>,
    ) -> Self {
        Self {
            config,
            library,
            llm,
            materializer,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run one full generation. `rng` drives sampling and the final shuffle.
    pub async fn generate<R: Rng + Send + ?Sized>(
        &self,
        request: &GenerateRequest,
        rng: &mut R,
    ) -> Result<GenerationReport> {
        let curated = self.curate(request, rng).await?;
        self.write(curated).await
    }

    /// Everything up to the hand-off to the host. Nothing outside the run is touched,
    /// so the returned future can be dropped at any point.
    pub async fn curate<R: Rng + Send + ?Sized>(
        &self,
        request: &GenerateRequest,
        rng: &mut R,
    ) -> Result<CuratedPlaylist> {
        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            return Err(AgentError::Config("Please enter a playlist prompt".to_string()));
        }
        let count = self
            .config
            .check_track_count(request.track_count.unwrap_or(self.config.default_track_count))?;

        let library = self.library.read_all_tracks().await?;
        ensure_unique_ids(&library)?;
        info!("Library snapshot: {} tracks", library.len());

        let candidates = sample(&library, &self.config, rng)?;
        let payload = TrackContextBuilder::build_prompt(&candidates, prompt, count, &self.config)?;

        info!("Asking {} to curate {} tracks", self.config.model_id, count);
        let reply = self
            .llm
            .complete(&payload, &self.config.model_id, self.config.max_output_tokens)
            .await?;
        debug!("Model reply: {} bytes", reply.len());

        let selection = parse_reply(&reply).map_err(|reason| AgentError::MalformedResponse {
            reason,
            library_size: library.len(),
            tier: candidates.tier,
        })?;

        let mut playlist = reconcile(selection, count, &library, &candidates, &self.config)?;
        if let Some(name) = request
            .playlist_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
        {
            playlist.name = name.to_string();
        }
        info!("Curator's note: {}", playlist.rationale);

        if request.randomize.unwrap_or(self.config.randomize) {
            playlist.shuffle(rng);
        }

        Ok(CuratedPlaylist {
            tier: candidates.tier,
            library_size: library.len(),
            candidates: candidates.len(),
            top_played: candidates.top_played,
            playlist,
        })
    }

    /// Hand a curated playlist to the materializer.
    pub async fn write(&self, curated: CuratedPlaylist) -> Result<GenerationReport> {
        let written = self
            .materializer
            .create_playlist(&curated.playlist.name, &curated.playlist.library_ids())
            .await?;

        Ok(GenerationReport {
            playlist: curated.playlist,
            tier: curated.tier,
            library_size: curated.library_size,
            candidates: curated.candidates,
            top_played: curated.top_played,
            written,
        })
    }
}
