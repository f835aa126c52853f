// `generate` command: build one playlist from a prompt

use crate::agent::{GenerateRequest, PlaylistAgent};
use crate::ai::credentials::{CredentialManager, KeySource};
use crate::ai::{ClaudeClient, LlmClient};
use crate::config::AgentConfig;
use crate::host::HostApp;
use crate::library::{JsonLibraryReader, LibraryReader};
use crate::playlists::{DryRunMaterializer, PlaylistMaterializer};
use anyhow::{bail, Context};
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// What kind of playlist you want, e.g. "100 songs that rock and surprise"
    pub prompt: Vec<String>,

    /// Number of songs to ask for
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Playlist name (defaults to the model's suggestion)
    #[arg(long)]
    pub name: Option<String>,

    /// Keep the curator's order instead of shuffling
    #[arg(long, conflicts_with = "randomize")]
    pub no_randomize: bool,

    /// Shuffle the playlist even if the config says not to
    #[arg(long)]
    pub randomize: bool,

    /// Read the library from a JSON export instead of the host app.
    /// Export ids don't map onto host tracks, so this only works with --dry-run.
    #[arg(long, requires = "dry_run")]
    pub library_file: Option<PathBuf>,

    /// Don't write anything to the host app
    #[arg(long)]
    pub dry_run: bool,

    /// Model id to use for this run
    #[arg(long)]
    pub model: Option<String>,
}

impl GenerateArgs {
    fn randomize_override(&self) -> Option<bool> {
        if self.no_randomize {
            Some(false)
        } else if self.randomize {
            Some(true)
        } else {
            None
        }
    }
}

async fn ask_for_prompt() -> anyhow::Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all("🎧 AI Playlist Curator\nWhat kind of playlist would you like?\n> ".as_bytes())
        .await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line.trim().to_string())
}

pub async fn run(args: GenerateArgs, mut config: AgentConfig) -> anyhow::Result<()> {
    let mut prompt = args.prompt.join(" ").trim().to_string();
    if prompt.is_empty() {
        prompt = ask_for_prompt().await?;
    }
    if prompt.is_empty() {
        bail!("No prompt given");
    }

    if let Some(model) = &args.model {
        config.model_id = model.clone();
    }
    let count = config.check_track_count(args.count.unwrap_or(config.default_track_count))?;

    let (api_key, source) = CredentialManager::resolve_api_key()?;
    if source == KeySource::Environment {
        debug!("Using API key from the environment");
    }

    let host = Arc::new(HostApp::new(config.host_app.clone()));
    let library: Arc<dyn LibraryReader> = match &args.library_file {
        Some(path) => {
            let reader = JsonLibraryReader::new(path);
            debug!("Using library export {}", reader.path().display());
            Arc::new(reader)
        }
        None => host.clone(),
    };
    let materializer: Arc<dyn PlaylistMaterializer> = if args.dry_run {
        Arc::new(DryRunMaterializer::new())
    } else {
        host
    };
    let llm: Arc<dyn LlmClient> = Arc::new(ClaudeClient::new(
        api_key,
        config.api_base_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?);

    println!("\n✨ Prompt: \"{}\"", prompt);
    let randomize = args.randomize_override().unwrap_or(config.randomize);
    println!(
        "   Songs: {}  |  Randomise: {}\n",
        count,
        if randomize { "yes" } else { "no" }
    );

    let request = GenerateRequest {
        prompt,
        track_count: Some(count),
        playlist_name: args.name.clone(),
        randomize: Some(randomize),
    };
    let agent = PlaylistAgent::new(config, library, llm, materializer);
    debug!("Model: {}", agent.config().model_id);
    let mut rng = StdRng::from_entropy();

    let curated = tokio::select! {
        result = agent.curate(&request, &mut rng) => match result {
            Ok(curated) => curated,
            Err(e) if e.is_validation_failure() => {
                return Err(anyhow::Error::new(e)
                    .context("The curator's answer couldn't be used; try rephrasing or running again"));
            }
            Err(e) => return Err(anyhow::Error::new(e).context("Playlist generation failed")),
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Cancelled before the playlist was written");
            bail!("Cancelled");
        }
    };

    // The ctrl_c listener above keeps SIGINT from killing the process, so the
    // batched host write always runs to completion.
    if !args.dry_run {
        info!("Writing \"{}\" to {}", curated.playlist.name, agent.config().host_app);
    }
    let report = agent
        .write(curated)
        .await
        .context("Writing the playlist failed")?;

    let playlist = &report.playlist;
    println!("   Curator's note: {}", playlist.rationale);
    if playlist.unresolved > 0 {
        println!(
            "   {} of {} suggested tracks weren't found in your library and were skipped.",
            playlist.unresolved, playlist.references
        );
    }
    if args.dry_run {
        println!("\n📝 Dry run: \"{}\" would contain:", playlist.name);
        for (i, track) in playlist.tracks.iter().enumerate() {
            println!("   {:>3}. {} — {}", i + 1, track.title, track.artist);
        }
    } else {
        println!(
            "\n✅ Playlist \"{}\" created with {} tracks! Enjoy! 🎶",
            playlist.name, report.written
        );
    }

    Ok(())
}
