use anyhow::Result;
use clap::{Parser, Subcommand};
use playlist_curator_lib::commands::{self, GenerateArgs, InspectArgs};
use playlist_curator_lib::AgentConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "playlist-curator")]
#[command(about = "Build playlists in your music library from a natural-language request", long_about = None)]
struct Cli {
    /// Path to a config file (defaults to the platform config dir)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the curator for a playlist and create it
    Generate(GenerateArgs),
    /// Show the library size, tier and catalog without calling the model
    Inspect(InspectArgs),
    /// Save the Anthropic API key to the keychain
    SetKey {
        /// The key, starting with sk-ant-
        key: String,
    },
    /// Remove the saved API key
    DeleteKey,
    /// Report whether an API key is configured
    KeyStatus,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let config = AgentConfig::load(cli.config.as_deref())?;

    let outcome = match cli.command {
        Command::Generate(args) => commands::generate::run(args, config).await,
        Command::Inspect(args) => commands::inspect::run(args, config).await,
        Command::SetKey { key } => commands::api_key::set_api_key(&key).map_err(Into::into),
        Command::DeleteKey => commands::api_key::delete_api_key().map_err(Into::into),
        Command::KeyStatus => commands::api_key::api_key_status()
            .map(|_| ())
            .map_err(Into::into),
    };

    if let Err(e) = outcome {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
