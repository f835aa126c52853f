// `inspect` command: show how the library would be sent, without calling the model

use crate::ai::{sample, TrackContextBuilder};
use crate::config::AgentConfig;
use crate::host::HostApp;
use crate::library::{ensure_unique_ids, JsonLibraryReader, LibraryReader};
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Read the library from a JSON export instead of the host app
    #[arg(long)]
    pub library_file: Option<PathBuf>,

    /// Print the first N catalog lines
    #[arg(long, default_value = "0")]
    pub preview: usize,
}

pub async fn run(args: InspectArgs, config: AgentConfig) -> anyhow::Result<()> {
    let reader: Box<dyn LibraryReader> = match &args.library_file {
        Some(path) => Box::new(JsonLibraryReader::new(path)),
        None => Box::new(HostApp::new(config.host_app.clone())),
    };

    let library = reader.read_all_tracks().await?;
    ensure_unique_ids(&library)?;
    let candidates = sample(&library, &config, &mut StdRng::from_entropy())?;
    let catalog = TrackContextBuilder::build_catalog(&candidates, config.max_field_chars);

    println!("Library size:   {}", candidates.library_size);
    println!("Encoding tier:  {}", candidates.tier);
    println!("Candidates:     {}", candidates.len());
    if candidates.top_played > 0 {
        println!("  most played:  {}", candidates.top_played);
        println!("  random:       {}", candidates.len() - candidates.top_played);
    }
    println!(
        "Catalog size:   {} bytes (limit {})",
        catalog.len(),
        config.max_prompt_chars
    );

    if args.preview > 0 {
        println!("\n{}", TrackContextBuilder::columns(candidates.tier));
        for line in catalog.lines().take(args.preview) {
            println!("{}", line);
        }
    }

    Ok(())
}
