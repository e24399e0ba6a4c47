//! Replay driver for the tale kernel.
//!
//! Plays a scripted game through a real [`GameSession`]: the script stands
//! in for the narrator, everything else (dice, combat, sanitizing, saves)
//! is the kernel as it runs in play.
//!
//! ```bash
//! cargo run -p tale -- demos/ambush.json --seed 7 --save ambush_save.json
//! ```

mod replay;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tale_core::content::sample_fighter;
use tale_core::{
    Catalog, Character, ContentTables, GameSession, GameState, KernelConfig, SavedGame,
    ScriptedNarrator,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "tale", about = "Replay a scripted adventure through the rules kernel")]
struct Args {
    /// JSON list of scripted turns.
    script: PathBuf,

    /// Character sheet as JSON. A sample fighter is used when omitted.
    #[arg(long)]
    character: Option<PathBuf>,

    /// Resume from a save instead of starting fresh.
    #[arg(long, conflicts_with = "character")]
    resume: Option<PathBuf>,

    /// Kernel configuration as TOML.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra catalog content as JSON, merged over the standard catalog.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Seed for the dice.
    #[arg(long)]
    seed: Option<u64>,

    /// Starting location for a new game.
    #[arg(long, default_value = "The Crossroads Inn")]
    location: String,

    /// Write a save here when the replay ends.
    #[arg(long)]
    save: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tale=info,tale_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path).await?,
        None => KernelConfig::default(),
    };
    let tables: Arc<dyn ContentTables> = Arc::new(load_catalog(args.catalog.as_deref()).await?);
    let turns = replay::load_script(&args.script).await?;
    let narrator = ScriptedNarrator::new(turns.iter().map(replay::ScriptTurn::reply));

    let session = match &args.resume {
        Some(path) => {
            let saved = SavedGame::load(path)
                .await
                .with_context(|| format!("loading save {}", path.display()))?;
            info!(path = %path.display(), turn = saved.state.turn, "resuming saved game");
            GameSession::resume(saved, narrator, tables)
        }
        None => {
            let character = match &args.character {
                Some(path) => load_character(path).await?,
                None => sample_fighter("Wanderer"),
            };
            GameSession::new(GameState::new(character, args.location.clone()), narrator, tables)
        }
    };
    let mut session = session.with_config(config);
    if let Some(seed) = args.seed {
        session = session.with_rolls(StdRng::seed_from_u64(seed));
    }

    replay::run(&mut session, &turns).await?;

    if let Some(path) = &args.save {
        session
            .save(path)
            .await
            .with_context(|| format!("saving to {}", path.display()))?;
        println!("[SAVED] Game saved to {}", path.display());
    }

    Ok(())
}

async fn load_config(path: &Path) -> Result<KernelConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
}

async fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    let catalog = Catalog::standard();
    let Some(path) = path else {
        return Ok(catalog);
    };
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading catalog {}", path.display()))?;
    catalog
        .extend_from_json(&content)
        .with_context(|| format!("parsing catalog {}", path.display()))
}

async fn load_character(path: &Path) -> Result<Character> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading character {}", path.display()))?;
    let character: Character = serde_json::from_str(&content)
        .with_context(|| format!("parsing character {}", path.display()))?;
    Ok(character.normalized())
}
