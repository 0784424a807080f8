//! CLI binary for medmatch.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use medmatch_core::{CandidateProduct, MatchConfig, MatchScorer, MedicationQuery, Resolver};
use tracing_subscriber::EnvFilter;

/// MedMatch: resolve prescribed medications to pharmacy catalog listings.
#[derive(Parser)]
#[command(name = "medmatch", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Resolve a JSON array of medication queries against the live catalog.
    Resolve {
        /// JSON file with `[{"name": .., "strength": .., "form": ..}, ..]`.
        #[arg(short, long)]
        input: PathBuf,

        /// Write results here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Score a local candidate list offline.
    Score {
        /// Medication name.
        #[arg(long)]
        name: String,

        /// Strength, e.g. "500mg".
        #[arg(long)]
        strength: Option<String>,

        /// Dosage form, e.g. "tablet".
        #[arg(long)]
        form: Option<String>,

        /// JSON file with `[{"name": .., "url": ..}, ..]`.
        #[arg(long)]
        candidates: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so JSON on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("medmatch=info,medmatch_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => MatchConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => MatchConfig::default(),
    };

    match cli.command {
        Command::Resolve { input, output } => run_resolve(config, &input, output.as_deref()).await,
        Command::Score {
            name,
            strength,
            form,
            candidates,
        } => run_score(name, strength, form, &candidates),
    }
}

async fn run_resolve(
    config: MatchConfig,
    input: &Path,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("reading queries from {}", input.display()))?;
    let queries: Vec<MedicationQuery> =
        serde_json::from_str(&raw).context("parsing medication queries")?;

    let resolver = Resolver::with_defaults(config)?;
    let results = resolver.resolve(&queries).await?;

    let json = serde_json::to_string_pretty(&results)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("writing results to {}", path.display()))?;
            tracing::info!(path = %path.display(), count = results.len(), "results written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_score(
    name: String,
    strength: Option<String>,
    form: Option<String>,
    candidates_path: &Path,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(candidates_path)
        .with_context(|| format!("reading candidates from {}", candidates_path.display()))?;
    let candidates: Vec<CandidateProduct> =
        serde_json::from_str(&raw).context("parsing candidate list")?;

    let query = MedicationQuery {
        name,
        strength,
        form,
        instructions: None,
    };
    if !query.is_valid() {
        anyhow::bail!("medication name must not be empty");
    }

    let outcome = MatchScorer::new().score(&query, &candidates);
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
