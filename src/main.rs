use anyhow::Result;
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};

use opportunity_scorer::config::resolve_config;
use opportunity_scorer::orchestrator::{run, RunOptions};

/// Opportunity Scorer - importance vs. satisfaction per actor/action group
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Tagged corpus JSON (array of {id?, text, tokens, cluster?, action?, vector?})
    #[arg(long)]
    corpus: PathBuf,

    /// Sentiment lexicon JSON (SentiWord layout)
    #[arg(long)]
    lexicon: PathBuf,

    /// Pipeline config YAML (overrides OPPORTUNITY_CONFIG environment variable)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for generated files
    #[arg(short, long, default_value = "out")]
    output_dir: PathBuf,

    /// Cluster embeddings and model topics instead of using the corpus assignments
    #[arg(long)]
    assign: bool,

    /// Extra stop-word file, one word per line
    #[arg(long)]
    stopwords: Option<PathBuf>,

    /// Date label for the output subdirectory (default: today)
    #[arg(long)]
    date: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    info!("Starting opportunity_scorer");

    let args = Args::parse();
    let cfg = resolve_config(args.config.as_deref())?;
    debug!("Effective config: {:?}", cfg);

    let date = args
        .date
        .unwrap_or_else(|| Local::now().date_naive().format("%Y-%m-%d").to_string());

    let opts = RunOptions {
        corpus: args.corpus,
        lexicon: args.lexicon,
        output_dir: args.output_dir,
        date,
        assign: args.assign,
        stopwords: args.stopwords,
    };

    let out = run(&opts, &cfg)?;
    info!("Results written to {}", out.display());
    Ok(())
}
