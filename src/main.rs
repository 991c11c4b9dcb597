use anyhow::Context as _;
use clap::Parser;
use formkeeper::IndexConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "formkeeper=info";

/// Index and watch a tree of form documents.
#[derive(Debug, Parser)]
#[command(name = "formkeeper", version)]
struct Cli {
    /// Folder holding `<application>/<form>.xhtml` documents.
    #[arg(long)]
    source: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Name forms `<file>-<form-version>` when they declare a version.
    #[arg(long)]
    store_versions: bool,

    /// Print the index as JSON once the initial sweep is done, then exit.
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => IndexConfig::load(path)?,
        None => IndexConfig::default(),
    };
    if let Some(source) = cli.source {
        config.source_folder = source;
    }
    if cli.store_versions {
        config.store_versions = true;
    }
    if config.source_folder.is_relative() {
        let cwd = std::env::current_dir().context("failed to resolve working directory")?;
        config.source_folder = cwd.join(&config.source_folder);
    }

    tracing::info!(source = %config.source_folder.display(), "starting form index");
    let handle = formkeeper::initialize(config)
        .await
        .context("failed to initialize form index")?;

    if cli.list {
        let forms = handle.forms_by_creation();
        let json = serde_json::to_string_pretty(&forms).context("failed to encode forms")?;
        println!("{json}");
        return Ok(());
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!(forms = handle.len(), "shutting down");
    Ok(())
}
