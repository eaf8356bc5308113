//! Semnet CLI - Command line interface for the semantic network engine

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;
mod program;

use commands::{apply, chain, completions, matching, run, store};
use config::{Backend, Config};
use output::OutputFormat;
use semnet_core::RuleEngine;
use semnet_storage::{KnowledgeStore, MemoryStore, RedbStore};

#[derive(Parser)]
#[command(name = "semnet")]
#[command(author, version, about = "Semantic network pattern matching and rule engine")]
pub struct Cli {
    /// Data directory (overrides the config file)
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Knowledge store backend (overrides the config file)
    #[arg(short, long, value_enum, global = true)]
    pub backend: Option<Backend>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Notation, global = true)]
    pub format: OutputFormat,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Match a query graph against a data graph
    Match(matching::MatchArgs),
    /// Apply a rule to a working memory
    Apply(apply::ApplyArgs),
    /// Forward-chain rules over a working memory
    Chain(chain::ChainArgs),
    /// Work with the knowledge store
    Store(store::StoreArgs),
    /// Run a control program against the knowledge store
    Run(run::RunArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Application context with configuration and rule engine
pub struct AppContext {
    pub config: Config,
    pub engine: RuleEngine,
}

impl AppContext {
    pub fn new(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = Config::load()?;
        if let Some(data_dir) = &cli.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(backend) = cli.backend {
            config.backend = backend;
        }

        let engine = RuleEngine::new(config.limits());
        Ok(Self { config, engine })
    }

    /// Open the configured knowledge store
    pub async fn open_store(&self) -> anyhow::Result<Arc<dyn KnowledgeStore>> {
        let store: Arc<dyn KnowledgeStore> = match self.config.backend {
            Backend::Memory => Arc::new(MemoryStore::new()),
            Backend::Redb => {
                std::fs::create_dir_all(&self.config.data_dir)?;
                let db_path = self.config.data_dir.join("semnet.redb");
                tracing::debug!("Using database at: {:?}", db_path);
                Arc::new(RedbStore::open(&db_path)?)
            }
        };
        store.initialize().await?;
        Ok(store)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting semnet CLI");

    match &cli.command {
        Commands::Config(args) => return commands::config::run(args).await,
        Commands::Completions(args) => return completions::run(args),
        _ => {}
    }

    let ctx = AppContext::new(&cli)?;

    match &cli.command {
        Commands::Match(args) => matching::run(args, &cli, &ctx)?,
        Commands::Apply(args) => apply::run(args, &cli, &ctx)?,
        Commands::Chain(args) => chain::run(args, &cli, &ctx)?,
        Commands::Store(args) => store::run(args, &cli, &ctx).await?,
        Commands::Run(args) => run::run(args, &cli, &ctx).await?,
        Commands::Config(_) | Commands::Completions(_) => {}
    }

    Ok(())
}
