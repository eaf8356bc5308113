//! Knowledge store commands

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::output::{format_graph, NO_MATCH};
use crate::program::read_graph;
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct StoreArgs {
    #[command(subcommand)]
    pub command: StoreCommands,
}

#[derive(Subcommand)]
pub enum StoreCommands {
    /// Merge a notation file into the store
    Load {
        /// Notation file
        file: PathBuf,
    },
    /// Print the stored graph, or one concept
    Show {
        /// Concept id
        key: Option<String>,
    },
    /// Match a query file against the store and print the merged matches
    Query {
        /// Notation file
        file: PathBuf,
    },
    /// Apply a stored rule to the stored graph
    Rule {
        /// Rule root concept
        name: String,
        /// Merge the grounded conclusion back into the store
        #[arg(long)]
        commit: bool,
    },
    /// Delete a concept and its relations
    Delete {
        /// Concept id
        id: String,
    },
    /// Delete everything
    Clear,
}

pub async fn run(args: &StoreArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let store = ctx.open_store().await?;
    tracing::debug!("Running store command on {} backend", ctx.config.backend);

    let output = match &args.command {
        StoreCommands::Load { file } => {
            let graph = read_graph(file)?;
            store.save_graph(&graph).await?;
            format!(
                "Loaded {} concepts, {} relations",
                graph.concept_count(),
                graph.relation_count()
            )
        }
        StoreCommands::Show { key } => {
            let graph = match key {
                Some(key) => store.get_concept_by_key(key).await?,
                None => store.load_graph().await?,
            };
            if graph.is_empty() {
                match key {
                    Some(key) => format!("Concept '{}' not found", key),
                    None => "Store is empty".to_string(),
                }
            } else {
                format_graph(&graph, cli.format)?
            }
        }
        StoreCommands::Query { file } => {
            let query = read_graph(file)?;
            let merged = store.find_and_merge_matches(&query).await?;
            if merged.is_empty() {
                NO_MATCH.to_string()
            } else {
                format_graph(&merged, cli.format)?
            }
        }
        StoreCommands::Rule { name, commit } => {
            let rule = store.get_rule_by_name(name).await?;
            let memory = store.load_graph().await?;
            let result = ctx.engine.apply_rule(&rule, &memory)?;
            if result.is_empty() {
                NO_MATCH.to_string()
            } else {
                if *commit {
                    store.save_graph(&result).await?;
                    tracing::info!("Committed conclusion of rule {}", name);
                }
                format_graph(&result, cli.format)?
            }
        }
        StoreCommands::Delete { id } => {
            store.delete_concept(id).await?;
            format!("Deleted concept '{}'", id)
        }
        StoreCommands::Clear => {
            store.delete_all_data().await?;
            "Store cleared".to_string()
        }
    };

    if !cli.quiet {
        println!("{}", output);
    }
    Ok(())
}
