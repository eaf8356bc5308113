//! Chain command

use std::path::PathBuf;

use clap::Args;
use semnet_core::ChainReport;
use serde::Serialize;

use crate::output::{format_graph, format_output, OutputFormat};
use crate::program::read_graph;
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct ChainArgs {
    /// Working memory (notation file)
    pub memory: PathBuf,

    /// Rule graphs (notation files)
    #[arg(required = true)]
    pub rules: Vec<PathBuf>,

    /// Stop after this many rounds (default from config)
    #[arg(long)]
    pub max_rounds: Option<usize>,
}

#[derive(Serialize)]
struct ChainOutput<'a> {
    memory: &'a semnet_core::ConceptGraph,
    report: &'a ChainReport,
}

pub fn run(args: &ChainArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let mut memory = read_graph(&args.memory)?;
    let rules = args
        .rules
        .iter()
        .map(|path| read_graph(path))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let max_rounds = args.max_rounds.unwrap_or(ctx.config.max_rounds);
    let report = ctx.engine.forward_chain(&rules, &mut memory, max_rounds)?;

    if cli.quiet {
        return Ok(());
    }
    match cli.format {
        OutputFormat::Json => {
            let output = ChainOutput {
                memory: &memory,
                report: &report,
            };
            println!("{}", format_output(&output, cli.format)?);
        }
        OutputFormat::Notation => {
            println!("{}", format_graph(&memory, cli.format)?);
            println!("{}", summary(&report));
        }
    }
    Ok(())
}

fn summary(report: &ChainReport) -> String {
    format!(
        "{} rounds, {} firings, +{} concepts, +{} relations, {}",
        report.rounds,
        report.firings,
        report.added_concepts,
        report.added_relations,
        if report.reached_fixpoint {
            "fixpoint reached"
        } else {
            "round limit reached"
        }
    )
}
