//! Match command

use std::path::PathBuf;

use clap::Args;
use semnet_core::{MatchOptions, Matcher};

use crate::output::format_graphs;
use crate::program::read_graph;
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct MatchArgs {
    /// Query graph (notation file); `?`-prefixed concepts are unknowns
    pub query: PathBuf,

    /// Data graph (notation file)
    pub data: PathBuf,

    /// Copy the query into each result with `matches` relations
    #[arg(long)]
    pub include_query: bool,
}

pub fn run(args: &MatchArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let query = read_graph(&args.query)?;
    let data = read_graph(&args.data)?;

    let mut options = MatchOptions::default().with_limits(ctx.config.limits());
    if args.include_query {
        options = options.including_query();
    }
    let results = Matcher::new(options).match_graphs(&query, &data)?;
    tracing::info!("{} matches", results.len());

    if !cli.quiet {
        println!("{}", format_graphs(&results, cli.format)?);
    }
    Ok(())
}
