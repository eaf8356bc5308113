//! Apply command

use std::path::PathBuf;

use clap::Args;

use crate::output::format_graphs;
use crate::program::read_graph;
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct ApplyArgs {
    /// Rule graph (notation file)
    pub rule: PathBuf,

    /// Working memory (notation file)
    pub memory: PathBuf,

    /// Ground the conclusion once per match instead of only the first
    #[arg(long)]
    pub all: bool,
}

pub fn run(args: &ApplyArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let rule = read_graph(&args.rule)?;
    let memory = read_graph(&args.memory)?;

    let results = if args.all {
        ctx.engine.apply_rule_all(&rule, &memory)?
    } else {
        let result = ctx.engine.apply_rule(&rule, &memory)?;
        if result.is_empty() {
            Vec::new()
        } else {
            vec![result]
        }
    };

    if !cli.quiet {
        println!("{}", format_graphs(&results, cli.format)?);
    }
    Ok(())
}
