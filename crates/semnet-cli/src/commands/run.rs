//! Run command

use std::path::PathBuf;

use clap::Args;

use crate::output::{format_graph, format_output, NO_MATCH};
use crate::program::{OperationOutcome, Program};
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct RunArgs {
    /// Control program (TOML file with `[[operation]]` tables)
    pub program: PathBuf,
}

pub async fn run(args: &RunArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let program = Program::from_file(&args.program)?.with_max_rounds(ctx.config.max_rounds);
    let store = ctx.open_store().await?;
    tracing::info!(
        "Running {} operations from {:?}",
        program.operations.len(),
        args.program
    );

    let outcomes = program.run(store.as_ref(), &ctx.engine).await?;

    if cli.quiet {
        return Ok(());
    }
    for (step, outcome) in outcomes.iter().enumerate() {
        match outcome {
            OperationOutcome::NoAnswer => println!("{}: {}", step + 1, NO_MATCH),
            OperationOutcome::Answer { graph } => {
                println!("{}: {}", step + 1, format_graph(graph, cli.format)?)
            }
            other => println!("{}: {}", step + 1, format_output(other, cli.format)?),
        }
    }
    Ok(())
}
