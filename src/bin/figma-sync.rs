//! figma-sync CLI Binary
//!
//! Command-line interface for incremental design asset sync.

use anyhow::Context;
use clap::Parser;
use figma_sync::logging::init_logging;
use figma_sync::tooling::cli::{Cli, CliContext};
use std::process;

fn run(cli: &Cli) -> anyhow::Result<String> {
    let context = CliContext::new(cli.workspace.clone(), cli.config.clone())
        .with_context(|| format!("Error initializing workspace {}", cli.workspace.display()))?;

    let logging = cli.logging_config(&context.config().logging);
    init_logging(Some(&logging)).context("Failed to initialize logging")?;

    let output = context.execute(&cli.command)?;
    Ok(output)
}

fn main() {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
