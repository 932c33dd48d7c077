// ABOUTME: Entry point for the pullscope CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use pullscope::config::{self, Config};
use pullscope::error::Result;
use pullscope::output::{Output, OutputMode};
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        if let Some(hint) = e.hint() {
            eprintln!("Hint: {hint}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cwd = env::current_dir()?;

    match cli.command {
        Commands::Init { force } => {
            let path = config::init_config(&cwd, force)?;
            println!("Created {}", path.display());
            Ok(())
        }
        Commands::Replay {
            file,
            manifest,
            digest,
            flavor,
            reference,
        } => {
            let (config, mut output) = load_config(&cwd, cli.output)?;
            let args = commands::ReplayArgs {
                file,
                manifest,
                digest,
                flavor,
                reference,
            };
            commands::replay(&config, args, &mut output).await
        }
        Commands::Pull {
            image,
            manifest,
            platform,
            timeout,
        } => {
            let (config, mut output) = load_config(&cwd, cli.output)?;
            let args = commands::PullArgs {
                image,
                manifest,
                platform,
                timeout,
            };
            commands::pull(&config, args, &mut output).await
        }
    }
}

/// Config from the working directory, with the output flag taking precedence.
fn load_config(cwd: &Path, mode: Option<OutputMode>) -> Result<(Config, Output)> {
    let config = Config::discover_or_default(cwd)?;
    let output = Output::new(mode.or(config.output).unwrap_or_default());
    Ok((config, output))
}
