//! # lumen CLI
//!
//! Command-line interface for the lumen incremental site generator.

mod commands;

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lumen")]
#[command(version, about = "Incremental markdown site generator")]
struct Cli {
    /// Path to site.json, or a directory containing one
    site: PathBuf,

    /// Build once and exit instead of watching for changes
    #[arg(long)]
    no_watch: bool,

    /// Disable post-build hook execution
    #[arg(long)]
    no_exec: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let run_hooks = !cli.no_exec;
    if cli.no_watch {
        commands::build_once(&cli.site, run_hooks)
    } else {
        commands::watch(&cli.site, run_hooks).await
    }
}
