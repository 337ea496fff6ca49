use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use protogen_cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose when both are given
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    cli.command.execute()
}
