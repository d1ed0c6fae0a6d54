use clap::Parser;
use metasort::cli::{Cli, run_cli};
use metasort::output::OutputFormatter;
use std::process;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run_cli(cli.command, cli.config.as_deref()) {
        OutputFormatter::error(&format!("Error: {}", e));
        process::exit(1);
    }
}
