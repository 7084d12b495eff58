//! ragkb - command-line client for a RAG knowledge-base service.
//!
//! Every command first navigates to the screen it stands in for, so the
//! route guard decides whether it may run, then works through the stores.

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{execute, Cli};

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "ragkb=debug,info",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    execute(cli).await
}
