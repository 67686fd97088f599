mod cli;
mod client;
mod clipboard;
mod config;
mod connection;

use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let name = match cli.command {
        Command::Connect { .. } => "connect",
        Command::Copy { .. } => "copy",
        Command::Paste { .. } => "paste",
    };

    if let Err(e) = client::run(cli.command, cli.config.as_deref()).await {
        tracing::error!(error = %e, command = name, "command failed");
        eprintln!("sockclip {name}: {e}");
        std::process::exit(1);
    }
}
