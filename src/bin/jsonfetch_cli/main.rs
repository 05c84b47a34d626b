//! jsonfetch-cli: issue one JSON request and print the decoded result.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;
mod handlers;
mod io;
mod print;

use clap::Parser;
use jsonfetch::{config, telemetry};

use args::Cli;
use client::{CliError, build_client};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = config::load(&cli.config)?;
    telemetry::init(&settings.logging)?;

    let client = build_client(&cli, &settings)?;
    let value = handlers::handle(&client, cli.command).await?;
    print::write_json(&mut std::io::stdout().lock(), &value)
}
