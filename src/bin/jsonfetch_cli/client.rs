#![deny(clippy::all, clippy::pedantic)]

use std::fs;

use jsonfetch::config::{LoadError, Settings};
use jsonfetch::telemetry::TelemetryError;
use jsonfetch::{Credentials, FetchClient, FetchError};
use thiserror::Error;

use crate::args::Cli;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to read token file: {0}")]
    TokenFile(std::io::Error),
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to write output: {0}")]
    Output(std::io::Error),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Token file wins over the environment; neither is required.
pub fn resolve_token(cli: &Cli) -> Result<Option<String>, CliError> {
    if let Some(path) = &cli.token_file {
        let token = fs::read_to_string(path)
            .map_err(CliError::TokenFile)?
            .trim()
            .to_string();
        return Ok(Some(token));
    }
    Ok(cli
        .token_env
        .as_ref()
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty()))
}

pub fn build_client(cli: &Cli, settings: &Settings) -> Result<FetchClient, CliError> {
    let credentials = resolve_token(cli)?.map(Credentials::Bearer);
    Ok(FetchClient::from_settings(&settings.client, credentials)?)
}
