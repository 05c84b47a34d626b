//! Command-line surface for `jsonfetch-cli`.

#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use jsonfetch::config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(name = "jsonfetch-cli", version, about = "JSON HTTP request client", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigOverrides,

    /// Path to file containing a bearer token (takes precedence over env)
    #[arg(long, env = "JSONFETCH_TOKEN_FILE", global = true)]
    pub token_file: Option<PathBuf>,

    /// Bearer token from env (CLI flag hidden to keep tokens out of shell history)
    #[arg(long = "token", hide = true, env = "JSONFETCH_TOKEN", global = true)]
    pub token_env: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// GET a resource
    Get(ReadArgs),
    /// POST a JSON payload
    Post(BodyArgs),
    /// PUT a JSON payload
    Put(BodyArgs),
    /// PATCH a JSON payload
    Patch(BodyArgs),
    /// DELETE a resource, optionally with a JSON payload
    Delete(BodyArgs),
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Absolute URL, or a path resolved against --base-url
    pub locator: String,

    /// Query parameter, repeatable
    #[arg(long = "query", short = 'q', value_name = "KEY=VALUE", value_parser = parse_query_arg)]
    pub query: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct BodyArgs {
    /// Absolute URL, or a path resolved against --base-url
    pub locator: String,

    /// Inline JSON payload
    #[arg(long, conflicts_with = "data_file")]
    pub data: Option<String>,

    /// Read the JSON payload from a file
    #[arg(long)]
    pub data_file: Option<PathBuf>,

    /// Query parameter, repeatable
    #[arg(long = "query", short = 'q', value_name = "KEY=VALUE", value_parser = parse_query_arg)]
    pub query: Vec<(String, String)>,
}

fn parse_query_arg(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    if key.is_empty() {
        return Err("query key must not be empty".to_string());
    }
    Ok((key.to_string(), value.to_string()))
}
