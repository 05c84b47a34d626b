//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{collections::BTreeMap, path::PathBuf, str::FromStr};

use clap::{Args, builder::BoolishValueParser};
use config::{Config, Environment, File};
use reqwest::header::{HeaderName, HeaderValue};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "jsonfetch";
const ENV_PREFIX: &str = "JSONFETCH";
pub(crate) const DEFAULT_USER_AGENT: &str = concat!("jsonfetch/", env!("CARGO_PKG_VERSION"));

/// Overrides accepted on the command line; every field beats file and env values.
#[derive(Debug, Args, Default, Clone)]
pub struct ConfigOverrides {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "JSONFETCH_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    /// Base URL that relative locators are resolved against.
    #[arg(long = "base-url", value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Override the User-Agent header.
    #[arg(long = "user-agent", value_name = "AGENT", global = true)]
    pub user_agent: Option<String>,

    /// Extra default header, repeatable.
    #[arg(
        long = "header",
        short = 'H',
        value_name = "NAME:VALUE",
        value_parser = parse_header_arg,
        global = true
    )]
    pub headers: Vec<(String, String)>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: Option<Url>,
    pub user_agent: String,
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(overrides: &ConfigOverrides) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = overrides.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(overrides);

    Settings::from_raw(raw)
}

/// Parse a `NAME:VALUE` header argument.
pub fn parse_header_arg(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("header name must not be empty".to_string());
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    client: RawClientSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(base_url) = overrides.base_url.as_ref() {
            self.client.base_url = Some(base_url.clone());
        }
        if let Some(user_agent) = overrides.user_agent.as_ref() {
            self.client.user_agent = Some(user_agent.clone());
        }
        if !overrides.headers.is_empty() {
            self.client
                .headers
                .get_or_insert_with(BTreeMap::new)
                .extend(overrides.headers.iter().cloned());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings { client, logging } = raw;

        let client = build_client_settings(client)?;
        let logging = build_logging_settings(logging)?;

        Ok(Self { client, logging })
    }
}

fn build_client_settings(client: RawClientSettings) -> Result<ClientSettings, LoadError> {
    let base_url = client
        .base_url
        .and_then(|value| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .map(|value| parse_base_url(&value))
        .transpose()?;

    let user_agent = client
        .user_agent
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
    if user_agent.trim().is_empty() {
        return Err(LoadError::invalid("client.user_agent", "must not be empty"));
    }

    let headers = client.headers.unwrap_or_default();
    for (name, value) in &headers {
        if let Err(err) = HeaderName::from_bytes(name.as_bytes()) {
            let reason = format!("invalid name `{name}`: {err}");
            return Err(LoadError::invalid("client.headers", reason));
        }
        if let Err(err) = HeaderValue::from_str(value) {
            let reason = format!("invalid value for `{name}`: {err}");
            return Err(LoadError::invalid("client.headers", reason));
        }
    }

    Ok(ClientSettings {
        base_url,
        user_agent,
        headers,
    })
}

fn parse_base_url(value: &str) -> Result<Url, LoadError> {
    let url = Url::parse(value).map_err(|err| {
        LoadError::invalid("client.base_url", format!("failed to parse: {err}"))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "client.base_url",
            format!("unsupported scheme `{}`", url.scheme()),
        ));
    }
    Ok(url)
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::WARN,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawClientSettings {
    base_url: Option<String>,
    user_agent: Option<String>,
    headers: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}
