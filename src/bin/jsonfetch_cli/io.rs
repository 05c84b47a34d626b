#![deny(clippy::all, clippy::pedantic)]

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::client::CliError;

/// Request payload from `--data-file` or `--data`; clap keeps the two exclusive.
pub fn load_payload(inline: Option<&str>, file: Option<&Path>) -> Result<Option<Value>, CliError> {
    let (origin, text) = match (file, inline) {
        (Some(path), _) => {
            let text = fs::read_to_string(path).map_err(|source| CliError::InputFile {
                path: path.display().to_string(),
                source,
            })?;
            (path.display().to_string(), text)
        }
        (None, Some(text)) => ("--data".to_string(), text.to_string()),
        (None, None) => return Ok(None),
    };

    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| CliError::InvalidInput(format!("{origin} is not valid JSON: {e}")))
}
