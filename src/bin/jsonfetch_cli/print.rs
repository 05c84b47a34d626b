#![deny(clippy::all, clippy::pedantic)]

use std::io::{self, Write};

use serde_json::Value;

use crate::client::CliError;

/// Pretty JSON plus a trailing newline. An empty response prints as `null`.
pub fn write_json(out: &mut impl Write, value: &Value) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *out, value)
        .map_err(|e| CliError::Output(io::Error::from(e)))?;
    writeln!(out).map_err(CliError::Output)
}
