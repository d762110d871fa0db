//! Helpers shared by command implementations.

use std::fs;
use std::path::Path;

use crate::{CodeloopError, ConfigError};

/// Read a file named on the command line; failures point at the flag.
pub(crate) fn read_input(flag: &str, path: &Path) -> Result<String, CodeloopError> {
    fs::read_to_string(path).map_err(|err| {
        CodeloopError::Config(ConfigError::InvalidValue {
            key: flag.to_string(),
            value: format!("cannot read {}: {err}", path.display()),
        })
    })
}

/// Serialize a command result for stdout.
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
