use anyhow::Result;
use std::path::Path;
use tracing::debug;

use super::common::{read_input, to_json};
use crate::{Config, ExitCode};

/// Validate `candidate` against `template` and print the verdict as JSON.
pub fn execute_validate_command(template: &Path, candidate: &Path, config: &Config) -> Result<ExitCode> {
    let template = read_input("template", template)?;
    let candidate = read_input("candidate", candidate)?;
    let sentinel = &config.defaults.sentinel;

    let conformance = codeloop_template::validate(Some(&template), &candidate, sentinel);
    debug!(valid = conformance.valid, sentinel = %sentinel, "Validated candidate");
    println!("{}", to_json(&conformance)?);

    Ok(if conformance.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::NOT_CONFORMING
    })
}
