//! Show configuration command.

use std::path::Path;

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{ConfigOutput, OutputFormat, Render};

/// Execute the config command.
pub fn show_config(config: &CliConfig, path: &Path, format: OutputFormat) -> CliResult<String> {
    let output = ConfigOutput {
        path: path.display().to_string(),
        loaded: path.exists(),
        config: config.redacted(),
    };
    Ok(output.render(format))
}
