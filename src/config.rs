//! Options file handling.
//! Option values can be kept in a JSON or YAML file and layered under the
//! values given on the command line.

use crate::error::{Error, Result};
use crate::options::RawOptions;
use log::debug;
use std::path::Path;

/// Loads option values from a JSON or YAML file.
///
/// # Arguments
/// * `path` - Path to the options file
///
/// # Returns
/// * `Result<RawOptions>` - Option values in file order
///
/// # Errors
/// * `Error::Io` if the file cannot be read
/// * `Error::Config` if the content is neither a JSON nor a YAML map
pub fn load_options_file<P: AsRef<Path>>(path: P) -> Result<RawOptions> {
    let path = path.as_ref();
    debug!("Loading options from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    parse_options(&content)
}

/// Parses options file content, trying JSON first and YAML second.
pub fn parse_options(content: &str) -> Result<RawOptions> {
    if content.trim().is_empty() {
        return Ok(RawOptions::new());
    }

    match serde_json::from_str::<RawOptions>(content) {
        Ok(values) => Ok(values),
        Err(_) => serde_yaml::from_str::<RawOptions>(content)
            .map_err(|e| Error::Config(format!("Invalid options file format: {}", e))),
    }
}

/// Layers `overrides` on top of `base`; keys present in both take the override.
pub fn merge(base: RawOptions, overrides: RawOptions) -> RawOptions {
    let mut merged = base;
    for (name, value) in overrides {
        merged.insert(name.replace('-', "_"), value);
    }
    merged
}
