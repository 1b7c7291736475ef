pub mod check;
pub mod run;

use std::path::Path;

use anyhow::Result;
use impervious::Config;

/// Read the configuration file, or fall back to the defaults.
pub(crate) fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_json_file(path),
        None => Ok(Config::default()),
    }
}
