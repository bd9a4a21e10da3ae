//! Command implementations.

pub mod config;
pub mod serve;

use glimpse_core::Config;
use std::path::{Path, PathBuf};

/// Config file in effect: `--config` (with `~` expanded) or the platform default.
pub fn config_path(arg: Option<&Path>) -> PathBuf {
    match arg {
        Some(path) => {
            let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
            PathBuf::from(expanded)
        }
        None => Config::default_path(),
    }
}
