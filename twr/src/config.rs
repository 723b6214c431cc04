//! User configuration for the `twr` review shell.
//!
//! Read from `$XDG_CONFIG_HOME/twr/config.toml` (falling back to
//! `~/.config/twr/config.toml`). Every field is optional; a missing or
//! malformed file is a soft failure that logs a warning and keeps defaults.

use serde::Deserialize;
use twr_core::NavigationMode;

/// Settings loaded from `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the SQLite progress database.
    pub db_path: String,
    /// Ordering applied right after the review session starts.
    pub navigation_mode: NavigationMode,
    /// Save progress on every autosave tick when there are unsaved changes.
    pub autosave: bool,
    /// Seconds between autosave ticks.
    pub autosave_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: ".twr/progress.db".to_owned(),
            navigation_mode: NavigationMode::Sequential,
            autosave: true,
            autosave_secs: 30,
        }
    }
}

/// Returns the path to the twr config file.
///
/// Prefers `$XDG_CONFIG_HOME/twr/config.toml`; falls back to
/// `~/.config/twr/config.toml` when the env var is absent.
pub fn config_path() -> std::path::PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(std::path::PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| std::path::PathBuf::from(h).join(".config"))
        })
        .unwrap_or_else(|| std::path::PathBuf::from(".config"));
    base.join("twr").join("config.toml")
}

/// Parses config text, falling back to defaults on error.
pub fn parse(raw: &str) -> Config {
    match toml::from_str(raw) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "config parse error; using defaults");
            Config::default()
        }
    }
}

/// Loads the config file. Never fails: missing file means defaults.
pub fn load() -> Config {
    let path = config_path();
    match std::fs::read_to_string(&path) {
        Ok(raw) => parse(&raw),
        Err(_) => {
            tracing::debug!(path = %path.display(), "no config file; using defaults");
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_other_defaults() {
        let config = parse("navigation_mode = \"severity\"\nautosave = false\n");
        assert_eq!(config.navigation_mode, NavigationMode::Severity);
        assert!(!config.autosave);
        assert_eq!(config.db_path, ".twr/progress.db");
    }

    #[test]
    fn malformed_config_falls_back_to_defaults() {
        assert_eq!(parse("navigation_mode = [1, 2"), Config::default());
        assert_eq!(parse("navigation_mode = \"random\""), Config::default());
    }
}
