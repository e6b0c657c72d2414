//! Application configuration for docmap.
//!
//! User config lives at `~/.docmap/docmap.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocMapError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docmap.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docmap";

// ---------------------------------------------------------------------------
// Config structs (matching docmap.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory holding the document database.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Skip the reconciliation prompt and proceed (non-interactive runs).
    #[serde(default)]
    pub assume_yes: bool,

    /// Actor recorded on admin grants (defaults to the local username).
    #[serde(default = "default_actor")]
    pub actor: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            assume_yes: false,
            actor: default_actor(),
        }
    }
}

fn default_data_dir() -> String {
    "~/.docmap".into()
}

fn default_actor() -> String {
    std::env::var("USER").unwrap_or_else(|_| "local".into())
}

impl AppConfig {
    /// Resolve the database file path, expanding a leading `~`.
    pub fn db_path(&self) -> Result<PathBuf> {
        let dir = &self.defaults.data_dir;
        let expanded = if let Some(rest) = dir.strip_prefix("~/") {
            dirs::home_dir()
                .ok_or_else(|| DocMapError::config("could not determine home directory"))?
                .join(rest)
        } else if dir == "~" {
            dirs::home_dir()
                .ok_or_else(|| DocMapError::config("could not determine home directory"))?
        } else {
            PathBuf::from(dir)
        };
        Ok(expanded.join("docmap.db"))
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docmap/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocMapError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docmap/docmap.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocMapError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DocMapError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocMapError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocMapError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocMapError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("assume_yes"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.data_dir, "~/.docmap");
        assert!(!parsed.defaults.assume_yes);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
assume_yes = true
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert!(config.defaults.assume_yes);
        assert_eq!(config.defaults.data_dir, "~/.docmap");
    }

    #[test]
    fn db_path_keeps_absolute_dirs() {
        let mut config = AppConfig::default();
        config.defaults.data_dir = "/var/lib/docmap".into();
        let path = config.db_path().expect("db path");
        assert_eq!(path, PathBuf::from("/var/lib/docmap/docmap.db"));
    }
}
