//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/treeindex/treeindex.toml`
//! 3. Local config: `./.treeindex.toml`, or the file given with `--config`
//! 4. Environment variables: `TREEINDEX_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::{BuildOrder, DuplicatePolicy, IndexBuilder};

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub build_order: Option<BuildOrder>,
    pub duplicate_ids: Option<DuplicatePolicy>,
    pub data_file: Option<PathBuf>,
}

/// Unified configuration for treeindex.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// How records are linked (default: input-order)
    pub build_order: BuildOrder,
    /// What happens on a repeated id (default: last-write-wins)
    pub duplicate_ids: DuplicatePolicy,
    /// JSON file with the records to index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
}

/// Get the XDG config directory for treeindex.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "treeindex").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("treeindex.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".treeindex.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand `~`, `$VAR` and `${VAR}`; leaves the input untouched on failure.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

impl Settings {
    /// Builder configured with these settings.
    pub fn index_builder(&self) -> IndexBuilder {
        IndexBuilder::new()
            .order(self.build_order)
            .duplicates(self.duplicate_ids)
    }

    fn expand_paths(&mut self) {
        if let Some(data_file) = &self.data_file {
            self.data_file = Some(PathBuf::from(expand_env_vars(
                data_file.to_string_lossy().as_ref(),
            )));
        }
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            build_order: overlay.build_order.unwrap_or(self.build_order),
            duplicate_ids: overlay.duplicate_ids.unwrap_or(self.duplicate_ids),
            data_file: overlay.data_file.clone().or_else(|| self.data_file.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_config` - Explicit local config file; when `None`,
    ///   `./.treeindex.toml` is used if present
    ///
    /// An explicit file that does not exist is an error, the implicit one is optional.
    pub fn load(local_config: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("loading global config: {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        match local_config {
            Some(path) => {
                current = current.merge_with(&load_raw_settings(path)?);
            }
            None => {
                let implicit = std::env::current_dir()
                    .map(|dir| local_config_path(&dir))
                    .ok()
                    .filter(|path| path.exists());
                if let Some(path) = implicit {
                    debug!("loading local config: {}", path.display());
                    current = current.merge_with(&load_raw_settings(&path)?);
                }
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply TREEINDEX_* environment variables as explicit overrides.
    fn apply_env_overrides(settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("TREEINDEX")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;
        Self::apply_overrides(settings, &config)
    }

    fn apply_overrides(mut settings: Self, config: &Config) -> Result<Self, ApplicationError> {
        if let Ok(val) = config.get_string("build_order") {
            settings.build_order = parse_setting("build_order", &val)?;
        }
        if let Ok(val) = config.get_string("duplicate_ids") {
            settings.duplicate_ids = parse_setting("duplicate_ids", &val)?;
        }
        if let Ok(val) = config.get_string("data_file") {
            settings.data_file = Some(PathBuf::from(val));
        }
        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# treeindex configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/treeindex/treeindex.toml
#   Local:  ./.treeindex.toml (or --config <file>)
#   Env:    TREEINDEX_* environment variables

# "input-order": parents must precede children (single pass)
# "two-pass":    any order, cycles are rejected
# build_order = "input-order"

# "last-write-wins": a repeated id replaces the earlier record
# "reject":          a repeated id fails the build
# duplicate_ids = "last-write-wins"

# Records to index (JSON array of objects with "id" and "parent")
# data_file = "~/data/tree.json"
"#
        .to_string()
    }
}

fn parse_setting<T: DeserializeOwned>(key: &str, value: &str) -> Result<T, ApplicationError> {
    let deserializer: serde::de::value::StrDeserializer<'_, serde::de::value::Error> =
        value.into_deserializer();
    T::deserialize(deserializer).map_err(|e| ApplicationError::Config {
        message: format!("{key}: {e}"),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
