//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/nestree/nestree.toml`
//! 3. Local config: `<dir>/.nestree.toml`
//! 4. Environment variables: `NESTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::FieldRegistry;

/// Unified configuration for nestree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Forest document the CLI operates on
    pub forest_file: PathBuf,
    /// Declared payload fields, in export order
    pub fields: Vec<String>,
    /// Renumber immediately after deletes
    pub close_gaps_on_delete: bool,
    /// Indent written forest documents
    pub pretty_json: bool,
}

/// Raw settings for intermediate parsing; `None` means "not specified".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub forest_file: Option<PathBuf>,
    pub fields: Option<Vec<String>>,
    pub close_gaps_on_delete: Option<bool>,
    pub pretty_json: Option<bool>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            forest_file: default_forest_file(),
            fields: vec!["name".into()],
            close_gaps_on_delete: true,
            pretty_json: true,
        }
    }
}

fn default_forest_file() -> PathBuf {
    ProjectDirs::from("", "", "nestree")
        .map(|dirs| dirs.data_dir().join("forest.json"))
        .unwrap_or_else(|| PathBuf::from("~/.nestree/forest.json"))
}

/// Get the XDG config directory for nestree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "nestree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("nestree.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".nestree.toml")
}

fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Append overlay names to `base`; `!name` removes an inherited name.
///
/// Declaration order is kept, since it is the default export order.
pub fn merge_fields(base: &[String], overlay: &[String]) -> Vec<String> {
    let mut result: Vec<String> = base.to_vec();
    for name in overlay {
        if let Some(negated) = name.strip_prefix('!') {
            result.retain(|f| f != negated);
        } else if !result.contains(name) {
            result.push(name.clone());
        }
    }
    result
}

impl Settings {
    /// Field registry built from the declared fields.
    pub fn field_registry(&self) -> Result<FieldRegistry, ApplicationError> {
        Ok(FieldRegistry::new(self.fields.iter().cloned())?)
    }

    /// Expand `~`, `$VAR` and `${VAR}` in the forest path.
    fn expand_paths(&mut self) {
        let raw = self.forest_file.to_string_lossy().to_string();
        if let Ok(expanded) = shellexpand::full(&raw) {
            self.forest_file = PathBuf::from(expanded.as_ref());
        }
    }

    /// Local layer: fields union with negation, scalars win when present.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            forest_file: overlay
                .forest_file
                .clone()
                .unwrap_or_else(|| self.forest_file.clone()),
            fields: overlay
                .fields
                .as_ref()
                .map(|o| merge_fields(&self.fields, o))
                .unwrap_or_else(|| self.fields.clone()),
            close_gaps_on_delete: overlay.close_gaps_on_delete.unwrap_or(self.close_gaps_on_delete),
            pretty_json: overlay.pretty_json.unwrap_or(self.pretty_json),
        }
    }

    /// Global layer: a field list REPLACES the defaults.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            forest_file: global
                .forest_file
                .clone()
                .unwrap_or_else(|| self.forest_file.clone()),
            fields: global.fields.clone().unwrap_or_else(|| self.fields.clone()),
            close_gaps_on_delete: global.close_gaps_on_delete.unwrap_or(self.close_gaps_on_delete),
            pretty_json: global.pretty_json.unwrap_or(self.pretty_json),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config (field list REPLACES defaults)
    /// 3. Local config in `local_dir` (field list UNIONS with global, `!name` removes)
    /// 4. Environment variables `NESTREE_*` (REPLACE)
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("load: global config {}", global_path.display());
                current = current.apply_global(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                debug!("load: local config {}", local_path.display());
                current = current.merge_with(&load_raw_settings(&local_path)?);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        current.field_registry()?;

        Ok(current)
    }

    /// Apply `NESTREE_*` environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("NESTREE").prefix_separator("_").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("forest_file") {
            settings.forest_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("fields") {
            settings.fields = val
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(val) = config.get_bool("close_gaps_on_delete") {
            settings.close_gaps_on_delete = val;
        }
        if let Ok(val) = config.get_bool("pretty_json") {
            settings.pretty_json = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
