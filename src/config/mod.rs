mod bootstrap;
pub use bootstrap::*;

mod credentials;
pub use credentials::*;

mod settings;
pub use settings::*;

use directories::BaseDirs;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Value};
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

pub const CONFIG_FILENAME: &str = "shreddit.yml";
pub const SHREDDIT_TEMPLATE: &str = include_str!("../../templates/shreddit.yml.example");

lazy_static! {
    /// Every recognized option with its default value.
    pub static ref DEFAULT_CONFIG: Mapping = serde_yaml::from_str(SHREDDIT_TEMPLATE)
        .expect("bundled shreddit.yml.example is a YAML mapping");
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{path} must contain a mapping of options at the top level")]
    NotAMapping { path: PathBuf },
    #[error("invalid configuration: {0}")]
    Invalid(#[source] serde_yaml::Error),
}

/// `<user config dir>/shreddit/shreddit.yml`, if the platform has a config dir.
///
/// This is the machine-local config dir, so on Windows it lives under `%LOCALAPPDATA%`.
pub fn user_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.config_local_dir().join("shreddit").join(CONFIG_FILENAME))
}

/// Picks the config file: an explicit path, then the user config file if it exists,
/// then `shreddit.yml`.
pub fn locate_config(
    explicit: Option<&Path>,
    user_config: Option<&Path>,
    working_dir: &Path,
) -> PathBuf {
    if let Some(path) = explicit {
        return working_dir.join(path);
    }
    match user_config {
        Some(path) if path.exists() => path.to_path_buf(),
        _ => working_dir.join(CONFIG_FILENAME),
    }
}

/// Parses user YAML. An empty document counts as an empty mapping.
pub fn parse_overrides(content: &str, path: &Path) -> Result<Mapping, ConfigError> {
    let is_blank = content
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#'));
    if is_blank {
        return Ok(Mapping::new());
    }

    let value: Value = serde_yaml::from_str(content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err(ConfigError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}

pub fn load_overrides(path: &Path) -> Result<Mapping, ConfigError> {
    let content = read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_overrides(&content, path)
}

/// Takes each default's key from `overrides` when present.
/// Keys the defaults don't know are dropped.
pub fn resolve(defaults: &Mapping, overrides: &Mapping) -> Mapping {
    defaults
        .iter()
        .map(|(key, default)| (key.clone(), overrides.get(key).unwrap_or(default).clone()))
        .collect()
}

/// Keys of `overrides` that [`resolve`] drops.
pub fn ignored_keys(defaults: &Mapping, overrides: &Mapping) -> Vec<String> {
    overrides
        .keys()
        .filter(|key| !defaults.contains_key(*key))
        .map(|key| match key {
            Value::String(name) => name.clone(),
            other => serde_yaml::to_string(other).unwrap_or_default().trim().to_string(),
        })
        .collect()
}
