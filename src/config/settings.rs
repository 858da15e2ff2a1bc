use super::ConfigError;
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};
use std::path::PathBuf;

/// Which parts of a user's history get shredded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSelection {
    Comments,
    Submitted,
    /// Both comments and submissions.
    Overview,
}

/// The order in which a batch is worked through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    /// Newest first.
    New,
    /// Highest score first.
    Top,
    /// Lowest score first.
    Controversial,
    /// As Reddit lists them.
    Hot,
}

/// What an item's text is replaced with before it is deleted.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Replacement {
    /// A short run of filler words.
    Random,
    Dot,
    Literal(String),
}

impl From<String> for Replacement {
    fn from(format: String) -> Self {
        match format.as_str() {
            "random" => Self::Random,
            "dot" => Self::Dot,
            _ => Self::Literal(format),
        }
    }
}

/// `null` in YAML means "use the empty value" for lists and flags.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The typed form of a resolved configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub ask_pass: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub verbose: bool,
    pub item: ItemSelection,
    pub sort: Sort,
    /// Items younger than this are kept.
    pub hours: u64,
    /// Items older than this are removed even when whitelisted.
    pub nuke_hours: Option<u64>,
    /// Items scoring above this are kept.
    pub max_score: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub whitelist: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub whitelist_ids: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub whitelist_distinguished: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub whitelist_gilded: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub blacklist: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub keep_a_copy: bool,
    pub save_directory: Option<PathBuf>,
    #[serde(deserialize_with = "null_as_default")]
    pub trial_run: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub edit_only: bool,
    pub replacement_format: Replacement,
    /// Seconds to wait between batches.
    #[serde(deserialize_with = "null_as_default")]
    pub batch_cooldown: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            ask_pass: false,
            verbose: true,
            item: ItemSelection::Overview,
            sort: Sort::New,
            hours: 24,
            nuke_hours: None,
            max_score: Some(100),
            whitelist: vec![],
            whitelist_ids: vec![],
            whitelist_distinguished: true,
            whitelist_gilded: true,
            blacklist: vec![],
            keep_a_copy: false,
            save_directory: Some(PathBuf::from("/tmp")),
            trial_run: false,
            edit_only: false,
            replacement_format: Replacement::Random,
            batch_cooldown: 10,
        }
    }
}

impl Settings {
    pub fn from_mapping(mapping: &Mapping) -> Result<Self, ConfigError> {
        serde_yaml::from_value(Value::Mapping(mapping.clone())).map_err(ConfigError::Invalid)
    }
}
