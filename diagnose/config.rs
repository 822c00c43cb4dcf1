//! # Session Configuration
//!
//! Everything a session needs to know before startup: where the classifier artifact
//! lives, how to obtain the reference dataset, which defaults policy fills unexposed
//! slots and which fields the form exposes. Values come from an optional `fnacast.toml`
//! and are then overridden by command-line flags in the binary.
//!
//! ```toml
//! model_path = "svm_model.toml"
//!
//! [dataset]
//! cache_dir = ".fnacast"
//! offline = false
//!
//! [defaults]
//! policy = "literal"
//!
//! [defaults.literal]
//! worst_area = 1500.0
//!
//! [form]
//! fields = "all"
//! ```

use crate::assemble::PolicyKind;
use crate::features::{Feature, FeatureError};
use crate::present::FieldSet;
use log::info;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File consulted in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "fnacast.toml";

/// UCI repository identifier of the Breast Cancer Wisconsin (Diagnostic) dataset.
pub const UCI_DATASET_ID: u32 = 17;

pub const DEFAULT_DATASET_URL: &str =
    "https://archive.ics.uci.edu/ml/machine-learning-databases/breast-cancer-wisconsin/wdbc.data";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{}': {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("Failed to parse configuration file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid entry in [defaults.literal]: {0}")]
    Feature(#[from] FeatureError),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub form: FormConfig,
}

/// Where the reference dataset comes from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    #[serde(default = "default_dataset_id")]
    pub id: u32,
    #[serde(default = "default_dataset_url")]
    pub url: String,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// A local copy to read instead of the cache or the network.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Never touch the network; fail if nothing is cached.
    #[serde(default)]
    pub offline: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub policy: PolicyKind,
    /// Per-feature replacements for the built-in literal table. Only used by the
    /// `literal` policy.
    #[serde(default)]
    pub literal: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormConfig {
    #[serde(default)]
    pub fields: FieldSet,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("svm_model.toml")
}

fn default_dataset_id() -> u32 {
    UCI_DATASET_ID
}

fn default_dataset_url() -> String {
    DEFAULT_DATASET_URL.to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".fnacast")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            dataset: DatasetConfig::default(),
            defaults: DefaultsConfig::default(),
            form: FormConfig::default(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            id: default_dataset_id(),
            url: default_dataset_url(),
            cache_dir: default_cache_dir(),
            path: None,
            offline: false,
        }
    }
}

impl AppConfig {
    /// Loads the configuration.
    ///
    /// With an explicit path the file must exist. Without one, `fnacast.toml` in the
    /// working directory is used if present, and built-in defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        info!("Loaded configuration from '{}'", path.display());
        Ok(config)
    }

    /// Literal override keys must be canonical feature names, and their values finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, &value) in &self.defaults.literal {
            let feature: Feature = name.parse()?;
            if !value.is_finite() {
                return Err(FeatureError::NonFiniteValue { feature, value }.into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn empty_file_yields_defaults() {
        let file = write_config("");
        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.model_path, PathBuf::from("svm_model.toml"));
        assert_eq!(config.dataset.id, 17);
        assert_eq!(config.dataset.url, DEFAULT_DATASET_URL);
        assert!(!config.dataset.offline);
        assert_eq!(config.defaults.policy, PolicyKind::DatasetMean);
        assert_eq!(config.form.fields, FieldSet::Key);
    }

    #[test]
    fn sections_are_parsed() {
        let file = write_config(
            r#"
model_path = "models/linear.toml"

[dataset]
path = "data/wdbc.data"
offline = true

[defaults]
policy = "literal"

[defaults.literal]
worst_area = 1500.0

[form]
fields = "all"
"#,
        );
        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.model_path, PathBuf::from("models/linear.toml"));
        assert_eq!(config.dataset.path, Some(PathBuf::from("data/wdbc.data")));
        assert!(config.dataset.offline);
        assert_eq!(config.dataset.cache_dir, PathBuf::from(".fnacast"));
        assert_eq!(config.defaults.policy, PolicyKind::Literal);
        assert_eq!(config.defaults.literal.get("worst_area"), Some(&1500.0));
        assert_eq!(config.form.fields, FieldSet::All);
    }

    #[test]
    fn unknown_literal_keys_are_rejected() {
        let file = write_config("[defaults.literal]\ntumor_volume = 2.0\n");
        match AppConfig::from_file(file.path()) {
            Err(ConfigError::Feature(FeatureError::UnknownFeature(name))) => {
                assert_eq!(name, "tumor_volume")
            }
            other => panic!("expected UnknownFeature, got {other:?}"),
        }
    }

    #[test]
    fn unknown_policy_is_a_parse_error() {
        let file = write_config("[defaults]\npolicy = \"median\"\n");
        assert!(matches!(
            AppConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn explicit_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            AppConfig::load(Some(&missing)),
            Err(ConfigError::Io { .. })
        ));
    }
}
