use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

mod update;

pub use update::{UPDATE_ENV_VAR, UPDATE_FLAGS, UpdateMode};

/// Name of the project-level config file looked up by [`Config::load_from_dir`].
pub const CONFIG_FILE_NAME: &str = "verbatim-shot.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid spec location '{spec}' in {config_path}: {source}")]
    InvalidSpecPattern {
        config_path: PathBuf,
        spec: String,
        source: glob::PatternError,
    },
}

/// What the snapshot store does when a `manifest.json` exists but cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorruptManifestPolicy {
    /// Surface the parse error to the failing assertion.
    #[default]
    Fail,
    /// Log a warning and carry on as if no manifest had been written yet.
    TreatAsMissing,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Test spec locations: literal paths or glob patterns, relative to the project directory.
    #[serde(deserialize_with = "one_or_many")]
    pub spec: Vec<String>,
    /// Overrides the default `<test root>/snapshots/verbatim` location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_root: Option<PathBuf>,
    pub on_corrupt_manifest: CorruptManifestPolicy,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        for spec in &config.spec {
            glob::Pattern::new(spec).map_err(|source| ConfigError::InvalidSpecPattern {
                config_path: config_path.to_path_buf(),
                spec: spec.clone(),
                source,
            })?;
        }

        // Expand shell variables and tilde in the snapshot root override
        config.snapshot_root = config
            .snapshot_root
            .map(|root| Self::expand_path(&root).unwrap_or(root));

        Ok(Some(config))
    }

    /// Load `verbatim-shot.toml` from the given project directory.
    pub fn load_from_dir<P: AsRef<Path>>(project_dir: P) -> Result<Option<Self>, ConfigError> {
        Self::load_from_path(Self::config_path(project_dir))
    }

    pub fn config_path<P: AsRef<Path>>(project_dir: P) -> PathBuf {
        project_dir.as_ref().join(CONFIG_FILE_NAME)
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

/// Accept `spec = "test/**/*.rs"` as well as `spec = ["a", "b"]`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(spec) => vec![spec],
        OneOrMany::Many(specs) => specs,
    })
}
