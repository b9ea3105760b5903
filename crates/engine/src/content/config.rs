use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::checkpoint::CheckpointTable;
use crate::player::PlayerTuning;
use crate::timeline::SeekPolicy;

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_LEVEL_PATH: &str = "assets/levels/datarun.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path} at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Gameplay tuning read from `assets/config.json`; every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    pub tuning: PlayerTuning,
    pub seek_policy: SeekPolicy,
    pub checkpoints: CheckpointTable,
    /// Relative paths resolve against the project root.
    pub level_path: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tuning: PlayerTuning::default(),
            seek_policy: SeekPolicy::default(),
            checkpoints: CheckpointTable::default(),
            level_path: PathBuf::from(DEFAULT_LEVEL_PATH),
        }
    }
}

impl GameConfig {
    /// A missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "config_defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config = Self::from_json_str(path, &raw)?;
        info!(path = %path.display(), "config_loaded");
        Ok(config)
    }

    pub fn from_json_str(path: &Path, raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize::<_, Self>(&mut deserializer).map_err(|error| {
            let json_path = error.path().to_string();
            ConfigError::Parse {
                path: path.to_path_buf(),
                json_path,
                source: error.into_inner(),
            }
        })
    }

    pub fn level_path_under(&self, root: &Path) -> PathBuf {
        if self.level_path.is_absolute() {
            self.level_path.clone()
        } else {
            root.join(&self.level_path)
        }
    }
}
