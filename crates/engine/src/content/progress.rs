use std::cell::Cell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::checkpoint::CheckpointId;

use super::atomic_io::write_text_atomic;

pub const PROGRESS_FILE_NAME: &str = "progress.json";

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("failed to read progress file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write progress file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse progress file {path} at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable resume state: the last reached checkpoint and the mute preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Progress {
    pub checkpoint: Option<CheckpointId>,
    pub sound_muted: bool,
}

pub trait ProgressStore {
    fn load(&self) -> Result<Progress, ProgressError>;
    fn save(&mut self, progress: &Progress) -> Result<(), ProgressError>;
}

/// `progress.json` under the cache directory. A missing file reads as the default.
#[derive(Debug, Clone)]
pub struct FileProgressStore {
    path: PathBuf,
}

impl FileProgressStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn in_cache_dir(cache_dir: &Path) -> Self {
        Self::new(cache_dir.join(PROGRESS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressStore for FileProgressStore {
    fn load(&self) -> Result<Progress, ProgressError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "progress_missing");
                return Ok(Progress::default());
            }
            Err(source) => {
                return Err(ProgressError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut deserializer = serde_json::Deserializer::from_str(&raw);
        serde_path_to_error::deserialize::<_, Progress>(&mut deserializer).map_err(|error| {
            let json_path = error.path().to_string();
            ProgressError::Parse {
                path: self.path.clone(),
                json_path,
                source: error.into_inner(),
            }
        })
    }

    fn save(&mut self, progress: &Progress) -> Result<(), ProgressError> {
        let json = serde_json::to_string_pretty(progress).map_err(|source| {
            ProgressError::Write {
                path: self.path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, source),
            }
        })?;
        write_text_atomic(&self.path, &json).map_err(|source| ProgressError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    progress: Progress,
    saves: usize,
    loads: Cell<usize>,
}

impl MemoryProgressStore {
    pub fn with_progress(progress: Progress) -> Self {
        Self {
            progress,
            ..Self::default()
        }
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn load_count(&self) -> usize {
        self.loads.get()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load(&self) -> Result<Progress, ProgressError> {
        self.loads.set(self.loads.get() + 1);
        Ok(self.progress)
    }

    fn save(&mut self, progress: &Progress) -> Result<(), ProgressError> {
        self.progress = *progress;
        self.saves += 1;
        Ok(())
    }
}
