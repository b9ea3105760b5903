use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
mod audio;
mod checkpoint;
mod commands;
pub mod content;
mod context;
mod dispatch;
mod game;
mod motion;
mod player;
mod scene;
mod schedule;
mod timeline;

pub use app::{
    run_app, run_app_with_metrics, run_headless, AppError, ArcadeConfig, ArcadeWorld,
    HeadlessSummary, InputAction, InputSnapshot, LoopConfig, LoopMetricsSnapshot, MetricsHandle,
    SLOW_FRAME_ENV_VAR,
};
pub use audio::{AudioCommand, AudioDirector, SoundKey, BACKGROUND_VOLUME, LONG_SOUNDS};
pub use checkpoint::{
    CheckpointEntry, CheckpointId, CheckpointManager, CheckpointTable, LaunchParams, Placement,
    MAX_GAME_RATIO, MIN_GAME_RATIO,
};
pub use commands::{Contact, ContactSide, EngineCommand, ObjectHandle, Rect};
pub use content::{
    Collision, ConfigError, FileProgressStore, GameConfig, LevelData, LevelError,
    MemoryProgressStore, PickupItem, Progress, ProgressError, ProgressStore, SpawnDescriptor,
    SpawnKind,
};
pub use context::{
    BoardCue, BodySnapshot, CameraRig, GameContext, RestartMode, SceneOutputs, SceneSize,
    SurfBoard,
};
pub use dispatch::{DispatchOutcome, EventDispatcher, Handler};
pub use game::{EngineBackend, Game, GameSetup, TickInput, TickReport};
pub use motion::{resolve_motion, MotionBranch, MotionInput, MotionOutcome};
pub use player::{BodyDimensions, BodyProfile, PlayerAnimation, PlayerState, PlayerTuning};
pub use scene::{
    RegistrationReport, SceneAction, SceneId, SceneLifecycle, SceneRegistration, SceneRegistry,
};
pub use schedule::{Cutscene, CutsceneStatus, DelayedAction, Scheduler, TimerId};
pub use timeline::{SeekPolicy, TimelineError, TimelineEvent, TimelineIndex};

pub const ROOT_ENV_VAR: &str = "DATARUN_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub cache_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create cache directory at {path}: {source}")]
    CreateCacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "DATARUN_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
PowerShell: $env:{env_var}=\"C:\\path\\to\\datarun\"\n\
Bash/zsh: export {env_var}=\"/path/to/datarun\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let assets_dir = root.join("assets");
    let cache_dir = root.join("cache");

    fs::create_dir_all(&cache_dir).map_err(|source| StartupError::CreateCacheDir {
        path: cache_dir.clone(),
        source,
    })?;

    Ok(AppPaths {
        root,
        assets_dir,
        cache_dir,
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_repo_marker(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let cwd = env::current_dir().expect("cwd");
        assert!(!is_repo_marker(&cwd.join("definitely_not_a_marker")));
    }

    #[test]
    fn repo_marker_accepts_cargo_toml_with_assets() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("Cargo.toml"), "[workspace]\n").expect("cargo toml");
        assert!(!is_repo_marker(temp.path()));

        fs::create_dir(temp.path().join("assets")).expect("assets dir");
        assert!(is_repo_marker(temp.path()));
    }
}
