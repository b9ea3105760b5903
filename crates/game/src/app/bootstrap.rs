use std::env;

use datarun_engine::content::CONFIG_FILE_NAME;
use datarun_engine::{
    resolve_app_paths, AppPaths, ArcadeConfig, ArcadeWorld, ConfigError, FileProgressStore, Game,
    GameConfig, GameSetup, LaunchParams, LevelData, LevelError, LoopConfig, SceneSize,
    StartupError,
};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::scenes;

const QUERY_ENV_VAR: &str = "DATARUN_QUERY";
const HEADLESS_TICKS_ENV_VAR: &str = "DATARUN_HEADLESS_TICKS";

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Level(#[from] LevelError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) game: Game,
    pub(crate) world: ArcadeWorld,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Data Run Startup ===");

    let paths = resolve_app_paths()?;
    let query = env::var(QUERY_ENV_VAR)
        .ok()
        .or_else(|| env::args().nth(1))
        .unwrap_or_default();
    let launch = LaunchParams::from_query(&query);
    let game = build_game(&paths, launch)?;
    let world = ArcadeWorld::new(ArcadeConfig::for_game(game.ctx()));
    let config = LoopConfig {
        headless_ticks: parse_headless_ticks(env::var(HEADLESS_TICKS_ENV_VAR).ok().as_deref()),
        ..LoopConfig::default()
    };

    Ok(AppWiring {
        config,
        game,
        world,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn build_game(paths: &AppPaths, launch: LaunchParams) -> Result<Game, BootstrapError> {
    let config = GameConfig::load_or_default(&paths.assets_dir.join(CONFIG_FILE_NAME))?;
    let level = LevelData::load(&config.level_path_under(&paths.root))?;
    let store = FileProgressStore::in_cache_dir(&paths.cache_dir);
    info!(
        progress = %store.path().display(),
        checkpoint = ?launch.checkpoint,
        "game_wiring"
    );
    let setup = GameSetup {
        config,
        level,
        screen: SceneSize::default(),
        launch,
    };
    Ok(Game::new(setup, scenes::all_scenes(), Box::new(store)))
}

fn parse_headless_ticks(raw: Option<&str>) -> Option<u64> {
    let raw = raw?.trim();
    match raw.parse::<u64>() {
        Ok(0) => None,
        Ok(ticks) => Some(ticks),
        Err(_) => {
            warn!(env_var = HEADLESS_TICKS_ENV_VAR, value = raw, "headless_ticks_ignored");
            None
        }
    }
}
