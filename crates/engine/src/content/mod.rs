mod atomic_io;
mod config;
mod level;
mod progress;

pub use config::{ConfigError, GameConfig, CONFIG_FILE_NAME, DEFAULT_LEVEL_PATH};
pub use level::{Collision, LevelData, LevelError, PickupItem, SpawnDescriptor, SpawnKind};
pub use progress::{
    FileProgressStore, MemoryProgressStore, Progress, ProgressError, ProgressStore,
    PROGRESS_FILE_NAME,
};
