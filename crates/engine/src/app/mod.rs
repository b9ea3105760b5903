mod arcade;
mod headless;
mod input;
mod loop_runner;
mod metrics;
mod rendering;

pub use arcade::{ArcadeConfig, ArcadeWorld, SoundState, WorldObject};
pub use headless::{run_headless, HeadlessSummary};
pub use input::{InputAction, InputSnapshot};
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use rendering::{world_to_screen_px, Renderer, SceneView, Viewport};
