mod input;
mod loop_runner;
mod metrics;
mod present;
mod scene;

pub use input::{InputAction, InputSnapshot, WEAPON_SLOTS};
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use present::Presenter;
pub use scene::{LevelScene, Scene};
