use std::env;
use std::path::PathBuf;

use engine::{
    load_level_json, resolve_app_paths, AssetTable, LevelLoadError, LevelScene, LoopConfig, Scene,
    StartupError, TracingSound,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::script::DemoScript;

pub(crate) const LEVEL_ENV_VAR: &str = "RAYCAST_LEVEL";
const DEFAULT_LEVEL_FILE: &str = "demo.json";

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Level(#[from] LevelLoadError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Raycaster Startup ===");

    let level_path = resolve_level_path()?;
    let level = load_level_json(&level_path)?;
    let assets = AssetTable::load(&level.textures);
    let scene = LevelScene::new(
        level,
        assets,
        Box::new(DemoScript::default()),
        Box::new(TracingSound),
    );

    Ok(AppWiring {
        config: LoopConfig::default(),
        scene: Box::new(scene),
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

/// `RAYCAST_LEVEL` wins; otherwise the demo level under the project's assets.
fn resolve_level_path() -> Result<PathBuf, StartupError> {
    if let Some(path) = level_path_from_env() {
        return Ok(path);
    }
    let paths = resolve_app_paths()?;
    Ok(paths.levels_dir.join(DEFAULT_LEVEL_FILE))
}

fn level_path_from_env() -> Option<PathBuf> {
    env::var_os(LEVEL_ENV_VAR)
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}
