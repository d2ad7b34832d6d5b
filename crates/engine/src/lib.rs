use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod audio;
pub mod combat;
pub mod entity;
pub mod level;
pub mod render;
pub mod world;

pub use app::{
    run_app, run_app_with_metrics, AppError, InputAction, InputSnapshot, LevelScene, LoopConfig,
    LoopMetricsSnapshot, MetricsHandle, Presenter, Scene, SLOW_FRAME_ENV_VAR, WEAPON_SLOTS,
};
pub use audio::{NullSound, SoundId, SoundSink, TracingSound};
pub use level::{
    load_level_json, Environment, Level, LevelLoadError, LevelScript, NoScript, Surface,
};
pub use render::{
    render_frame, render_view, AssetError, AssetTable, Camera, CameraConfig, FrameBuffer,
};
pub use world::{GridMap, Tile, TileKey, TilePatch, TileTarget, Vec2};

pub const ROOT_ENV_VAR: &str = "RAYCAST_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub levels_dir: PathBuf,
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
    #[error("asset directory is missing: {path}")]
    MissingAssets { path: PathBuf },
    #[error(
        "RAYCAST_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain an assets/ directory next to Cargo.toml or crates/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing assets/ and either Cargo.toml or crates/.\n\
Set {env_var} explicitly, for example:\n\
PowerShell: $env:{env_var}=\"C:\\path\\to\\raycaster\"\n\
Bash/zsh: export {env_var}=\"/path/to/raycaster\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let assets_dir = root.join("assets");
    let levels_dir = assets_dir.join("levels");

    if !assets_dir.is_dir() {
        return Err(StartupError::MissingAssets { path: assets_dir });
    }

    Ok(AppPaths {
        root,
        assets_dir,
        levels_dir,
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

    has_assets && (cargo_toml || has_crates)
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
    fn repo_marker_needs_assets_beside_a_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("Cargo.toml"), "[workspace]\n").expect("write manifest");
        assert!(!is_repo_marker(dir.path()));

        fs::create_dir(dir.path().join("assets")).expect("create assets");
        assert!(is_repo_marker(dir.path()));
    }
}
