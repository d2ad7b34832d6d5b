//! Column raycaster. Each frame is drawn as two layers in parallel: floor and
//! ceiling rows on a worker thread, walls and sprites on the caller's thread.
//! The wall layer is composited over the backdrop wherever it drew.

mod camera;
mod floor;
mod frame;
mod hud;
mod limits;
mod sprites;
mod texture;
mod walls;

use std::thread;

use tracing::{error, warn};

use crate::level::Level;

pub use camera::{Camera, CameraConfig};
pub use frame::FrameBuffer;
pub use limits::Limits;
pub use texture::{load_image, AssetError, AssetTable, Image};

use camera::Projection;

const EMPTY_COLOR: [u8; 4] = [0, 0, 0, 255];

/// Renders the level from the player's eye into `out`, including the held
/// weapon. A level without a player renders black.
pub fn render_frame(
    level: &Level,
    assets: &AssetTable,
    config: CameraConfig,
    out: &mut FrameBuffer,
) {
    let Some(player) = level.entities.player() else {
        out.fill(EMPTY_COLOR);
        return;
    };
    let camera = Camera::from_entity(player);
    render_view(level, assets, camera, config, out);

    let Some(state) = player.player() else {
        return;
    };
    if let Some(texture) = state.weapon_frame(&level.weapons, level.timer()) {
        hud::draw_weapon(out, assets.get(texture), state.weapon_offset);
    }
}

/// Renders the world as seen by `camera`; the player entity itself is never drawn.
pub fn render_view(
    level: &Level,
    assets: &AssetTable,
    camera: Camera,
    config: CameraConfig,
    out: &mut FrameBuffer,
) {
    let (width, height) = (out.width(), out.height());
    if width == 0 || height == 0 {
        return;
    }
    let view = Projection::new(camera, config, width, height);
    let environment = &level.environment;

    let (backdrop, world) = thread::scope(|scope| {
        let backdrop_pass = || {
            let mut layer = FrameBuffer::new(width, height);
            floor::draw_floor_and_ceiling(&view, environment, assets, &mut layer);
            layer
        };
        let worker = thread::Builder::new()
            .name("render-backdrop".to_string())
            .spawn_scoped(scope, backdrop_pass);

        let mut world = FrameBuffer::new(width, height);
        let scan = walls::draw_walls(&view, &level.grid, environment.darkness, assets, &mut world);
        sprites::draw_sprites(
            &view,
            &level.entities,
            level.entities.player_id(),
            &scan,
            environment.darkness,
            assets,
            &mut world,
        );

        let backdrop = match worker {
            Ok(handle) => handle.join().unwrap_or_else(|_| {
                error!("render_backdrop_thread_panicked");
                let mut layer = FrameBuffer::new(width, height);
                layer.fill(EMPTY_COLOR);
                layer
            }),
            Err(spawn_error) => {
                warn!(error = %spawn_error, "render_thread_spawn_failed_running_inline");
                backdrop_pass()
            }
        };
        (backdrop, world)
    });

    *out = backdrop;
    out.overlay(&world);
}
