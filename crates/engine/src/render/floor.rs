use crate::level::{Environment, Surface};
use crate::world::{Rgb, TextureId};

use super::camera::Projection;
use super::frame::{shade, FrameBuffer};
use super::texture::AssetTable;

const BLACK: [u8; 4] = [0, 0, 0, 255];

/// Fills every row of `out`: rows at and below the horizon from the floor
/// surface, rows above it from the ceiling.
pub(crate) fn draw_floor_and_ceiling(
    view: &Projection,
    environment: &Environment,
    assets: &AssetTable,
    out: &mut FrameBuffer,
) {
    for y in 0..view.height {
        let row = y as f32;
        if row >= view.horizon {
            let offset = row - view.horizon + 1.0;
            let mult = view.focal * view.camera.elevation;
            draw_row(view, environment, assets, out, y, environment.floor, offset, mult);
        } else {
            let offset = view.horizon - row;
            let mult = view.focal * (environment.ceiling_elevation - view.camera.elevation);
            draw_row(view, environment, assets, out, y, environment.ceiling, offset, mult);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_row(
    view: &Projection,
    environment: &Environment,
    assets: &AssetTable,
    out: &mut FrameBuffer,
    y: i32,
    surface: Surface,
    offset: f32,
    mult: f32,
) {
    let lighting = row_lighting(offset, view.semiheight, environment.darkness);
    match surface {
        Surface::Color(rgb) => {
            let color = shade(opaque(rgb), lighting);
            for x in 0..view.width {
                out.put(x, y, color);
            }
        }
        Surface::Sky(texture) => draw_sky_row(view, assets, out, y, texture),
        Surface::Texture(texture) => {
            // The camera is on the far side of this plane.
            if mult <= 0.0 {
                for x in 0..view.width {
                    out.put(x, y, BLACK);
                }
                return;
            }
            let image = assets.get(texture);
            let distance = mult / offset;
            let reach = distance / view.ym;
            let left = view.camera.pos + view.column_ray(0) * reach;
            let step = view.right * (2.0 * reach / view.width.max(1) as f32);
            for x in 0..view.width {
                let world = left + step * x as f32;
                out.put(x, y, shade(image.sample(world.x, world.y), lighting));
            }
        }
    }
}

fn draw_sky_row(
    view: &Projection,
    assets: &AssetTable,
    out: &mut FrameBuffer,
    y: i32,
    texture: TextureId,
) {
    let image = assets.get(texture);
    let width = view.width.max(1) as f32;
    let scroll = -view.camera.yaw * width / 100.0;
    let row = y as f32;
    let v = if row < view.horizon {
        row / view.horizon.max(1.0)
    } else {
        (row - view.horizon) / (view.height as f32 - view.horizon).max(1.0)
    };
    for x in 0..view.width {
        let u = (x as f32 + scroll) / width;
        out.put(x, y, image.sample(u, v));
    }
}

/// Rows near the horizon are far away and darker.
fn row_lighting(offset: f32, semiheight: f32, darkness: f32) -> f32 {
    if darkness <= 0.0 || semiheight <= 0.0 {
        return 1.0;
    }
    (offset / semiheight / darkness).min(1.0)
}

fn opaque(rgb: Rgb) -> [u8; 4] {
    [rgb[0], rgb[1], rgb[2], 255]
}
