use std::collections::BTreeSet;

use crate::entity::{EntityId, EntityManager};
use crate::world::TextureId;

use super::camera::{fog_factor, Projection};
use super::frame::{shade, FrameBuffer};
use super::texture::AssetTable;
use super::walls::{pixel_edge, WallScan};

/// A sprite placed on screen, ready to blit.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Billboard {
    texture: TextureId,
    depth: f32,
    left: f32,
    top: f32,
    width: f32,
    height: f32,
}

/// Draws every entity standing on a tile the wall pass reached, far to near,
/// clipped per column against nearer walls.
pub(crate) fn draw_sprites(
    view: &Projection,
    entities: &EntityManager,
    viewer: Option<EntityId>,
    scan: &WallScan,
    darkness: f32,
    assets: &AssetTable,
    layer: &mut FrameBuffer,
) {
    let candidates: BTreeSet<EntityId> = scan
        .visible
        .iter()
        .flat_map(|key| entities.spatial().neighbors(*key))
        .filter(|id| Some(*id) != viewer)
        .collect();

    let mut billboards: Vec<Billboard> = candidates
        .into_iter()
        .filter_map(|id| entities.get(id))
        .filter_map(|entity| {
            let texture = entity.texture_for(view.camera.pos)?;
            let (lateral, depth) = view.to_camera(entity.pos);
            if depth < view.config.min_entity_depth {
                return None;
            }
            let scale = view.focal / depth;
            let width = entity.body.render_width * scale;
            let height = entity.body.render_height * scale;
            let bottom = view.screen_y(entity.elevation, scale);
            Some(Billboard {
                texture,
                depth,
                left: view.screen_x(lateral, depth) - width / 2.0,
                top: bottom - height,
                width,
                height,
            })
        })
        .collect();
    billboards.sort_by(|a, b| b.depth.total_cmp(&a.depth));

    for billboard in &billboards {
        blit(view, billboard, scan, darkness, assets, layer);
    }
}

fn blit(
    view: &Projection,
    billboard: &Billboard,
    scan: &WallScan,
    darkness: f32,
    assets: &AssetTable,
    layer: &mut FrameBuffer,
) {
    if billboard.width <= 0.0 || billboard.height <= 0.0 {
        return;
    }
    let image = assets.get(billboard.texture);
    let fog = fog_factor(billboard.depth, darkness);
    let first = pixel_edge(billboard.left).max(0);
    let last = pixel_edge(billboard.left + billboard.width).min(view.width);
    let top = pixel_edge(billboard.top);
    let bottom = pixel_edge(billboard.top + billboard.height);

    for x in first..last {
        let Some(column) = scan.columns.get(x as usize) else {
            continue;
        };
        let u = (x as f32 + 0.5 - billboard.left) / billboard.width;
        for (start, end) in column.visible_rows(view.height, top, bottom, billboard.depth) {
            for y in start..end {
                let v = (y as f32 + 0.5 - billboard.top) / billboard.height;
                let texel = image.sample(u.clamp(0.0, 0.999), v.clamp(0.0, 0.999));
                if texel[3] == 0 {
                    continue;
                }
                layer.put(x, y, shade(texel, fog));
            }
        }
    }
}
