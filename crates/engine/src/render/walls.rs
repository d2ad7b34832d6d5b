use std::collections::BTreeSet;

use crate::world::{tile_key, GridMap, GridRay, Rect, Rgb, Side, Tile, TileKey, Vec2};

use super::camera::{fog_factor, Projection};
use super::frame::{shade, FrameBuffer};
use super::limits::Limits;
use super::texture::AssetTable;

/// Smallest depth a wall slice is projected at.
const NEAR_PLANE: f32 = 1e-3;
const FACE_EPSILON: f32 = 1e-4;

/// Wall pixels painted in one screen column, nearest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct DepthColumn {
    segments: Vec<(i32, i32, f32)>,
}

impl DepthColumn {
    fn push(&mut self, start: i32, end: i32, depth: f32) {
        if start < end {
            self.segments.push((start, end, depth));
        }
    }

    /// Rows of `[start, end)` not hidden by a wall nearer than `depth`.
    pub fn visible_rows(&self, height: i32, start: i32, end: i32, depth: f32) -> Vec<(i32, i32)> {
        let mut nearer = Limits::new(height);
        for &(covered_start, covered_end, covered_depth) in &self.segments {
            if covered_depth < depth {
                nearer.add(covered_start, covered_end);
            }
        }
        nearer.gaps(start, end)
    }
}

/// What the wall pass leaves behind for the sprite pass.
#[derive(Debug, Default)]
pub(crate) struct WallScan {
    pub columns: Vec<DepthColumn>,
    /// Tiles some column's ray reached before its column filled up.
    pub visible: BTreeSet<TileKey>,
}

struct ColumnPass<'a> {
    view: &'a Projection,
    assets: &'a AssetTable,
    darkness: f32,
    x: i32,
    limits: Limits,
    depths: DepthColumn,
}

/// Casts one ray per column and paints walls front to back, each pixel at
/// most once.
pub(crate) fn draw_walls(
    view: &Projection,
    grid: &GridMap,
    darkness: f32,
    assets: &AssetTable,
    layer: &mut FrameBuffer,
) -> WallScan {
    let mut scan = WallScan {
        columns: Vec::with_capacity(view.width.max(0) as usize),
        visible: BTreeSet::new(),
    };
    let origin = view.camera.pos;
    let start_tile = tile_key(origin);
    scan.visible.insert(start_tile);

    for x in 0..view.width {
        let mut pass = ColumnPass {
            view,
            assets,
            darkness,
            x,
            limits: Limits::new(view.height),
            depths: DepthColumn::default(),
        };
        let dir = view.column_ray(x);
        if let Some(mut ray) = GridRay::new(origin, dir) {
            // Partial tiles can share the camera's tile.
            if let Some(tile) = grid.get(start_tile).filter(|tile| tile.is_partial()) {
                pass.draw_partial(tile, start_tile, &ray, 0.0, ray.next_t(), layer);
            }
            while let Some(step) = ray.next() {
                if view.depth_of(step.t) > view.config.render_distance || pass.limits.is_full() {
                    break;
                }
                scan.visible.insert(step.tile);
                let Some(tile) = grid.get(step.tile) else {
                    continue;
                };
                let far_t = ray.next_t();
                if tile.is_partial() {
                    pass.draw_partial(tile, step.tile, &ray, step.t, far_t, layer);
                } else {
                    let u = face_u(step.side, step.point, dir);
                    pass.draw_slice(tile, step.t, far_t, u, layer);
                }
            }
        }
        scan.columns.push(pass.depths);
    }
    scan
}

/// Horizontal texture coordinate on a full tile face, mirrored so textures
/// read the same way from both sides.
fn face_u(side: Side, point: Vec2, dir: Vec2) -> f32 {
    let raw = match side {
        Side::X => point.y,
        Side::Y => point.x,
    };
    let u = raw - raw.floor();
    let flip = match side {
        Side::X => dir.x < 0.0,
        Side::Y => dir.y > 0.0,
    };
    if flip {
        1.0 - u
    } else {
        u
    }
}

/// First pixel whose centre lies at or past screen coordinate `v`.
pub(crate) fn pixel_edge(v: f32) -> i32 {
    (v - 0.5).ceil() as i32
}

/// Texture coordinate where a ray enters a sub-tile footprint.
fn rect_face_u(rect: &Rect, enter: Vec2) -> f32 {
    let on_vertical_face = rect.h > 0.0
        && (rect.w == 0.0
            || (enter.x - rect.left()).abs() < FACE_EPSILON
            || (enter.x - rect.right()).abs() < FACE_EPSILON);
    let raw = if on_vertical_face { enter.y } else { enter.x };
    raw - raw.floor()
}

impl ColumnPass<'_> {
    fn draw_partial(
        &mut self,
        tile: &Tile,
        key: TileKey,
        ray: &GridRay,
        near_t: f32,
        far_t: f32,
        layer: &mut FrameBuffer,
    ) {
        let a = ray.point_at(near_t);
        let b = ray.point_at(far_t);
        let rect = tile.render_rect(key);
        let Some((enter, exit)) = rect.clip_segment(a, b) else {
            return;
        };
        let span = b - a;
        let length = span.length_squared();
        let param = |point: Vec2| {
            if length > 0.0 {
                near_t + (point - a).dot(span) / length * (far_t - near_t)
            } else {
                near_t
            }
        };
        self.draw_slice(tile, param(enter), param(exit), rect_face_u(&rect, enter), layer);
    }

    /// Paints the front face of `tile` at `near_t` and whichever cap the
    /// camera can see, reaching back to `far_t`.
    fn draw_slice(
        &mut self,
        tile: &Tile,
        near_t: f32,
        far_t: f32,
        u: f32,
        layer: &mut FrameBuffer,
    ) {
        let view = self.view;
        let near_depth = view.depth_of(near_t).max(NEAR_PLANE);
        let scale = view.scale_at(near_depth);
        let top_y = view.screen_y(tile.top(), scale);
        let bottom_y = view.screen_y(tile.elevation, scale);
        let fog = fog_factor(near_depth, self.darkness);

        let image = self.assets.get(tile.texture);
        let (start, end) = (pixel_edge(top_y), pixel_edge(bottom_y));
        for (gap_start, gap_end) in self.limits.gaps(start, end) {
            for y in gap_start..gap_end {
                let v = (y as f32 + 0.5 - top_y) / scale;
                let mut color = shade(image.sample(u, v), fog);
                color[3] = 255;
                layer.put(self.x, y, color);
            }
            self.depths.push(gap_start, gap_end, near_depth);
        }
        self.limits.add(start, end);

        let far_depth = view.depth_of(far_t).max(near_depth);
        let far_scale = view.scale_at(far_depth);
        let eye = view.camera.elevation;
        if eye > tile.top() {
            let far_top = view.screen_y(tile.top(), far_scale);
            self.draw_cap(pixel_edge(far_top), start, tile.top_color(), fog, far_depth, layer);
        } else if eye < tile.elevation {
            let far_bottom = view.screen_y(tile.elevation, far_scale);
            self.draw_cap(end, pixel_edge(far_bottom), tile.bottom_color(), fog, far_depth, layer);
        }
    }

    fn draw_cap(
        &mut self,
        start: i32,
        end: i32,
        color: Rgb,
        fog: f32,
        depth: f32,
        layer: &mut FrameBuffer,
    ) {
        let color = shade([color[0], color[1], color[2], 255], fog);
        for (gap_start, gap_end) in self.limits.gaps(start, end) {
            for y in gap_start..gap_end {
                layer.put(self.x, y, color);
            }
            self.depths.push(gap_start, gap_end, depth);
        }
        self.limits.add(start, end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::camera::{Camera, CameraConfig};
    use crate::render::texture::Image;
    use crate::world::{Semitile, SemitileAxis, TextureId};

    const RED: [u8; 4] = [255, 0, 0, 255];
    const YELLOW: [u8; 4] = [255, 255, 0, 255];

    fn assets() -> AssetTable {
        AssetTable::from_images(vec![Image::solid(4, 4, RED), Image::solid(4, 4, YELLOW)])
    }

    fn view(elevation: f32) -> Projection {
        let camera = Camera {
            pos: Vec2::new(0.5, 0.5),
            yaw: 0.0,
            elevation,
        };
        Projection::new(camera, CameraConfig::default(), 40, 20)
    }

    fn render(grid: &GridMap, view: &Projection) -> (FrameBuffer, WallScan) {
        let mut layer = FrameBuffer::new(40, 20);
        let scan = draw_walls(view, grid, 0.0, &assets(), &mut layer);
        (layer, scan)
    }

    #[test]
    fn wall_ahead_fills_the_centre_column() {
        let grid = GridMap::from_tiles([((0, 3), Tile::default())]);
        let (layer, scan) = render(&grid, &view(0.5));

        // Depth 2.5 at focal 20 projects one unit to 8 rows around the horizon.
        for y in 6..14 {
            assert_eq!(layer.get(20, y), Some(RED), "row {y}");
        }
        assert_eq!(layer.get(20, 5).map(|pixel| pixel[3]), Some(0));
        assert_eq!(layer.get(20, 14).map(|pixel| pixel[3]), Some(0));
        assert!(scan.visible.contains(&(0, 3)));
        assert!(scan.visible.contains(&(0, 1)));
        assert_eq!(scan.columns.len(), 40);
    }

    #[test]
    fn low_wall_shows_its_top_cap_and_the_wall_behind() {
        let low = Tile {
            height: 0.25,
            texture: TextureId(1),
            top: Some([0, 255, 0]),
            ..Tile::default()
        };
        let grid = GridMap::from_tiles([((0, 2), low), ((0, 3), Tile::default())]);
        let (layer, _) = render(&grid, &view(0.5));

        // Face at depth 1.5 covers rows 13..17, the cap reaches back to row 12.
        assert_eq!(layer.get(20, 13), Some(YELLOW));
        assert_eq!(layer.get(20, 16), Some(YELLOW));
        assert_eq!(layer.get(20, 12), Some([0, 255, 0, 255]));
        assert_eq!(layer.get(20, 11), Some(RED));
        assert_eq!(layer.get(20, 8), Some(RED));
    }

    #[test]
    fn raised_block_shows_its_bottom_cap() {
        let floating = Tile {
            elevation: 0.75,
            height: 0.5,
            bottom: Some([0, 0, 255]),
            ..Tile::default()
        };
        let grid = GridMap::from_tiles([((0, 2), floating)]);
        let (layer, _) = render(&grid, &view(0.5));
        // Face covers rows 0..7; the underside seen past it is row 7.
        assert_eq!(layer.get(20, 7), Some([0, 0, 255, 255]));
        assert_eq!(layer.get(20, 5), Some(RED));
        assert_eq!(layer.get(20, 12).map(|pixel| pixel[3]), Some(0));
    }

    #[test]
    fn render_distance_stops_the_ray() {
        let grid = GridMap::from_tiles([((0, 12), Tile::default())]);
        let (layer, scan) = render(&grid, &view(0.5));
        assert!(layer.as_bytes().chunks_exact(4).all(|pixel| pixel[3] == 0));
        assert!(!scan.visible.contains(&(0, 12)));
    }

    #[test]
    fn semitile_draws_a_thin_partition_mid_tile() {
        let partition = Tile {
            semitile: Some(Semitile {
                axis: SemitileAxis::X,
                pos: Vec2::new(0.0, 0.5),
                width: 1.0,
            }),
            ..Tile::default()
        };
        let grid = GridMap::from_tiles([((0, 2), partition)]);
        let (layer, scan) = render(&grid, &view(0.5));
        // The partition sits at y = 2.5, depth 2, so it spans rows 5..15.
        assert_eq!(layer.get(20, 5), Some(RED));
        assert_eq!(layer.get(20, 14), Some(RED));
        assert_eq!(layer.get(20, 4).map(|pixel| pixel[3]), Some(0));
        let (start, end, depth) = scan.columns[20].segments[0];
        assert_eq!((start, end), (5, 15));
        assert!((depth - 2.0).abs() < 1e-4);
    }

    #[test]
    fn depth_column_hides_rows_behind_nearer_walls() {
        let mut column = DepthColumn::default();
        column.push(5, 10, 2.0);
        column.push(10, 12, 4.0);
        assert_eq!(column.visible_rows(20, 0, 20, 3.0), vec![(0, 5), (10, 20)]);
        assert_eq!(column.visible_rows(20, 0, 20, 5.0), vec![(0, 5), (12, 20)]);
        assert_eq!(column.visible_rows(20, 0, 20, 1.0), vec![(0, 20)]);
    }
}
