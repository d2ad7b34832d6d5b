mod dda;
mod grid;
mod math;
mod spatial;
mod tile;

pub use dda::{DdaStep, GridRay, Side};
pub use grid::{GridMap, TileTarget};
pub use math::{Rect, Vec2, Vec3, SMALL};
pub use spatial::{SpatialIndex, NEIGHBORHOOD};
pub use tile::{
    format_tile_key, parse_tile_key, tile_key, InvalidTile, Rgb, Semitile, SemitileAxis, TextureId,
    Tile, TileKey, TilePatch, DEFAULT_CAP_COLOR, PLACEHOLDER_TEXTURE,
};
