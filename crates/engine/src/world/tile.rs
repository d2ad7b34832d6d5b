use serde::Deserialize;
use thiserror::Error;

use super::math::{Rect, Vec2};

/// Integer grid coordinate used as the hash key for tiles and the spatial index.
pub type TileKey = (i32, i32);

pub type Rgb = [u8; 3];

/// Cap colour used when a tile does not declare one.
pub const DEFAULT_CAP_COLOR: Rgb = [0, 0, 0];

pub fn tile_key(pos: Vec2) -> TileKey {
    (pos.x.floor() as i32, pos.y.floor() as i32)
}

/// Formats a key the way level files spell it: `"x;y"`.
pub fn format_tile_key(key: TileKey) -> String {
    format!("{};{}", key.0, key.1)
}

pub fn parse_tile_key(raw: &str) -> Option<TileKey> {
    let (x, y) = raw.split_once(';')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct TextureId(pub u16);

/// Never registered; every lookup of it resolves to the checkerboard placeholder.
pub const PLACEHOLDER_TEXTURE: TextureId = TextureId(u16::MAX);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemitileAxis {
    /// Partition runs along x at a fixed local y.
    X,
    /// Partition runs along y at a fixed local x.
    Y,
}

/// Thin visual partition inside a tile, in tile-local [0,1] coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Semitile {
    pub axis: SemitileAxis,
    pub pos: Vec2,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub elevation: f32,
    pub height: f32,
    pub texture: TextureId,
    pub top: Option<Rgb>,
    pub bottom: Option<Rgb>,
    /// Tile-local sub-footprint `(x, y, w, h)`.
    pub rect: Option<Rect>,
    pub semitile: Option<Semitile>,
}

impl Default for Tile {
    fn default() -> Self {
        Self {
            elevation: 0.0,
            height: 1.0,
            texture: TextureId(0),
            top: None,
            bottom: None,
            rect: None,
            semitile: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InvalidTile {
    #[error("tile height must be positive, got {0}")]
    NonPositiveHeight(f32),
    #[error("tile elevation must not be negative, got {0}")]
    NegativeElevation(f32),
}

impl Tile {
    pub fn top(&self) -> f32 {
        self.elevation + self.height
    }

    pub fn validate(&self) -> Result<(), InvalidTile> {
        if !(self.height > 0.0) {
            return Err(InvalidTile::NonPositiveHeight(self.height));
        }
        if !(self.elevation >= 0.0) {
            return Err(InvalidTile::NegativeElevation(self.elevation));
        }
        Ok(())
    }

    pub fn top_color(&self) -> Rgb {
        self.top.unwrap_or(DEFAULT_CAP_COLOR)
    }

    pub fn bottom_color(&self) -> Rgb {
        self.bottom.unwrap_or(DEFAULT_CAP_COLOR)
    }

    /// World-space footprint used by collision and combat.
    pub fn collision_rect(&self, key: TileKey) -> Rect {
        let origin = Vec2::new(key.0 as f32, key.1 as f32);
        match self.rect {
            Some(local) => Rect::new(origin.x + local.x, origin.y + local.y, local.w, local.h),
            None => Rect::new(origin.x, origin.y, 1.0, 1.0),
        }
    }

    /// World-space footprint seen by rays. Semitiles render as a zero-thickness line.
    pub fn render_rect(&self, key: TileKey) -> Rect {
        let origin = Vec2::new(key.0 as f32, key.1 as f32);
        match self.semitile {
            Some(Semitile {
                axis: SemitileAxis::X,
                pos,
                width,
            }) => Rect::new(origin.x + pos.x, origin.y + pos.y, width, 0.0),
            Some(Semitile {
                axis: SemitileAxis::Y,
                pos,
                width,
            }) => Rect::new(origin.x + pos.x, origin.y + pos.y, 0.0, width),
            None => self.collision_rect(key),
        }
    }

    pub fn is_partial(&self) -> bool {
        self.rect.is_some() || self.semitile.is_some()
    }
}

/// Partial tile update. Unset fields inherit from the tile being patched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TilePatch {
    pub elevation: Option<f32>,
    pub height: Option<f32>,
    pub texture: Option<TextureId>,
    pub top: Option<Rgb>,
    pub bottom: Option<Rgb>,
    pub rect: Option<Rect>,
    pub semitile: Option<Semitile>,
}

impl TilePatch {
    pub fn apply(&self, base: &Tile) -> Tile {
        Tile {
            elevation: self.elevation.unwrap_or(base.elevation),
            height: self.height.unwrap_or(base.height),
            texture: self.texture.unwrap_or(base.texture),
            top: self.top.or(base.top),
            bottom: self.bottom.or(base.bottom),
            rect: self.rect.or(base.rect),
            semitile: self.semitile.or(base.semitile),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_key_floors_negative_coordinates() {
        assert_eq!(tile_key(Vec2::new(-0.5, 2.9)), (-1, 2));
        assert_eq!(tile_key(Vec2::new(3.0, -3.0)), (3, -3));
    }

    #[test]
    fn tile_key_text_round_trips_through_level_format() {
        assert_eq!(format_tile_key((-4, 7)), "-4;7");
        assert_eq!(parse_tile_key("-4;7"), Some((-4, 7)));
        assert_eq!(parse_tile_key("4,7"), None);
        assert_eq!(parse_tile_key("a;1"), None);
    }

    #[test]
    fn empty_patch_is_identity() {
        let tile = Tile {
            elevation: 0.5,
            height: 2.0,
            texture: TextureId(3),
            top: Some([1, 2, 3]),
            bottom: None,
            rect: Some(Rect::new(0.25, 0.0, 0.5, 1.0)),
            semitile: None,
        };
        assert_eq!(TilePatch::default().apply(&tile), tile);
    }

    #[test]
    fn patch_overrides_only_given_fields() {
        let base = Tile::default();
        let patched = TilePatch {
            height: Some(0.2),
            ..TilePatch::default()
        }
        .apply(&base);
        assert_eq!(patched.height, 0.2);
        assert_eq!(patched.elevation, 0.0);
        assert_eq!(patched.texture, TextureId(0));
    }

    #[test]
    fn validation_rejects_degenerate_tiles() {
        let flat = Tile {
            height: 0.0,
            ..Tile::default()
        };
        let sunk = Tile {
            elevation: -1.0,
            ..Tile::default()
        };
        assert_eq!(flat.validate(), Err(InvalidTile::NonPositiveHeight(0.0)));
        assert_eq!(sunk.validate(), Err(InvalidTile::NegativeElevation(-1.0)));
        assert!(Tile::default().validate().is_ok());
    }

    #[test]
    fn footprints_offset_into_world_space() {
        let tile = Tile {
            rect: Some(Rect::new(0.25, 0.5, 0.5, 0.5)),
            semitile: Some(Semitile {
                axis: SemitileAxis::Y,
                pos: Vec2::new(0.5, 0.0),
                width: 1.0,
            }),
            ..Tile::default()
        };
        assert_eq!(tile.collision_rect((2, 3)), Rect::new(2.25, 3.5, 0.5, 0.5));
        assert_eq!(tile.render_rect((2, 3)), Rect::new(2.5, 3.0, 0.0, 1.0));
    }
}
