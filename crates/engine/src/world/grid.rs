use std::collections::HashMap;

use tracing::warn;

use super::tile::{format_tile_key, InvalidTile, Tile, TileKey, TilePatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileTarget {
    Static,
    Dynamic,
    Both,
}

impl TileTarget {
    fn writes_static(self) -> bool {
        matches!(self, TileTarget::Static | TileTarget::Both)
    }

    fn writes_dynamic(self) -> bool {
        matches!(self, TileTarget::Dynamic | TileTarget::Both)
    }
}

/// Sparse tile storage. Keys absent from a map are open space.
///
/// Physics and rendering read the dynamic map. The static map is the level's
/// source of truth and only changes through explicit `set_tile` calls.
#[derive(Debug, Clone, Default)]
pub struct GridMap {
    static_tiles: HashMap<TileKey, Tile>,
    dynamic_tiles: HashMap<TileKey, Tile>,
}

impl GridMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map whose static and dynamic layers start identical.
    /// Invalid tiles are dropped with a warning.
    pub fn from_tiles(tiles: impl IntoIterator<Item = (TileKey, Tile)>) -> Self {
        let mut map = Self::default();
        for (key, tile) in tiles {
            if let Err(error) = tile.validate() {
                warn!(tile = %format_tile_key(key), error = %error, "tile_rejected");
                continue;
            }
            map.static_tiles.insert(key, tile.clone());
            map.dynamic_tiles.insert(key, tile);
        }
        map
    }

    pub fn get(&self, key: TileKey) -> Option<&Tile> {
        self.dynamic_tiles.get(&key)
    }

    pub fn get_static(&self, key: TileKey) -> Option<&Tile> {
        self.static_tiles.get(&key)
    }

    pub fn len(&self) -> usize {
        self.dynamic_tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dynamic_tiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TileKey, &Tile)> {
        self.dynamic_tiles.iter()
    }

    /// Merges `patch` onto the existing tile (or the default tile) in each targeted map.
    /// Nothing is written when the merged result is invalid for any target.
    pub fn set_tile(
        &mut self,
        key: TileKey,
        patch: &TilePatch,
        target: TileTarget,
    ) -> Result<(), InvalidTile> {
        let merged_static = target
            .writes_static()
            .then(|| patch.apply(self.static_tiles.get(&key).unwrap_or(&Tile::default())));
        let merged_dynamic = target
            .writes_dynamic()
            .then(|| patch.apply(self.dynamic_tiles.get(&key).unwrap_or(&Tile::default())));

        for tile in merged_static.iter().chain(merged_dynamic.iter()) {
            tile.validate()?;
        }
        if let Some(tile) = merged_static {
            self.static_tiles.insert(key, tile);
        }
        if let Some(tile) = merged_dynamic {
            self.dynamic_tiles.insert(key, tile);
        }
        Ok(())
    }

    pub fn remove_tile(&mut self, key: TileKey, target: TileTarget) {
        if target.writes_static() {
            self.static_tiles.remove(&key);
        }
        if target.writes_dynamic() {
            self.dynamic_tiles.remove(&key);
        }
    }

    /// Restores a dynamic tile to its static value, clearing any transient override.
    pub fn reset_dynamic(&mut self, key: TileKey) {
        match self.static_tiles.get(&key) {
            Some(tile) => {
                self.dynamic_tiles.insert(key, tile.clone());
            }
            None => {
                self.dynamic_tiles.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::tile::TextureId;

    #[test]
    fn set_tile_on_empty_key_uses_defaults() {
        let mut map = GridMap::new();
        map.set_tile(
            (1, 1),
            &TilePatch {
                texture: Some(TextureId(2)),
                ..TilePatch::default()
            },
            TileTarget::Both,
        )
        .expect("valid tile");

        let tile = map.get((1, 1)).expect("dynamic tile");
        assert_eq!(tile.elevation, 0.0);
        assert_eq!(tile.height, 1.0);
        assert_eq!(tile.texture, TextureId(2));
        assert_eq!(map.get_static((1, 1)), Some(tile));
    }

    #[test]
    fn dynamic_override_leaves_static_untouched() {
        let mut map = GridMap::from_tiles([((0, 0), Tile::default())]);
        map.set_tile(
            (0, 0),
            &TilePatch {
                height: Some(0.25),
                ..TilePatch::default()
            },
            TileTarget::Dynamic,
        )
        .expect("valid tile");

        assert_eq!(map.get((0, 0)).map(|tile| tile.height), Some(0.25));
        assert_eq!(map.get_static((0, 0)).map(|tile| tile.height), Some(1.0));

        map.reset_dynamic((0, 0));
        assert_eq!(map.get((0, 0)).map(|tile| tile.height), Some(1.0));
    }

    #[test]
    fn each_target_merges_from_its_own_base() {
        let mut map = GridMap::from_tiles([((0, 0), Tile::default())]);
        map.set_tile(
            (0, 0),
            &TilePatch {
                elevation: Some(2.0),
                ..TilePatch::default()
            },
            TileTarget::Dynamic,
        )
        .expect("valid tile");
        map.set_tile(
            (0, 0),
            &TilePatch {
                texture: Some(TextureId(5)),
                ..TilePatch::default()
            },
            TileTarget::Both,
        )
        .expect("valid tile");

        assert_eq!(map.get((0, 0)).map(|tile| tile.elevation), Some(2.0));
        assert_eq!(map.get_static((0, 0)).map(|tile| tile.elevation), Some(0.0));
        assert_eq!(map.get_static((0, 0)).map(|tile| tile.texture), Some(TextureId(5)));
    }

    #[test]
    fn invalid_patch_writes_nothing() {
        let mut map = GridMap::new();
        let result = map.set_tile(
            (0, 0),
            &TilePatch {
                height: Some(-1.0),
                ..TilePatch::default()
            },
            TileTarget::Both,
        );
        assert!(result.is_err());
        assert!(map.get((0, 0)).is_none());
        assert!(map.get_static((0, 0)).is_none());
    }

    #[test]
    fn from_tiles_drops_invalid_entries() {
        let map = GridMap::from_tiles([
            ((0, 0), Tile::default()),
            (
                (1, 0),
                Tile {
                    height: 0.0,
                    ..Tile::default()
                },
            ),
        ]);
        assert_eq!(map.len(), 1);
        assert!(map.get((1, 0)).is_none());
    }
}
