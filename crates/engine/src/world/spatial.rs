use std::collections::{BTreeSet, HashMap};

use crate::entity::EntityId;

use super::tile::TileKey;

/// Offsets of the 3x3 neighbourhood around a tile, centre first.
pub const NEIGHBORHOOD: [(i32, i32); 9] = [
    (0, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Tile key to the entities whose centre lies in that tile.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    cells: HashMap<TileKey, BTreeSet<EntityId>>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: EntityId, key: TileKey) {
        self.cells.entry(key).or_default().insert(id);
    }

    pub fn remove(&mut self, id: EntityId, key: TileKey) -> bool {
        let Some(cell) = self.cells.get_mut(&key) else {
            return false;
        };
        let removed = cell.remove(&id);
        if cell.is_empty() {
            self.cells.remove(&key);
        }
        removed
    }

    pub fn rehome(&mut self, id: EntityId, old_key: TileKey, new_key: TileKey) {
        if old_key == new_key {
            return;
        }
        self.remove(id, old_key);
        self.add(id, new_key);
    }

    pub fn neighbors(&self, key: TileKey) -> impl Iterator<Item = EntityId> + '_ {
        self.cells.get(&key).into_iter().flatten().copied()
    }

    pub fn contains(&self, id: EntityId, key: TileKey) -> bool {
        self.cells.get(&key).is_some_and(|cell| cell.contains(&id))
    }

    /// Entities in the 3x3 block of tiles centred on `key`, sorted and deduplicated.
    pub fn around(&self, key: TileKey) -> BTreeSet<EntityId> {
        NEIGHBORHOOD
            .iter()
            .flat_map(|(dx, dy)| self.neighbors((key.0 + dx, key.1 + dy)))
            .collect()
    }

    pub fn keys_of(&self, id: EntityId) -> Vec<TileKey> {
        let mut keys: Vec<TileKey> = self
            .cells
            .iter()
            .filter(|(_, cell)| cell.contains(&id))
            .map(|(key, _)| *key)
            .collect();
        keys.sort_unstable();
        keys
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}
