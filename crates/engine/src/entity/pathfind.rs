use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::world::{tile_key, GridMap, TileKey, Vec2, SMALL};

use super::Entity;

const STRAIGHT_STEPS: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
const DIAGONAL_STEPS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathWeights {
    pub straight: f32,
    pub diagonal: f32,
    /// Cost per unit of descent, or of ascent beyond the climb allowance.
    pub elevation: f32,
}

impl Default for PathWeights {
    fn default() -> Self {
        Self {
            straight: 1.0,
            diagonal: 1.414,
            elevation: 1.0,
        }
    }
}

/// A standing place: on the ground in `tile` (layer 0) or on top of it (layer 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathNode {
    pub tile: TileKey,
    pub layer: u8,
}

impl PathNode {
    pub const fn ground(tile: TileKey) -> Self {
        Self { tile, layer: 0 }
    }

    pub const fn atop(tile: TileKey) -> Self {
        Self { tile, layer: 1 }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.tile.0 as f32 + 0.5, self.tile.1 as f32 + 0.5)
    }
}

/// Weighted A* over ground and tile-top nodes for a walker of fixed size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pathfinder {
    pub weights: PathWeights,
    /// Visited-node cap; the search gives up once it is reached.
    pub max_nodes: usize,
    pub height: f32,
    pub climb: f32,
}

impl Default for Pathfinder {
    fn default() -> Self {
        Self {
            weights: PathWeights::default(),
            max_nodes: 100,
            height: 1.0,
            climb: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    node: PathNode,
    h_cost: f32,
    f_cost: f32,
    insertion_order: u64,
}

impl Pathfinder {
    pub fn for_entity(entity: &Entity) -> Self {
        Self {
            height: entity.body.height,
            climb: entity.climb,
            ..Self::default()
        }
    }

    /// Node an entity currently stands on.
    pub fn node_at(&self, grid: &GridMap, pos: Vec2, elevation: f32) -> PathNode {
        let tile = tile_key(pos);
        match grid.get(tile) {
            Some(data) if elevation >= data.top() - SMALL => PathNode::atop(tile),
            _ => PathNode::ground(tile),
        }
    }

    pub fn elevation_of(&self, grid: &GridMap, node: PathNode) -> f32 {
        match (node.layer, grid.get(node.tile)) {
            (1, Some(data)) => data.top(),
            _ => 0.0,
        }
    }

    /// Whether a walker whose feet are at `bottom` may step onto `node`.
    pub fn is_blocked(&self, grid: &GridMap, node: PathNode, bottom: f32) -> bool {
        match (grid.get(node.tile), node.layer) {
            (None, 0) => false,
            (None, _) => true,
            (Some(data), 0) => data.elevation < bottom + self.height,
            (Some(data), _) => data.top() - bottom > self.climb,
        }
    }

    /// Cheapest path from `start` to `goal`, excluding `start`.
    ///
    /// Returns `None` when the goal is unreachable or is not among the first
    /// `max_nodes` nodes visited.
    pub fn find(&self, grid: &GridMap, start: PathNode, goal: PathNode) -> Option<Vec<PathNode>> {
        if start == goal {
            return Some(Vec::new());
        }
        let goal_elevation = self.elevation_of(grid, goal);

        let mut closed: HashSet<PathNode> = HashSet::new();
        let mut best_g: HashMap<PathNode, f32> = HashMap::new();
        let mut parent: HashMap<PathNode, PathNode> = HashMap::new();
        let mut open = Vec::new();
        let mut next_insertion = 0u64;

        let start_h = self.heuristic(grid, start, goal, goal_elevation);
        open.push(OpenNode {
            node: start,
            h_cost: start_h,
            f_cost: start_h,
            insertion_order: next_insertion,
        });
        next_insertion += 1;
        best_g.insert(start, 0.0);

        while !open.is_empty() && closed.len() < self.max_nodes {
            let current = open.swap_remove(pick_best_open_node_index(&open));
            if !closed.insert(current.node) {
                continue;
            }
            if current.node == goal {
                return reconstruct_path(&parent, start, goal);
            }

            let current_g = best_g.get(&current.node).copied().unwrap_or(f32::INFINITY);
            let bottom = self.elevation_of(grid, current.node);
            for (neighbor, step_cost) in self.neighbors(grid, current.node, bottom) {
                if closed.contains(&neighbor) {
                    continue;
                }
                let tentative_g = current_g + step_cost;
                if best_g.get(&neighbor).is_some_and(|known| tentative_g >= *known) {
                    continue;
                }
                best_g.insert(neighbor, tentative_g);
                parent.insert(neighbor, current.node);
                let h_cost = self.heuristic(grid, neighbor, goal, goal_elevation);
                open.push(OpenNode {
                    node: neighbor,
                    h_cost,
                    f_cost: tentative_g + h_cost,
                    insertion_order: next_insertion,
                });
                next_insertion += 1;
            }
        }

        None
    }

    fn neighbors(&self, grid: &GridMap, from: PathNode, bottom: f32) -> Vec<(PathNode, f32)> {
        let mut out = Vec::with_capacity(16);
        let (x, y) = from.tile;
        for (dx, dy) in STRAIGHT_STEPS {
            for layer in 0..2 {
                let node = PathNode {
                    tile: (x + dx, y + dy),
                    layer,
                };
                if !self.is_blocked(grid, node, bottom) {
                    let cost = self.weights.straight + self.elevation_cost(grid, node, bottom);
                    out.push((node, cost));
                }
            }
        }
        for (dx, dy) in DIAGONAL_STEPS {
            for layer in 0..2 {
                let node = PathNode {
                    tile: (x + dx, y + dy),
                    layer,
                };
                let side_x = PathNode {
                    tile: (x + dx, y),
                    layer,
                };
                let side_y = PathNode {
                    tile: (x, y + dy),
                    layer,
                };
                if self.is_blocked(grid, node, bottom)
                    || self.is_blocked(grid, side_x, bottom)
                    || self.is_blocked(grid, side_y, bottom)
                {
                    continue;
                }
                out.push((node, self.weights.diagonal + self.elevation_cost(grid, node, bottom)));
            }
        }
        out
    }

    fn elevation_cost(&self, grid: &GridMap, to: PathNode, bottom: f32) -> f32 {
        let difference = self.elevation_of(grid, to) - bottom;
        if difference < 0.0 {
            -difference * self.weights.elevation
        } else if difference > self.climb {
            (difference - self.climb) * self.weights.elevation
        } else {
            0.0
        }
    }

    fn heuristic(
        &self,
        grid: &GridMap,
        node: PathNode,
        goal: PathNode,
        goal_elevation: f32,
    ) -> f32 {
        let manhattan = node.tile.0.abs_diff(goal.tile.0) + node.tile.1.abs_diff(goal.tile.1);
        let rise = (self.elevation_of(grid, node) - goal_elevation).abs();
        manhattan as f32 * self.weights.straight + rise * self.weights.elevation
    }
}

fn pick_best_open_node_index(open: &[OpenNode]) -> usize {
    let mut best_index = 0usize;
    for index in 1..open.len() {
        if open_node_order(&open[index], &open[best_index]) == Ordering::Less {
            best_index = index;
        }
    }
    best_index
}

fn open_node_order(a: &OpenNode, b: &OpenNode) -> Ordering {
    a.f_cost
        .total_cmp(&b.f_cost)
        .then(a.h_cost.total_cmp(&b.h_cost))
        .then((a.node.tile.1, a.node.tile.0, a.node.layer).cmp(&(
            b.node.tile.1,
            b.node.tile.0,
            b.node.layer,
        )))
        .then(a.insertion_order.cmp(&b.insertion_order))
}

fn reconstruct_path(
    parent: &HashMap<PathNode, PathNode>,
    start: PathNode,
    goal: PathNode,
) -> Option<Vec<PathNode>> {
    let mut cursor = goal;
    let mut nodes = vec![cursor];
    while cursor != start {
        cursor = *parent.get(&cursor)?;
        if cursor != start {
            nodes.push(cursor);
        }
    }
    nodes.reverse();
    Some(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Tile;

    fn wall() -> Tile {
        Tile::default()
    }

    fn low_step() -> Tile {
        Tile {
            height: 0.2,
            ..Tile::default()
        }
    }

    #[test]
    fn open_ground_path_excludes_start_and_ends_at_goal() {
        let grid = GridMap::new();
        let finder = Pathfinder::default();
        let path = finder
            .find(&grid, PathNode::ground((0, 0)), PathNode::ground((3, 0)))
            .expect("reachable");
        assert_eq!(
            path,
            vec![
                PathNode::ground((1, 0)),
                PathNode::ground((2, 0)),
                PathNode::ground((3, 0)),
            ]
        );
    }

    #[test]
    fn same_start_and_goal_is_empty_path() {
        let finder = Pathfinder::default();
        let node = PathNode::ground((2, 2));
        assert_eq!(finder.find(&GridMap::new(), node, node), Some(Vec::new()));
    }

    #[test]
    fn path_detours_around_walls() {
        let grid = GridMap::from_tiles((-1..=1).map(|y| ((1, y), wall())));
        let finder = Pathfinder::default();
        let path = finder
            .find(&grid, PathNode::ground((0, 0)), PathNode::ground((2, 0)))
            .expect("reachable around the wall");
        assert_eq!(path.last(), Some(&PathNode::ground((2, 0))));
        for node in &path {
            assert!(!finder.is_blocked(&grid, *node, 0.0), "stepped into {node:?}");
        }
    }

    #[test]
    fn diagonal_may_not_cut_corners() {
        let grid = GridMap::from_tiles([((1, 0), wall()), ((0, 1), wall())]);
        let finder = Pathfinder::default();
        let path = finder
            .find(&grid, PathNode::ground((0, 0)), PathNode::ground((1, 1)))
            .expect("reachable the long way");
        assert!(path.len() > 1);
    }

    #[test]
    fn low_steps_are_walked_over() {
        let grid = GridMap::from_tiles((-20..=20).map(|x| ((x, 2), low_step())));
        let finder = Pathfinder::default();
        let path = finder
            .find(&grid, PathNode::ground((0, 0)), PathNode::ground((0, 4)))
            .expect("climbable");
        assert!(path.contains(&PathNode::atop((0, 2))));
    }

    #[test]
    fn node_cap_stops_unbounded_search() {
        let grid = GridMap::from_tiles((-200..=200).map(|x| ((x, 2), wall())));
        let finder = Pathfinder::default();
        assert_eq!(
            finder.find(&grid, PathNode::ground((0, 0)), PathNode::ground((0, 4))),
            None
        );
    }

    #[test]
    fn node_cap_counts_the_start_node() {
        let grid = GridMap::new();
        let start = PathNode::ground((0, 0));
        let goal = PathNode::ground((1, 0));
        let capped = Pathfinder {
            max_nodes: 1,
            ..Pathfinder::default()
        };
        assert_eq!(capped.find(&grid, start, goal), None);

        let roomier = Pathfinder {
            max_nodes: 2,
            ..Pathfinder::default()
        };
        assert_eq!(roomier.find(&grid, start, goal), Some(vec![goal]));
    }

    #[test]
    fn overhang_clearance_is_measured_from_the_walker_feet() {
        let bridge = Tile {
            elevation: 1.5,
            ..Tile::default()
        };
        let grid = GridMap::from_tiles([((1, 0), bridge)]);
        let finder = Pathfinder::default();
        assert!(!finder.is_blocked(&grid, PathNode::ground((1, 0)), 0.0));
        // Standing on a 1-unit block, the walker's head would reach 2.
        assert!(finder.is_blocked(&grid, PathNode::ground((1, 0)), 1.0));
    }

    #[test]
    fn overhang_is_passable_when_high_enough() {
        let bridge = Tile {
            elevation: 1.5,
            ..Tile::default()
        };
        let grid = GridMap::from_tiles([((1, 0), bridge)]);
        let finder = Pathfinder::default();
        assert!(!finder.is_blocked(&grid, PathNode::ground((1, 0)), 0.0));
        assert!(finder.is_blocked(&grid, PathNode::atop((1, 0)), 0.0));
    }

    #[test]
    fn search_is_deterministic() {
        let grid = GridMap::from_tiles([((2, 2), wall())]);
        let finder = Pathfinder::default();
        let first = finder.find(&grid, PathNode::ground((0, 2)), PathNode::ground((4, 2)));
        let second = finder.find(&grid, PathNode::ground((0, 2)), PathNode::ground((4, 2)));
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn node_at_reads_standing_layer() {
        let grid = GridMap::from_tiles([((0, 0), low_step())]);
        let finder = Pathfinder::default();
        assert_eq!(
            finder.node_at(&grid, Vec2::new(0.5, 0.5), 0.2),
            PathNode::atop((0, 0))
        );
        assert_eq!(
            finder.node_at(&grid, Vec2::new(1.5, 0.5), 0.0),
            PathNode::ground((1, 0))
        );
    }
}
