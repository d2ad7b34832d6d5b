use std::collections::BTreeMap;

use crate::world::{tile_key, GridMap, Rect, SpatialIndex, Vec2, NEIGHBORHOOD, SMALL};

use super::{Contact, Entity, EntityId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsTuning {
    /// Per-tick decay applied to boost and player movement.
    pub friction: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self { friction: 0.90625 }
    }
}

/// Read-only world state a physics step may consult.
#[derive(Clone, Copy)]
pub struct PhysicsContext<'a> {
    pub grid: &'a GridMap,
    pub spatial: &'a SpatialIndex,
    pub entities: &'a BTreeMap<EntityId, Entity>,
    pub ceiling: f32,
    pub tuning: PhysicsTuning,
}

/// A solid box: a plane footprint and its vertical span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub rect: Rect,
    pub bottom: f32,
    pub top: f32,
}

impl Obstacle {
    fn overlaps_vertically(&self, bottom: f32, top: f32) -> bool {
        bottom < self.top && top > self.bottom
    }
}

/// Tile and entity boxes in the 3x3 neighbourhood of `entity`'s tile.
///
/// Tiles come from the dynamic map, using their sub-rect when present.
/// Entities exclude `entity` itself and anything that does not collide.
pub fn obstacles_around(entity: &Entity, ctx: &PhysicsContext<'_>) -> Vec<Obstacle> {
    let center = tile_key(entity.pos);
    let mut obstacles = Vec::new();
    for (dx, dy) in NEIGHBORHOOD {
        let key = (center.0 + dx, center.1 + dy);
        if let Some(tile) = ctx.grid.get(key) {
            if tile.height > 0.0 {
                obstacles.push(Obstacle {
                    rect: tile.collision_rect(key),
                    bottom: tile.elevation,
                    top: tile.top(),
                });
            }
        }
    }
    for id in ctx.spatial.around(center) {
        if id == entity.id {
            continue;
        }
        let Some(other) = ctx.entities.get(&id) else {
            continue;
        };
        if !other.kind.collides() {
            continue;
        }
        obstacles.push(Obstacle {
            rect: other.rect(),
            bottom: other.elevation,
            top: other.top(),
        });
    }
    obstacles
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

/// Advances one entity by `dt` game ticks: yaw, boost, then X, Y and Z in turn.
pub fn step_physics(entity: &mut Entity, ctx: &PhysicsContext<'_>, dt: f32) {
    entity.collisions = Default::default();

    let velocity = entity.velocity + entity.boost;
    if entity.yaw_velocity != 0.0 {
        entity.yaw = (entity.yaw + entity.yaw_velocity * dt).rem_euclid(360.0);
    }
    entity.boost = entity.boost * ctx.tuning.friction.powf(dt);
    if entity.boost.length() < SMALL {
        entity.boost = Vec2::ZERO;
    }

    entity.pos.x += velocity.x * dt;
    resolve_axis(entity, ctx, Axis::X, velocity.x);
    entity.pos.y += velocity.y * dt;
    resolve_axis(entity, ctx, Axis::Y, velocity.y);
    resolve_vertical(entity, ctx, dt);
}

fn resolve_axis(entity: &mut Entity, ctx: &PhysicsContext<'_>, axis: Axis, velocity: f32) {
    let obstacles = obstacles_around(entity, ctx);
    let side = usize::from(velocity >= 0.0);

    for obstacle in &obstacles {
        let rect = entity.rect();
        if !obstacle.overlaps_vertically(entity.elevation, entity.top()) {
            continue;
        }
        if !rect.collides(&obstacle.rect) {
            continue;
        }

        if obstacle.top - entity.elevation <= entity.climb
            && headroom_above(obstacle.top, &rect, &obstacles, ctx.ceiling) >= entity.body.height
        {
            entity.elevation = obstacle.top;
            contacts_mut(entity, axis)[side] = Contact::Climbed;
            continue;
        }

        if velocity == 0.0 {
            continue;
        }
        let mut pushed = rect;
        match (axis, velocity > 0.0) {
            (Axis::X, true) => pushed.set_right(obstacle.rect.left() - SMALL),
            (Axis::X, false) => pushed.set_left(obstacle.rect.right() + SMALL),
            (Axis::Y, true) => pushed.set_bottom(obstacle.rect.top() - SMALL),
            (Axis::Y, false) => pushed.set_top(obstacle.rect.bottom() + SMALL),
        }
        let center = pushed.center();
        match axis {
            Axis::X => entity.pos.x = center.x,
            Axis::Y => entity.pos.y = center.y,
        }
        contacts_mut(entity, axis)[side] = Contact::Blocked;
    }
}

/// Clear height above `floor` over `rect`, bounded by the level ceiling.
fn headroom_above(floor: f32, rect: &Rect, obstacles: &[Obstacle], ceiling: f32) -> f32 {
    obstacles
        .iter()
        .filter(|other| other.rect.collides(rect))
        .map(|other| other.bottom - floor)
        .filter(|gap| *gap > 0.0)
        .fold(ceiling - floor, f32::min)
}

fn contacts_mut(entity: &mut Entity, axis: Axis) -> &mut [Contact; 2] {
    match axis {
        Axis::X => &mut entity.collisions.x,
        Axis::Y => &mut entity.collisions.y,
    }
}

fn resolve_vertical(entity: &mut Entity, ctx: &PhysicsContext<'_>, dt: f32) {
    let gravity = entity.gravity;
    entity.elevation = (entity.elevation + entity.elevation_velocity * dt
        - 0.5 * gravity * dt * dt)
        .max(0.0);
    entity.elevation_velocity -= gravity * dt;

    if entity.elevation <= 0.0 && entity.elevation_velocity <= 0.0 {
        entity.elevation_velocity = 0.0;
        entity.collisions.z[0] = Contact::Blocked;
    }
    if entity.top() >= ctx.ceiling {
        entity.elevation = (ctx.ceiling - entity.body.height).max(0.0);
        entity.elevation_velocity = entity.elevation_velocity.min(0.0);
        entity.collisions.z[1] = Contact::Blocked;
    }

    let rect = entity.rect();
    for obstacle in obstacles_around(entity, ctx) {
        if obstacle.top <= obstacle.bottom || !obstacle.rect.collides(&rect) {
            continue;
        }
        if !obstacle.overlaps_vertically(entity.elevation, entity.top()) {
            continue;
        }
        if entity.elevation_velocity > 0.0 {
            entity.elevation = (obstacle.bottom - entity.body.height).max(0.0);
            entity.collisions.z[1] = Contact::Blocked;
            entity.elevation_velocity = 0.0;
        } else if entity.elevation_velocity < 0.0 {
            entity.elevation = obstacle.top;
            entity.collisions.z[0] = Contact::Blocked;
            entity.elevation_velocity = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Body;
    use crate::world::Tile;

    struct Fixture {
        grid: GridMap,
        spatial: SpatialIndex,
        entities: BTreeMap<EntityId, Entity>,
    }

    impl Fixture {
        fn with_tiles(tiles: Vec<((i32, i32), Tile)>) -> Self {
            Self {
                grid: GridMap::from_tiles(tiles),
                spatial: SpatialIndex::new(),
                entities: BTreeMap::new(),
            }
        }

        fn ctx(&self) -> PhysicsContext<'_> {
            PhysicsContext {
                grid: &self.grid,
                spatial: &self.spatial,
                entities: &self.entities,
                ceiling: f32::INFINITY,
                tuning: PhysicsTuning::default(),
            }
        }
    }

    fn step_tile(height: f32) -> Tile {
        Tile {
            height,
            ..Tile::default()
        }
    }

    #[test]
    fn wall_blocks_without_penetration() {
        let fixture = Fixture::with_tiles(vec![((5, 5), Tile::default())]);
        let mut entity = Entity {
            velocity: Vec2::new(0.0, 0.1),
            ..Entity::new(Vec2::new(5.5, 4.5))
        };
        let half = entity.body.width / 2.0;
        let mut last_y = entity.pos.y;
        let mut stopped = false;
        for _ in 0..10 {
            step_physics(&mut entity, &fixture.ctx(), 1.0);
            assert!(entity.pos.y + half < 5.0, "entity penetrated the wall");
            if entity.pos.y <= last_y + 1e-6 {
                stopped = true;
            } else {
                assert!(!stopped, "entity resumed moving after being blocked");
            }
            last_y = entity.pos.y;
        }
        assert!(stopped);
        assert!(entity.pos.y <= 5.0 - half);
        assert_eq!(entity.collisions.y[1], Contact::Blocked);
    }

    #[test]
    fn step_at_climb_height_is_climbed() {
        let fixture = Fixture::with_tiles(vec![((1, 0), step_tile(0.2))]);
        let mut entity = Entity {
            velocity: Vec2::new(0.3, 0.0),
            climb: 0.2,
            ..Entity::new(Vec2::new(0.5, 0.5))
        };
        step_physics(&mut entity, &fixture.ctx(), 1.0);
        assert_eq!(entity.elevation, 0.2);
        assert_eq!(entity.collisions.x[1], Contact::Climbed);
        assert!((entity.pos.x - 0.8).abs() < 1e-6);
    }

    #[test]
    fn step_just_above_climb_height_blocks() {
        let fixture = Fixture::with_tiles(vec![((1, 0), step_tile(0.2 + 1e-3))]);
        let mut entity = Entity {
            velocity: Vec2::new(0.3, 0.0),
            climb: 0.2,
            ..Entity::new(Vec2::new(0.5, 0.5))
        };
        step_physics(&mut entity, &fixture.ctx(), 1.0);
        assert_eq!(entity.elevation, 0.0);
        assert_eq!(entity.collisions.x[1], Contact::Blocked);
        assert!(entity.rect().right() < 1.0);
    }

    #[test]
    fn climb_needs_headroom() {
        let fixture = Fixture::with_tiles(vec![((1, 0), step_tile(0.2))]);
        let mut ctx = fixture.ctx();
        ctx.ceiling = 0.9;
        let mut cramped = Entity {
            velocity: Vec2::new(0.3, 0.0),
            body: Body::new(0.5, 0.8),
            ..Entity::new(Vec2::new(0.5, 0.5))
        };
        step_physics(&mut cramped, &ctx, 1.0);
        assert_eq!(cramped.elevation, 0.0);
        assert_eq!(cramped.collisions.x[1], Contact::Blocked);

        ctx.ceiling = 1.5;
        let mut roomy = Entity {
            velocity: Vec2::new(0.3, 0.0),
            body: Body::new(0.5, 0.8),
            ..Entity::new(Vec2::new(0.5, 0.5))
        };
        step_physics(&mut roomy, &ctx, 1.0);
        assert_eq!(roomy.elevation, 0.2);
    }

    #[test]
    fn gravity_settles_on_ground() {
        let fixture = Fixture::with_tiles(Vec::new());
        let mut entity = Entity {
            gravity: 0.004,
            elevation: 5.0,
            ..Entity::new(Vec2::new(0.5, 0.5))
        };
        for _ in 0..200 {
            step_physics(&mut entity, &fixture.ctx(), 1.0);
            assert!(entity.elevation >= 0.0);
        }
        assert_eq!(entity.elevation, 0.0);
        assert_eq!(entity.elevation_velocity, 0.0);
        assert!(entity.collisions.grounded());
    }

    #[test]
    fn falling_entity_lands_on_tile_top() {
        let fixture = Fixture::with_tiles(vec![((0, 0), step_tile(0.5))]);
        let mut entity = Entity {
            gravity: 0.004,
            elevation: 2.0,
            ..Entity::new(Vec2::new(0.5, 0.5))
        };
        for _ in 0..120 {
            step_physics(&mut entity, &fixture.ctx(), 1.0);
        }
        assert_eq!(entity.elevation, 0.5);
        assert_eq!(entity.collisions.z[0], Contact::Blocked);
    }

    #[test]
    fn jumping_into_overhang_clamps_top() {
        let overhang = Tile {
            elevation: 1.5,
            height: 1.0,
            ..Tile::default()
        };
        let fixture = Fixture::with_tiles(vec![((0, 0), overhang)]);
        let mut entity = Entity {
            elevation_velocity: 1.0,
            ..Entity::new(Vec2::new(0.5, 0.5))
        };
        step_physics(&mut entity, &fixture.ctx(), 1.0);
        assert_eq!(entity.top(), 1.5);
        assert_eq!(entity.elevation_velocity, 0.0);
        assert_eq!(entity.collisions.z[1], Contact::Blocked);
    }

    #[test]
    fn level_ceiling_caps_height() {
        let fixture = Fixture::with_tiles(Vec::new());
        let mut ctx = fixture.ctx();
        ctx.ceiling = 2.0;
        let mut entity = Entity {
            elevation_velocity: 3.0,
            ..Entity::new(Vec2::new(0.5, 0.5))
        };
        step_physics(&mut entity, &ctx, 1.0);
        assert_eq!(entity.top(), 2.0);
        assert_eq!(entity.collisions.z[1], Contact::Blocked);
    }

    #[test]
    fn boost_decays_to_zero() {
        let fixture = Fixture::with_tiles(Vec::new());
        let mut entity = Entity {
            boost: Vec2::new(0.1, 0.0),
            ..Entity::new(Vec2::new(0.5, 0.5))
        };
        for _ in 0..400 {
            step_physics(&mut entity, &fixture.ctx(), 1.0);
        }
        assert_eq!(entity.boost, Vec2::ZERO);
        assert!(entity.pos.x > 1.0);
    }

    #[test]
    fn other_entities_block_but_items_do_not() {
        let mut fixture = Fixture::with_tiles(Vec::new());
        let blocker = Entity {
            id: EntityId(2),
            ..Entity::new(Vec2::new(1.5, 0.5))
        };
        let item = Entity {
            id: EntityId(3),
            ..Entity::item(
                Vec2::new(0.5, 1.5),
                crate::entity::ItemState {
                    weapon: crate::combat::WeaponId(0),
                    count: 1,
                },
                None,
            )
        };
        fixture.spatial.add(blocker.id, tile_key(blocker.pos));
        fixture.spatial.add(item.id, tile_key(item.pos));
        fixture.entities.insert(blocker.id, blocker);
        fixture.entities.insert(item.id, item);

        let mut mover = Entity {
            id: EntityId(1),
            velocity: Vec2::new(0.6, 0.0),
            ..Entity::new(Vec2::new(0.5, 0.5))
        };
        step_physics(&mut mover, &fixture.ctx(), 1.0);
        assert_eq!(mover.collisions.x[1], Contact::Blocked);
        assert!(mover.rect().right() < 1.25);

        let mut walker = Entity {
            id: EntityId(4),
            velocity: Vec2::new(0.0, 1.0),
            ..Entity::new(Vec2::new(0.5, 0.5))
        };
        step_physics(&mut walker, &fixture.ctx(), 1.0);
        assert_eq!(walker.collisions.y, [Contact::None; 2]);
    }
}
