use crate::audio::SoundId;
use crate::combat::MissileSpec;
use crate::world::{tile_key, Vec2, Vec3, NEIGHBORHOOD};

use super::{Body, Entity, EntityId, EntityKind, PhysicsContext};

const ATTACK_STATE: &str = "attack";

#[derive(Debug, Clone, PartialEq)]
pub struct MissileState {
    pub owner: Option<EntityId>,
    /// Centre of the missile at launch.
    pub launch: Vec3,
    pub range: f32,
    pub damage: f32,
    pub blast_radius: f32,
    pub detonate_sound: Option<SoundId>,
    detonated: bool,
}

impl MissileState {
    pub fn detonated(&self) -> bool {
        self.detonated
    }
}

/// Damage request raised when a missile hits something.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detonation {
    pub missile: EntityId,
    pub at: Vec3,
    /// Entity struck directly, if any.
    pub direct: Option<EntityId>,
    pub owner: Option<EntityId>,
    pub damage: f32,
    pub blast_radius: f32,
    pub sound: Option<SoundId>,
}

/// Builds a missile centred on `launcher`'s centre, moving along `direction`.
pub fn launch_missile(
    spec: &MissileSpec,
    launcher: &Entity,
    direction: Vec3,
    range: f32,
) -> Entity {
    let length = direction.length();
    let unit = if length > f32::EPSILON {
        direction * (1.0 / length)
    } else {
        Vec3::from_plane(launcher.forward(), 0.0)
    };
    let center = launcher.center3();
    let velocity = unit * spec.speed;
    let state = MissileState {
        owner: Some(launcher.id),
        launch: center,
        range,
        damage: spec.damage,
        blast_radius: spec.blast_radius,
        detonate_sound: spec.detonate_sound,
        detonated: false,
    };
    Entity {
        kind: EntityKind::Missile(state),
        pos: center.plane(),
        elevation: (center.z - spec.height / 2.0).max(0.0),
        yaw: launcher.yaw,
        velocity: velocity.plane(),
        elevation_velocity: velocity.z,
        body: Body::new(spec.width, spec.height),
        gravity: 0.0,
        sprite: spec.sprite.clone(),
        ..Entity::default()
    }
}

/// Moves a missile without collision response and reports contact.
///
/// A spent missile waits for its attack animation and then asks to be removed.
/// A missile that flies past its range is removed without detonating.
pub fn step_missile(
    entity: &mut Entity,
    ctx: &PhysicsContext<'_>,
    dt: f32,
    level_timer: f32,
) -> Option<Detonation> {
    let EntityKind::Missile(state) = &entity.kind else {
        return None;
    };
    let state = state.clone();
    entity.sprite.advance(dt, level_timer);

    if state.detonated {
        let finished = entity
            .sprite
            .animator()
            .map_or(true, |animator| animator.current() != ATTACK_STATE || animator.ended_loop());
        if finished {
            entity.request_removal();
        }
        return None;
    }

    entity.pos += entity.velocity * dt;
    entity.elevation = (entity.elevation + entity.elevation_velocity * dt).max(0.0);

    if state.launch.distance(entity.center3()) > state.range {
        entity.request_removal();
        return None;
    }

    let struck = find_contact(entity, &state, ctx)?;
    Some(detonate(entity, state, struck))
}

enum Struck {
    Ground,
    Tile,
    Entity(EntityId),
}

fn find_contact(entity: &Entity, state: &MissileState, ctx: &PhysicsContext<'_>) -> Option<Struck> {
    let rect = entity.rect();
    let (bottom, top) = (entity.elevation, entity.top());
    let center = tile_key(entity.pos);

    for (dx, dy) in NEIGHBORHOOD {
        let key = (center.0 + dx, center.1 + dy);
        let Some(tile) = ctx.grid.get(key) else {
            continue;
        };
        if tile.collision_rect(key).collides(&rect) && bottom < tile.top() && top > tile.elevation {
            return Some(Struck::Tile);
        }
    }

    let target = ctx
        .spatial
        .around(center)
        .into_iter()
        .filter(|id| *id != entity.id && Some(*id) != state.owner)
        .filter_map(|id| ctx.entities.get(&id))
        .filter(|other| other.kind.attackable() && !other.is_dead())
        .filter(|other| {
            let (other_bottom, other_top) = other.attack_span();
            other.attack_rect().collides(&rect) && bottom < other_top && top > other_bottom
        })
        .min_by(|a, b| {
            let da = a.pos.distance(entity.pos);
            let db = b.pos.distance(entity.pos);
            da.total_cmp(&db)
        });
    if let Some(target) = target {
        return Some(Struck::Entity(target.id));
    }

    (entity.elevation <= 0.0).then_some(Struck::Ground)
}

fn detonate(entity: &mut Entity, mut state: MissileState, struck: Struck) -> Detonation {
    entity.velocity = Vec2::ZERO;
    entity.elevation_velocity = 0.0;
    state.detonated = true;
    if let Some(animator) = entity.sprite.animator_mut() {
        animator.set_state(ATTACK_STATE);
    }
    let detonation = Detonation {
        missile: entity.id,
        at: entity.center3(),
        direct: match struck {
            Struck::Entity(id) => Some(id),
            Struck::Ground | Struck::Tile => None,
        },
        owner: state.owner,
        damage: state.damage,
        blast_radius: state.blast_radius,
        sound: state.detonate_sound,
    };
    entity.kind = EntityKind::Missile(state);
    detonation
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::entity::{AnimationState, Animator, PhysicsTuning, Sprite};
    use crate::world::{GridMap, SpatialIndex, TextureId, Tile};

    fn launcher_at(pos: Vec2) -> Entity {
        Entity {
            id: EntityId(1),
            elevation: 0.0,
            ..Entity::new(pos)
        }
    }

    fn run(
        missile: &mut Entity,
        grid: &GridMap,
        spatial: &SpatialIndex,
        entities: &BTreeMap<EntityId, Entity>,
    ) -> Option<Detonation> {
        let ctx = PhysicsContext {
            grid,
            spatial,
            entities,
            ceiling: f32::INFINITY,
            tuning: PhysicsTuning::default(),
        };
        step_missile(missile, &ctx, 1.0, 0.0)
    }

    #[test]
    fn launch_centres_on_launcher() {
        let launcher = launcher_at(Vec2::new(2.5, 2.5));
        let spec = MissileSpec::default();
        let missile = launch_missile(&spec, &launcher, Vec3::new(0.0, 1.0, 0.0), 10.0);
        assert_eq!(missile.center_elevation(), launcher.center_elevation());
        assert!((missile.velocity.y - spec.speed).abs() < 1e-6);
        assert!(!missile.kind.collides());
    }

    #[test]
    fn zero_direction_falls_back_to_facing() {
        let launcher = Entity {
            yaw: 90.0,
            ..launcher_at(Vec2::new(0.5, 0.5))
        };
        let missile = launch_missile(&MissileSpec::default(), &launcher, Vec3::default(), 10.0);
        assert!(missile.velocity.x < 0.0);
        assert!(missile.velocity.y.abs() < 1e-6);
    }

    #[test]
    fn removal_flag_set_exactly_past_range() {
        let grid = GridMap::new();
        let spatial = SpatialIndex::new();
        let entities = BTreeMap::new();
        let spec = MissileSpec {
            speed: 0.5,
            ..MissileSpec::default()
        };
        let mut missile = launch_missile(
            &spec,
            &launcher_at(Vec2::new(0.5, 0.5)),
            Vec3::new(0.0, 1.0, 0.0),
            10.0,
        );
        for tick in 1..=20 {
            assert!(run(&mut missile, &grid, &spatial, &entities).is_none());
            assert!(!missile.removal_requested(), "removed early at tick {tick}");
        }
        run(&mut missile, &grid, &spatial, &entities);
        assert!(missile.removal_requested());
    }

    #[test]
    fn wall_contact_detonates_without_target() {
        let grid = GridMap::from_tiles([((0, 2), Tile::default())]);
        let spatial = SpatialIndex::new();
        let entities = BTreeMap::new();
        let mut missile = launch_missile(
            &MissileSpec::default(),
            &launcher_at(Vec2::new(0.5, 0.5)),
            Vec3::new(0.0, 1.0, 0.0),
            10.0,
        );
        let mut detonation = None;
        for _ in 0..40 {
            detonation = run(&mut missile, &grid, &spatial, &entities);
            if detonation.is_some() {
                break;
            }
        }
        let detonation = detonation.expect("missile should hit the wall");
        assert_eq!(detonation.direct, None);
        assert!(missile.rect().bottom() > 2.0);
        assert_eq!(missile.velocity, Vec2::ZERO);
    }

    #[test]
    fn entity_contact_names_target_and_ignores_owner() {
        let grid = GridMap::new();
        let mut spatial = SpatialIndex::new();
        let mut entities = BTreeMap::new();
        let target = Entity {
            id: EntityId(5),
            ..Entity::new(Vec2::new(0.5, 1.5))
        };
        let owner = launcher_at(Vec2::new(0.5, 0.5));
        spatial.add(target.id, tile_key(target.pos));
        spatial.add(owner.id, tile_key(owner.pos));
        entities.insert(target.id, target);
        entities.insert(owner.id, owner.clone());

        let mut missile = launch_missile(
            &MissileSpec::default(),
            &owner,
            Vec3::new(0.0, 1.0, 0.0),
            10.0,
        );
        missile.id = EntityId(9);
        let mut detonation = None;
        for _ in 0..20 {
            detonation = run(&mut missile, &grid, &spatial, &entities);
            if detonation.is_some() {
                break;
            }
        }
        assert_eq!(detonation.and_then(|hit| hit.direct), Some(EntityId(5)));
    }

    #[test]
    fn spent_missile_waits_for_attack_animation() {
        let grid = GridMap::new();
        let spatial = SpatialIndex::new();
        let entities = BTreeMap::new();
        let animator = Animator::new(AnimationState::looping(vec![vec![TextureId(1)]], 10.0))
            .with_state(
                "attack",
                AnimationState::once(vec![vec![TextureId(2), TextureId(3)]], 3.0),
            );
        let spec = MissileSpec {
            sprite: Sprite::Animated(animator),
            ..MissileSpec::default()
        };
        let mut missile = launch_missile(
            &spec,
            &launcher_at(Vec2::new(0.5, 0.5)),
            Vec3::new(0.0, 0.0, -1.0),
            10.0,
        );
        let mut ticks_to_detonate = 0;
        while run(&mut missile, &grid, &spatial, &entities).is_none() {
            ticks_to_detonate += 1;
            assert!(ticks_to_detonate < 100, "missile never reached the ground");
        }
        for _ in 0..2 {
            run(&mut missile, &grid, &spatial, &entities);
            assert!(!missile.removal_requested());
        }
        run(&mut missile, &grid, &spatial, &entities);
        assert!(missile.removal_requested());
    }
}
