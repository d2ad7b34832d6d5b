use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::audio::SoundSink;
use crate::combat::WeaponTable;
use crate::world::{tile_key, GridMap, SpatialIndex};

use super::missile::{step_missile, Detonation};
use super::player::{step_player, MoveIntent};
use super::{step_physics, Entity, EntityId, EntityKind, PhysicsContext, PhysicsTuning};

/// Live entities keyed by id. Iteration order is id order.
pub type EntityStore = BTreeMap<EntityId, Entity>;

#[derive(Debug, Default)]
struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Shared inputs of one entity update pass.
#[derive(Clone, Copy)]
pub struct TickContext<'a> {
    pub grid: &'a GridMap,
    pub weapons: &'a WeaponTable,
    /// Level ceiling elevation; infinite for open sky.
    pub ceiling: f32,
    pub tuning: PhysicsTuning,
    /// Game ticks elapsed this frame.
    pub dt: f32,
    pub level_timer: f32,
}

/// Owns every entity and keeps the spatial index in step with their positions.
#[derive(Debug, Default)]
pub struct EntityManager {
    allocator: EntityIdAllocator,
    entities: EntityStore,
    spatial: SpatialIndex,
    player: Option<EntityId>,
}

impl EntityManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, mut entity: Entity) -> EntityId {
        let id = self.allocator.allocate();
        entity.id = id;
        self.spatial.add(id, tile_key(entity.pos));
        self.entities.insert(id, entity);
        id
    }

    /// Spawns the viewer. A previous player stays in the world as a plain entity.
    pub fn spawn_player(&mut self, entity: Entity) -> EntityId {
        let id = self.spawn(entity);
        self.player = Some(id);
        id
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        self.spatial.remove(id, tile_key(entity.pos));
        if self.player == Some(id) {
            self.player = None;
        }
        Some(entity)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Mutates one entity and re-files it in the spatial index if it moved.
    pub fn with_entity_mut<R>(
        &mut self,
        id: EntityId,
        f: impl FnOnce(&mut Entity) -> R,
    ) -> Option<R> {
        let entity = self.entities.get_mut(&id)?;
        let old_key = tile_key(entity.pos);
        let result = f(entity);
        self.spatial.rehome(id, old_key, tile_key(entity.pos));
        Some(result)
    }

    pub fn player_id(&self) -> Option<EntityId> {
        self.player
    }

    pub fn player(&self) -> Option<&Entity> {
        self.entities.get(&self.player?)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn spatial(&self) -> &SpatialIndex {
        &self.spatial
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    /// Applies damage and reports whether it killed the entity.
    pub fn damage(&mut self, id: EntityId, amount: f32) -> bool {
        let Some(entity) = self.entities.get_mut(&id) else {
            return false;
        };
        let killed = entity.damage(amount);
        if killed {
            debug!(entity = id.0, "entity_killed");
        }
        killed
    }

    /// Steps every entity once, in id order.
    ///
    /// Each entity is taken out of the store while it steps, so it sees every
    /// other entity in its current state. Detonations apply immediately.
    /// Entities that asked to be removed are dropped after the pass.
    pub fn update(
        &mut self,
        tick: &TickContext<'_>,
        intent: &MoveIntent,
        sounds: &mut dyn SoundSink,
    ) {
        let ids: Vec<EntityId> = self.entities.keys().copied().collect();
        for id in ids {
            let Some(mut entity) = self.entities.remove(&id) else {
                continue;
            };
            let old_key = tile_key(entity.pos);
            let ctx = PhysicsContext {
                grid: tick.grid,
                spatial: &self.spatial,
                entities: &self.entities,
                ceiling: tick.ceiling,
                tuning: tick.tuning,
            };

            let detonation = match &entity.kind {
                EntityKind::Missile(_) => {
                    step_missile(&mut entity, &ctx, tick.dt, tick.level_timer)
                }
                EntityKind::Player(state) => {
                    let attack_time = state
                        .weapon
                        .and_then(|weapon| tick.weapons.get(weapon))
                        .map(|weapon| weapon.visuals.attack_time);
                    step_player(&mut entity, &ctx, tick.dt, tick.level_timer, intent, attack_time);
                    None
                }
                EntityKind::Normal | EntityKind::Stateful | EntityKind::Item(_) => {
                    if !entity.is_dead() {
                        entity.sprite.advance(tick.dt, tick.level_timer);
                    }
                    step_physics(&mut entity, &ctx, tick.dt);
                    None
                }
            };

            self.spatial.rehome(id, old_key, tile_key(entity.pos));
            self.entities.insert(id, entity);
            if let Some(detonation) = detonation {
                self.apply_detonation(&detonation, sounds);
            }
        }

        let doomed: Vec<EntityId> = self
            .entities
            .values()
            .filter(|entity| entity.removal_requested())
            .map(|entity| entity.id)
            .collect();
        for id in doomed {
            self.remove(id);
            trace!(entity = id.0, "entity_removed");
        }
    }

    /// Full damage to the entity struck directly. Every other attackable body
    /// in the surrounding 3x3 tiles within the blast radius takes splash damage,
    /// falling off linearly from half damage at the centre.
    pub fn apply_detonation(&mut self, detonation: &Detonation, sounds: &mut dyn SoundSink) {
        if let Some(sound) = detonation.sound {
            sounds.play(sound, Some(detonation.at));
        }
        if let Some(direct) = detonation.direct {
            self.damage(direct, detonation.damage);
        }
        if detonation.blast_radius <= 0.0 {
            return;
        }

        let splashed: Vec<(EntityId, f32)> = self
            .spatial
            .around(tile_key(detonation.at.plane()))
            .into_iter()
            .filter_map(|id| self.entities.get(&id))
            .filter(|entity| {
                entity.id != detonation.missile && Some(entity.id) != detonation.direct
            })
            .filter(|entity| entity.kind.attackable() && !entity.is_dead())
            .filter_map(|entity| {
                let distance = entity.center3().distance(detonation.at);
                (distance < detonation.blast_radius).then(|| {
                    let falloff = 1.0 - distance / detonation.blast_radius;
                    (entity.id, falloff * detonation.damage / 2.0)
                })
            })
            .collect();
        for (id, amount) in splashed {
            self.damage(id, amount);
        }
        debug!(
            missile = detonation.missile.0,
            direct = detonation.direct.map(|id| id.0),
            "missile_detonated"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{NullSound, RecordedSound, SoundId};
    use crate::combat::MissileSpec;
    use crate::entity::missile::launch_missile;
    use crate::entity::player::{new_player, PlayerSettings};
    use crate::world::{Vec2, Vec3};

    fn tick<'a>(grid: &'a GridMap, weapons: &'a WeaponTable) -> TickContext<'a> {
        TickContext {
            grid,
            weapons,
            ceiling: f32::INFINITY,
            tuning: PhysicsTuning::default(),
            dt: 1.0,
            level_timer: 0.0,
        }
    }

    fn assert_index_consistent(manager: &EntityManager) {
        for entity in manager.iter() {
            assert_eq!(manager.spatial().keys_of(entity.id), vec![tile_key(entity.pos)]);
        }
    }

    #[test]
    fn spawn_and_remove_track_spatial_index() {
        let mut manager = EntityManager::new();
        let a = manager.spawn(Entity::new(Vec2::new(1.5, 1.5)));
        let b = manager.spawn(Entity::new(Vec2::new(-0.5, 3.5)));
        assert_ne!(a, b);
        assert_index_consistent(&manager);
        assert!(manager.spatial().contains(b, (-1, 3)));

        assert!(manager.remove(b).is_some());
        assert!(!manager.spatial().contains(b, (-1, 3)));
        assert!(manager.remove(b).is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn moving_entities_are_rehomed_each_tick() {
        let grid = GridMap::new();
        let weapons = WeaponTable::default();
        let mut manager = EntityManager::new();
        let id = manager.spawn(Entity {
            velocity: Vec2::new(0.4, 0.0),
            ..Entity::new(Vec2::new(0.5, 0.5))
        });
        for _ in 0..5 {
            manager.update(&tick(&grid, &weapons), &MoveIntent::default(), &mut NullSound);
            assert_index_consistent(&manager);
        }
        assert_eq!(manager.get(id).map(|entity| tile_key(entity.pos)), Some((2, 0)));
    }

    #[test]
    fn with_entity_mut_rehomes_teleports() {
        let mut manager = EntityManager::new();
        let id = manager.spawn(Entity::new(Vec2::new(0.5, 0.5)));
        manager.with_entity_mut(id, |entity| entity.pos = Vec2::new(7.5, 7.5));
        assert!(manager.spatial().contains(id, (7, 7)));
        assert!(!manager.spatial().contains(id, (0, 0)));
    }

    #[test]
    fn spent_missile_leaves_the_live_set() {
        let grid = GridMap::new();
        let weapons = WeaponTable::default();
        let mut manager = EntityManager::new();
        let launcher = Entity::new(Vec2::new(0.5, 0.5));
        let spec = MissileSpec {
            speed: 1.0,
            ..MissileSpec::default()
        };
        let missile =
            manager.spawn(launch_missile(&spec, &launcher, Vec3::new(0.0, 1.0, 0.0), 2.5));
        for _ in 0..2 {
            manager.update(&tick(&grid, &weapons), &MoveIntent::default(), &mut NullSound);
            assert!(manager.get(missile).is_some());
        }
        manager.update(&tick(&grid, &weapons), &MoveIntent::default(), &mut NullSound);
        assert!(manager.get(missile).is_none());
        assert!(manager.spatial().keys_of(missile).is_empty());
    }

    #[test]
    fn detonation_splashes_neighbours_and_plays_sound() {
        let grid = GridMap::new();
        let weapons = WeaponTable::default();
        let mut manager = EntityManager::new();
        let target = manager.spawn(Entity::new(Vec2::new(0.5, 1.5)));
        let bystander = manager.spawn(Entity::new(Vec2::new(0.9, 1.5)));
        let far = manager.spawn(Entity::new(Vec2::new(4.5, 4.5)));
        let launcher = Entity {
            id: EntityId(99),
            ..Entity::new(Vec2::new(0.5, 0.5))
        };
        let spec = MissileSpec {
            speed: 0.2,
            detonate_sound: Some(SoundId(7)),
            ..MissileSpec::default()
        };
        manager.spawn(launch_missile(&spec, &launcher, Vec3::new(0.0, 1.0, 0.0), 10.0));

        let mut sounds = RecordedSound::default();
        for _ in 0..10 {
            manager.update(&tick(&grid, &weapons), &MoveIntent::default(), &mut sounds);
        }
        assert!(manager.get(target).is_some_and(Entity::is_dead));
        let splashed = manager.get(bystander).map(|entity| entity.health).unwrap_or_default();
        assert!(splashed < 100.0 && splashed > 50.0);
        assert_eq!(manager.get(far).map(|entity| entity.health), Some(100.0));
        assert_eq!(sounds.cues.first().map(|cue| cue.0), Some(SoundId(7)));
    }

    #[test]
    fn player_follows_intent_through_update() {
        let grid = GridMap::new();
        let weapons = WeaponTable::default();
        let mut manager = EntityManager::new();
        let player =
            manager.spawn_player(new_player(Vec2::new(0.5, 0.5), PlayerSettings::default()));
        let intent = MoveIntent {
            forward: 1.0,
            ..MoveIntent::default()
        };
        manager.update(&tick(&grid, &weapons), &intent, &mut NullSound);
        assert_eq!(manager.player_id(), Some(player));
        assert!(manager.player().is_some_and(|entity| entity.pos.y > 0.5));
    }
}
