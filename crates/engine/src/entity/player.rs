use tracing::debug;

use crate::audio::SoundSink;
use crate::combat::{
    resolve_attack, AttackQuery, Inventory, TargetFilter, WeaponId, WeaponKind, WeaponTable,
};
use crate::world::{GridMap, TextureId, Vec2, Vec3, SMALL};

use super::missile::launch_missile;
use super::{step_physics, Body, Entity, EntityId, EntityKind, EntityManager, PhysicsContext};

/// Movement requested for one frame. `forward` and `right` are axis values in
/// [-1, 1]; `yaw_delta` is degrees to turn this frame; `up` requests a jump.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveIntent {
    pub forward: f32,
    pub right: f32,
    pub yaw_delta: f32,
    pub up: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSettings {
    /// Tiles per tick at full input.
    pub move_speed: f32,
    /// Degrees per tick at full input.
    pub turn_speed: f32,
    pub jump_velocity: f32,
    /// Eye height above the body's bottom.
    pub camera_offset: f32,
    pub headbob_strength: f32,
    pub headbob_frequency: f32,
    pub weaponbob_strength: f32,
    pub weaponbob_frequency: f32,
    /// Fraction of the remaining gap the camera closes per tick while climbing.
    pub climb_speed: f32,
    /// Field of interaction, degrees.
    pub foi: f32,
    /// Range of interaction, tiles.
    pub roi: f32,
    /// Field of attack, degrees.
    pub foa: f32,
    /// Missile autoaim radius, tiles.
    pub roa: f32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            move_speed: 0.05,
            turn_speed: 2.5,
            jump_velocity: 0.06,
            camera_offset: 0.5,
            headbob_strength: 0.02,
            headbob_frequency: 0.2,
            weaponbob_strength: 6.0,
            weaponbob_frequency: 0.1,
            climb_speed: 0.2,
            foi: 60.0,
            roi: 0.25,
            foa: 60.0,
            roa: 0.75,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub settings: PlayerSettings,
    pub inventory: Inventory,
    pub weapon: Option<WeaponId>,
    /// Ticks until the weapon may fire again.
    pub cooldown: f32,
    /// Smoothed camera height, including head-bob.
    pub render_elevation: f32,
    /// Screen-space sway of the held weapon, in pixels.
    pub weapon_offset: (f32, f32),
    climbing: bool,
    weapon_attacking: bool,
    weapon_attack_timer: f32,
}

impl PlayerState {
    pub fn new(settings: PlayerSettings) -> Self {
        Self {
            settings,
            inventory: Inventory::default(),
            weapon: None,
            cooldown: 0.0,
            render_elevation: settings.camera_offset,
            weapon_offset: (0.0, 0.0),
            climbing: false,
            weapon_attacking: false,
            weapon_attack_timer: 0.0,
        }
    }

    pub fn is_climbing(&self) -> bool {
        self.climbing
    }

    /// Frame of the held weapon for the HUD.
    pub fn weapon_frame(&self, weapons: &WeaponTable, level_timer: f32) -> Option<TextureId> {
        let weapon = weapons.get(self.weapon?)?;
        let visuals = &weapon.visuals;
        if self.weapon_attacking && !visuals.attack.is_empty() && visuals.attack_time > 0.0 {
            let raw = self.weapon_attack_timer / visuals.attack_time * visuals.attack.len() as f32;
            let index = (raw.max(0.0) as usize).min(visuals.attack.len() - 1);
            return visuals.attack.get(index).copied();
        }
        if visuals.hold.is_empty() {
            return None;
        }
        if !(visuals.hold_time > 0.0) {
            return visuals.hold.first().copied();
        }
        let raw = (level_timer / visuals.hold_time * visuals.hold.len() as f32).floor();
        visuals
            .hold
            .get((raw.max(0.0) as usize) % visuals.hold.len())
            .copied()
    }

    fn tick_weapon(
        &mut self,
        attack_time: Option<f32>,
        dt: f32,
        level_timer: f32,
        bob_factor: f32,
    ) {
        self.cooldown = (self.cooldown - dt).max(0.0);
        if bob_factor > 0.0 {
            let phase = level_timer * self.settings.weaponbob_frequency;
            let strength = self.settings.weaponbob_strength * bob_factor;
            self.weapon_offset = (phase.sin() * strength, (phase.cos() * strength / 2.0).abs());
        }
        if self.weapon_attacking {
            self.weapon_attack_timer += dt;
            if self.weapon_attack_timer >= attack_time.unwrap_or(0.0) {
                self.weapon_attacking = false;
                self.weapon_attack_timer = 0.0;
            }
        }
    }
}

pub fn new_player(pos: Vec2, settings: PlayerSettings) -> Entity {
    Entity {
        kind: EntityKind::Player(Box::new(PlayerState::new(settings))),
        pos,
        body: Body::new(0.4, 0.6),
        climb: 0.2,
        gravity: 0.004,
        ..Entity::default()
    }
}

/// One tick of player control, physics and camera smoothing.
pub(crate) fn step_player(
    entity: &mut Entity,
    ctx: &PhysicsContext<'_>,
    dt: f32,
    level_timer: f32,
    intent: &MoveIntent,
    weapon_attack_time: Option<f32>,
) {
    let Some(settings) = entity.player().map(|state| state.settings) else {
        return;
    };
    let speed = entity.velocity.length();
    let bob_update = speed >= SMALL;

    entity.yaw = (entity.yaw + intent.yaw_delta).rem_euclid(360.0);
    if intent.forward != 0.0 || intent.right != 0.0 {
        entity.velocity = entity.forward() * (intent.forward * settings.move_speed)
            + Vec2::right_of_yaw(entity.yaw) * (intent.right * settings.move_speed);
    }
    if let Some(up) = intent.up {
        if entity.collisions.grounded() {
            entity.elevation_velocity = up;
        }
    }

    step_physics(entity, ctx, dt);

    entity.velocity = entity.velocity * ctx.tuning.friction.powf(dt);
    if entity.velocity.length() < SMALL {
        entity.velocity = Vec2::ZERO;
    }

    let climbed = entity.collisions.climbed();
    let touching = entity.collisions.touching_vertical();
    let target = entity.elevation + settings.camera_offset;
    let factor = (speed * 20.0).min(2.0);
    let Some(state) = entity.player_mut() else {
        return;
    };
    state.climbing |= climbed;
    if state.climbing {
        let difference = target - state.render_elevation;
        let mult = 1.0 - (1.0 - settings.climb_speed).powf(dt);
        state.render_elevation += difference * mult;
        if difference < SMALL {
            state.climbing = false;
        }
    } else {
        state.render_elevation = target;
        if bob_update && touching {
            state.render_elevation += (level_timer * settings.headbob_frequency).sin()
                * settings.headbob_strength
                * factor;
        }
    }
    let bob_factor = if bob_update { factor } else { 0.0 };
    state.tick_weapon(weapon_attack_time, dt, level_timer, bob_factor);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    /// No weapon, still cooling down, or out of ammo.
    Unable,
    Missed,
    Hit(EntityId),
    Launched(EntityId),
}

/// Fires the player's held weapon.
pub fn player_attack(
    manager: &mut EntityManager,
    grid: &GridMap,
    weapons: &WeaponTable,
    sounds: &mut dyn SoundSink,
) -> AttackOutcome {
    let Some(player_id) = manager.player_id() else {
        return AttackOutcome::Unable;
    };
    let Some(player) = manager.get(player_id) else {
        return AttackOutcome::Unable;
    };
    let Some(state) = player.player() else {
        return AttackOutcome::Unable;
    };
    let Some(weapon_id) = state.weapon else {
        return AttackOutcome::Unable;
    };
    let Some(weapon) = weapons.get(weapon_id) else {
        return AttackOutcome::Unable;
    };
    if state.cooldown > 0.0 {
        return AttackOutcome::Unable;
    }
    if weapon.consumes_ammo() && state.inventory.count(weapon_id) == 0 {
        return AttackOutcome::Unable;
    }

    if let Some(sound) = weapon.attack_sound {
        sounds.play(sound, Some(player.center3()));
    }
    let settings = state.settings;
    let query = AttackQuery {
        range: weapon.range,
        field: settings.foa,
        autoaim_radius: match weapon.kind {
            WeaponKind::Missile(_) => Some(settings.roa),
            WeaponKind::Melee | WeaponKind::Hitscan => None,
        },
        ..AttackQuery::default()
    };
    let hit = resolve_attack(
        player,
        &query,
        grid,
        manager.spatial(),
        manager.entities(),
    );

    let outcome = match &weapon.kind {
        WeaponKind::Melee | WeaponKind::Hitscan => match hit {
            Some(hit) => {
                manager.damage(hit.target, weapon.damage);
                AttackOutcome::Hit(hit.target)
            }
            None => AttackOutcome::Missed,
        },
        WeaponKind::Missile(spec) => {
            let origin = player.center3();
            let direction = hit
                .and_then(|hit| manager.get(hit.target))
                .map(|target| target.center3() - origin)
                .unwrap_or_else(|| Vec3::from_plane(player.forward(), 0.0));
            let missile = launch_missile(spec, player, direction, weapon.range);
            AttackOutcome::Launched(manager.spawn(missile))
        }
    };
    debug!(weapon = weapon.name.as_str(), outcome = ?outcome, "player_attack");

    let consumed = match (&weapon.kind, outcome) {
        (WeaponKind::Melee, AttackOutcome::Hit(_)) => weapon.consumes_ammo(),
        (WeaponKind::Melee, _) => false,
        _ => weapon.consumes_ammo(),
    };
    manager.with_entity_mut(player_id, |player| {
        if let Some(state) = player.player_mut() {
            state.cooldown = weapon.cooldown;
            state.weapon_attacking = true;
            state.weapon_attack_timer = 0.0;
            if consumed {
                state.inventory.take_one(weapon_id);
            }
        }
    });
    outcome
}

/// Picks up the nearest item in front of the player. Interaction ignores walls.
pub fn player_interact(
    manager: &mut EntityManager,
    grid: &GridMap,
    weapons: &WeaponTable,
) -> Option<EntityId> {
    let player_id = manager.player_id()?;
    let player = manager.get(player_id)?;
    let settings = player.player()?.settings;
    let query = AttackQuery {
        range: settings.roi,
        field: settings.foi,
        targets: TargetFilter::Items,
        occlusion: false,
        ..AttackQuery::default()
    };
    let hit = resolve_attack(player, &query, grid, manager.spatial(), manager.entities())?;
    let item = match manager.get(hit.target).map(|entity| &entity.kind) {
        Some(EntityKind::Item(item)) => *item,
        _ => return None,
    };
    let capacity = weapons.get(item.weapon).map_or(0, |weapon| weapon.capacity);
    manager.with_entity_mut(player_id, |player| {
        if let Some(state) = player.player_mut() {
            state.inventory.give(item.weapon, item.count, capacity);
            if state.weapon.is_none() {
                state.weapon = Some(item.weapon);
            }
        }
    });
    manager.remove(hit.target);
    debug!(item = hit.target.0, weapon = item.weapon.0, count = item.count, "item_picked_up");
    Some(hit.target)
}

/// Equips `weapon` when the inventory holds it.
pub fn player_switch_weapon(manager: &mut EntityManager, weapon: WeaponId) -> bool {
    let Some(player_id) = manager.player_id() else {
        return false;
    };
    manager
        .with_entity_mut(player_id, |player| match player.player_mut() {
            Some(state) if state.inventory.has(weapon) => {
                state.weapon = Some(weapon);
                true
            }
            _ => false,
        })
        .unwrap_or(false)
}
