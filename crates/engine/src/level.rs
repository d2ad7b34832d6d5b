use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::audio::{SoundId, SoundSink};
use crate::combat::{MissileSpec, Weapon, WeaponKind, WeaponTable, WeaponVisuals};
use crate::entity::{
    new_player, player_attack, player_interact, player_switch_weapon, AnimationState, Animator,
    AttackOutcome, Body, Entity, EntityId, EntityKind, EntityManager, ItemState, MoveIntent,
    PhysicsTuning, PlayerSettings, Sprite, TickContext, DEFAULT_STATE,
};
use crate::world::{
    format_tile_key, parse_tile_key, tile_key, GridMap, Rect, Rgb, Semitile, SemitileAxis,
    TextureId, Tile, Vec2,
};

/// Where a floor or ceiling takes its pixels from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Texture(TextureId),
    Color(Rgb),
    /// Panorama that scrolls with yaw and ignores perspective.
    Sky(TextureId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub floor: Surface,
    pub ceiling: Surface,
    /// Distance fog strength; 0 disables darkening.
    pub darkness: f32,
    /// Height of a textured ceiling. Other ceilings are open.
    pub ceiling_elevation: f32,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            floor: Surface::Color([48, 48, 48]),
            ceiling: Surface::Color([24, 24, 32]),
            darkness: 1.0,
            ceiling_elevation: 1.0,
        }
    }
}

impl Environment {
    /// Elevation that physics treats as the roof.
    pub fn ceiling_height(&self) -> f32 {
        match self.ceiling {
            Surface::Texture(_) => self.ceiling_elevation,
            Surface::Color(_) | Surface::Sky(_) => f32::INFINITY,
        }
    }
}

/// Per-frame hook for level-specific behaviour such as moving platforms.
pub trait LevelScript {
    fn tick(&mut self, level: &mut Level, dt: f32);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoScript;

impl LevelScript for NoScript {
    fn tick(&mut self, _level: &mut Level, _dt: f32) {}
}

#[derive(Debug, Error)]
pub enum LevelLoadError {
    #[error("failed to read level file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse level file {path} at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("level file {path} has malformed tile key {key:?}; expected \"x;y\"")]
    BadKey { path: PathBuf, key: String },
    #[error("level file {path} references unknown weapon {name:?}")]
    UnknownWeapon { path: PathBuf, name: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelFile {
    /// Image paths relative to the level file; the index is the texture id.
    #[serde(default)]
    pub textures: Vec<PathBuf>,
    #[serde(default)]
    pub tiles: BTreeMap<String, TileRecord>,
    #[serde(default)]
    pub environment: EnvironmentRecord,
    pub player: PlayerRecord,
    #[serde(default)]
    pub weapons: Vec<WeaponRecord>,
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TileRecord {
    pub elevation: Option<f32>,
    pub height: Option<f32>,
    pub texture: Option<u16>,
    pub top: Option<Rgb>,
    pub bottom: Option<Rgb>,
    /// `[x, y, w, h]` in tile-local units.
    pub rect: Option<[f32; 4]>,
    pub semitile: Option<SemitileRecord>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisRecord {
    X,
    Y,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SemitileRecord {
    pub axis: AxisRecord,
    pub pos: [f32; 2],
    pub width: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EnvironmentRecord {
    pub floor: Surface,
    pub ceiling: Surface,
    pub darkness: f32,
    pub ceiling_elevation: f32,
}

impl Default for EnvironmentRecord {
    fn default() -> Self {
        let environment = Environment::default();
        Self {
            floor: environment.floor,
            ceiling: environment.ceiling,
            darkness: environment.darkness,
            ceiling_elevation: environment.ceiling_elevation,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerRecord {
    pub pos: [f32; 2],
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub elevation: f32,
    /// Weapon held at spawn, by name.
    pub weapon: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponPreset {
    Fist,
    Shotgun,
    Launcher,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeaponRecord {
    pub preset: WeaponPreset,
    pub name: Option<String>,
    #[serde(default)]
    pub hold: Vec<u16>,
    #[serde(default)]
    pub attack: Vec<u16>,
    pub ground: Option<u16>,
    #[serde(default = "default_hold_time")]
    pub hold_time: f32,
    #[serde(default = "default_attack_time")]
    pub attack_time: f32,
    pub attack_sound: Option<u16>,
    pub missile: Option<MissileRecord>,
}

fn default_hold_time() -> f32 {
    60.0
}

fn default_attack_time() -> f32 {
    20.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MissileRecord {
    #[serde(default)]
    pub flight: Vec<u16>,
    #[serde(default)]
    pub explosion: Vec<u16>,
    #[serde(default = "default_attack_time")]
    pub explosion_time: f32,
    pub detonate_sound: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnimationRecord {
    /// `textures[direction][frame]`.
    pub textures: Vec<Vec<u16>>,
    pub animation_time: f32,
    #[serde(default)]
    pub trigger: bool,
    #[serde(default = "default_loops")]
    pub loops: i32,
}

fn default_loops() -> i32 {
    -1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum EntityKindRecord {
    Normal,
    Item { weapon: String, count: u32 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityRecord {
    pub pos: [f32; 2],
    #[serde(default)]
    pub elevation: f32,
    #[serde(default)]
    pub yaw: f32,
    #[serde(flatten)]
    pub kind: EntityKindRecord,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub health: Option<f32>,
    #[serde(default)]
    pub gravity: f32,
    /// One texture per facing bucket.
    #[serde(default)]
    pub textures: Vec<u16>,
    /// Named animation states; `default` is entered at spawn.
    #[serde(default)]
    pub states: BTreeMap<String, AnimationRecord>,
    pub death_texture: Option<u16>,
}

/// Everything that lives in one playable map.
#[derive(Debug)]
pub struct Level {
    pub grid: GridMap,
    pub entities: EntityManager,
    pub environment: Environment,
    pub weapons: WeaponTable,
    pub tuning: PhysicsTuning,
    /// Texture files, absolute or relative to the working directory.
    pub textures: Vec<PathBuf>,
    timer: f32,
}

impl Level {
    pub fn new(grid: GridMap, environment: Environment) -> Self {
        Self {
            grid,
            entities: EntityManager::new(),
            environment,
            weapons: WeaponTable::default(),
            tuning: PhysicsTuning::default(),
            textures: Vec::new(),
            timer: 0.0,
        }
    }

    /// Builds a level from a parsed file. `source` names the file in errors
    /// and anchors relative texture paths.
    pub fn from_file(file: LevelFile, source: &Path) -> Result<Self, LevelLoadError> {
        let mut tiles = Vec::with_capacity(file.tiles.len());
        for (raw_key, record) in &file.tiles {
            let key = parse_tile_key(raw_key).ok_or_else(|| LevelLoadError::BadKey {
                path: source.to_path_buf(),
                key: raw_key.clone(),
            })?;
            tiles.push((key, tile_from_record(record)));
        }
        let grid = GridMap::from_tiles(tiles);
        let dropped = file.tiles.len() - grid.len();
        if dropped > 0 {
            warn!(path = %source.display(), dropped, "level_tiles_dropped");
        }

        let environment = Environment {
            floor: file.environment.floor,
            ceiling: file.environment.ceiling,
            darkness: file.environment.darkness.max(0.0),
            ceiling_elevation: file.environment.ceiling_elevation,
        };
        let mut level = Level::new(grid, environment);

        let base = source.parent().unwrap_or_else(|| Path::new(""));
        level.textures = file.textures.iter().map(|path| base.join(path)).collect();

        if file.weapons.is_empty() {
            level.weapons.insert(Weapon::fist());
            level.weapons.insert(Weapon::shotgun());
            level.weapons.insert(Weapon::launcher());
        }
        for record in &file.weapons {
            level.weapons.insert(weapon_from_record(record));
        }

        let unknown_weapon = |name: &str| LevelLoadError::UnknownWeapon {
            path: source.to_path_buf(),
            name: name.to_string(),
        };

        let mut player = new_player(
            Vec2::new(file.player.pos[0], file.player.pos[1]),
            PlayerSettings::default(),
        );
        player.yaw = file.player.yaw;
        player.elevation = file.player.elevation.max(0.0);
        if let Some(name) = &file.player.weapon {
            let id = level.weapons.find(name).ok_or_else(|| unknown_weapon(name))?;
            let capacity = level.weapons.get(id).map_or(0, |weapon| weapon.capacity);
            if let Some(state) = player.player_mut() {
                state.inventory.give(id, capacity, capacity);
                state.weapon = Some(id);
            }
        }
        level.entities.spawn_player(player);

        for record in &file.entities {
            let entity = match &record.kind {
                EntityKindRecord::Item { weapon, count } => {
                    let id = level.weapons.find(weapon).ok_or_else(|| unknown_weapon(weapon))?;
                    let ground = level
                        .weapons
                        .get(id)
                        .and_then(|weapon| weapon.visuals.ground);
                    let item = ItemState {
                        weapon: id,
                        count: *count,
                    };
                    let pos = Vec2::new(record.pos[0], record.pos[1]);
                    let mut entity = Entity::item(pos, item, ground);
                    entity.elevation = record.elevation.max(0.0);
                    entity
                }
                EntityKindRecord::Normal => entity_from_record(record),
            };
            level.entities.spawn(entity);
        }

        info!(
            path = %source.display(),
            tiles = level.grid.len(),
            entities = level.entities.len(),
            textures = level.textures.len(),
            "level_loaded"
        );
        Ok(level)
    }

    /// Level clock in game ticks.
    pub fn timer(&self) -> f32 {
        self.timer
    }

    pub fn ceiling(&self) -> f32 {
        self.environment.ceiling_height()
    }

    /// Advances the clock, runs the script, then steps every entity.
    pub fn update(
        &mut self,
        dt: f32,
        intent: &MoveIntent,
        sounds: &mut dyn SoundSink,
        script: &mut dyn LevelScript,
    ) {
        self.timer += dt;
        script.tick(self, dt);
        let tick = TickContext {
            grid: &self.grid,
            weapons: &self.weapons,
            ceiling: self.environment.ceiling_height(),
            tuning: self.tuning,
            dt,
            level_timer: self.timer,
        };
        self.entities.update(&tick, intent, sounds);
    }

    pub fn player_attack(&mut self, sounds: &mut dyn SoundSink) -> AttackOutcome {
        player_attack(&mut self.entities, &self.grid, &self.weapons, sounds)
    }

    pub fn player_interact(&mut self) -> Option<EntityId> {
        player_interact(&mut self.entities, &self.grid, &self.weapons)
    }

    /// Equips the `slot`-th owned weapon, in weapon id order.
    pub fn switch_weapon(&mut self, slot: usize) -> bool {
        let Some(weapon) = self
            .entities
            .player()
            .and_then(Entity::player)
            .and_then(|state| state.inventory.weapons().nth(slot))
        else {
            return false;
        };
        let switched = player_switch_weapon(&mut self.entities, weapon);
        if switched {
            debug!(weapon = weapon.0, "weapon_switched");
        }
        switched
    }
}

/// Reads and builds a level from a JSON file.
pub fn load_level_json(path: &Path) -> Result<Level, LevelLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| LevelLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file = parse_level_json(&raw, path)?;
    Level::from_file(file, path)
}

pub fn parse_level_json(raw: &str, path: &Path) -> Result<LevelFile, LevelLoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, LevelFile>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        LevelLoadError::Parse {
            path: path.to_path_buf(),
            json_path,
            source: error.into_inner(),
        }
    })
}

fn tile_from_record(record: &TileRecord) -> Tile {
    let defaults = Tile::default();
    Tile {
        elevation: record.elevation.unwrap_or(defaults.elevation),
        height: record.height.unwrap_or(defaults.height),
        texture: record.texture.map(TextureId).unwrap_or(defaults.texture),
        top: record.top,
        bottom: record.bottom,
        rect: record.rect.map(|[x, y, w, h]| Rect::new(x, y, w, h)),
        semitile: record.semitile.as_ref().map(|semitile| Semitile {
            axis: match semitile.axis {
                AxisRecord::X => SemitileAxis::X,
                AxisRecord::Y => SemitileAxis::Y,
            },
            pos: Vec2::new(semitile.pos[0], semitile.pos[1]),
            width: semitile.width,
        }),
    }
}

fn textures(ids: &[u16]) -> Vec<TextureId> {
    ids.iter().copied().map(TextureId).collect()
}

fn weapon_from_record(record: &WeaponRecord) -> Weapon {
    let mut weapon = match record.preset {
        WeaponPreset::Fist => Weapon::fist(),
        WeaponPreset::Shotgun => Weapon::shotgun(),
        WeaponPreset::Launcher => Weapon::launcher(),
    };
    if let Some(name) = &record.name {
        weapon.name = name.clone();
    }
    weapon.visuals = WeaponVisuals {
        ground: record.ground.map(TextureId),
        hold: textures(&record.hold),
        attack: textures(&record.attack),
        hold_time: record.hold_time,
        attack_time: record.attack_time,
    };
    weapon.attack_sound = record.attack_sound.map(SoundId);
    if let (WeaponKind::Missile(spec), Some(missile)) = (&mut weapon.kind, &record.missile) {
        *spec = MissileSpec {
            sprite: missile_sprite(missile),
            detonate_sound: missile.detonate_sound.map(SoundId),
            ..spec.clone()
        };
    }
    weapon
}

fn missile_sprite(record: &MissileRecord) -> Sprite {
    if record.flight.is_empty() && record.explosion.is_empty() {
        return Sprite::None;
    }
    Sprite::Animated(
        Animator::new(AnimationState::looping(vec![textures(&record.flight)], 10.0)).with_state(
            "attack",
            AnimationState::once(vec![textures(&record.explosion)], record.explosion_time),
        ),
    )
}

fn animation_state(record: &AnimationRecord) -> AnimationState {
    AnimationState {
        textures: record.textures.iter().map(|frames| textures(frames)).collect(),
        animation_time: record.animation_time,
        trigger: record.trigger,
        loops: record.loops,
    }
}

fn entity_from_record(record: &EntityRecord) -> Entity {
    let defaults = Body::default();
    let mut entity = Entity::new(Vec2::new(record.pos[0], record.pos[1]));
    entity.elevation = record.elevation.max(0.0);
    entity.yaw = record.yaw;
    entity.gravity = record.gravity;
    entity.body = Body::new(
        record.width.unwrap_or(defaults.width),
        record.height.unwrap_or(defaults.height),
    );
    if let Some(health) = record.health {
        entity.health = health;
    }
    entity.death_texture = record.death_texture.map(TextureId);

    let default = record
        .states
        .get(DEFAULT_STATE)
        .or_else(|| record.states.values().next());
    if let Some(default) = default {
        let animator = record
            .states
            .iter()
            .filter(|(name, _)| name.as_str() != DEFAULT_STATE)
            .fold(Animator::new(animation_state(default)), |animator, (name, state)| {
                animator.with_state(name, animation_state(state))
            });
        entity.kind = EntityKind::Stateful;
        entity.sprite = Sprite::Animated(animator);
    } else if !record.textures.is_empty() {
        entity.sprite = Sprite::Directional(textures(&record.textures));
    } else {
        warn!(
            tile = %format_tile_key(tile_key(entity.pos)),
            "entity_without_textures"
        );
    }
    entity
}
