mod manager;
mod missile;
mod pathfind;
mod physics;
mod player;
mod sprite;

use crate::combat::WeaponId;
use crate::world::{Rect, TextureId, Vec2, Vec3, PLACEHOLDER_TEXTURE};

pub use manager::{EntityManager, EntityStore, TickContext};
pub use missile::{launch_missile, step_missile, Detonation, MissileState};
pub use pathfind::{PathNode, PathWeights, Pathfinder};
pub use physics::{obstacles_around, step_physics, Obstacle, PhysicsContext, PhysicsTuning};
pub use player::{
    new_player, player_attack, player_interact, player_switch_weapon, AttackOutcome, MoveIntent,
    PlayerSettings, PlayerState,
};
pub use sprite::{direction_index, AnimationState, Animator, Sprite, DEFAULT_STATE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

/// Per-side contact recorded by the last physics step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Contact {
    #[default]
    None = 0,
    Blocked = 1,
    Climbed = 2,
}

/// Index 0 is the negative side of an axis, index 1 the positive side.
/// On `z`, index 0 is the floor and index 1 the ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Collisions {
    pub x: [Contact; 2],
    pub y: [Contact; 2],
    pub z: [Contact; 2],
}

impl Collisions {
    pub fn climbed(&self) -> bool {
        self.x.contains(&Contact::Climbed) || self.y.contains(&Contact::Climbed)
    }

    pub fn grounded(&self) -> bool {
        self.z[0] != Contact::None
    }

    pub fn touching_vertical(&self) -> bool {
        self.z[0] != Contact::None || self.z[1] != Contact::None
    }
}

/// Independent footprints for collision, hit tests and billboards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub width: f32,
    pub height: f32,
    pub attack_width: f32,
    pub attack_height: f32,
    pub render_width: f32,
    pub render_height: f32,
}

impl Body {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            attack_width: width,
            attack_height: height,
            render_width: width,
            render_height: height,
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::new(0.5, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemState {
    pub weapon: WeaponId,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Normal,
    Stateful,
    Missile(MissileState),
    Item(ItemState),
    Player(Box<PlayerState>),
}

impl EntityKind {
    /// Whether other bodies are pushed out of this one.
    pub fn collides(&self) -> bool {
        !matches!(self, EntityKind::Missile(_) | EntityKind::Item(_))
    }

    /// Whether combat may select this entity as a target.
    pub fn attackable(&self) -> bool {
        !matches!(self, EntityKind::Missile(_) | EntityKind::Item(_))
    }

    pub fn is_player(&self) -> bool {
        matches!(self, EntityKind::Player(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub pos: Vec2,
    /// Height of the body's bottom above ground 0. Never negative.
    pub elevation: f32,
    /// Degrees; 0 faces +y.
    pub yaw: f32,
    pub velocity: Vec2,
    /// Decaying impulse added on top of `velocity`.
    pub boost: Vec2,
    pub elevation_velocity: f32,
    pub yaw_velocity: f32,
    pub body: Body,
    pub climb: f32,
    pub gravity: f32,
    pub health: f32,
    pub sprite: Sprite,
    pub death_texture: Option<TextureId>,
    pub collisions: Collisions,
    pub(crate) dead: bool,
    pub(crate) remove: bool,
}

impl Default for Entity {
    fn default() -> Self {
        Self {
            id: EntityId(0),
            kind: EntityKind::Normal,
            pos: Vec2::ZERO,
            elevation: 0.0,
            yaw: 0.0,
            velocity: Vec2::ZERO,
            boost: Vec2::ZERO,
            elevation_velocity: 0.0,
            yaw_velocity: 0.0,
            body: Body::default(),
            climb: 0.2,
            gravity: 0.0,
            health: 100.0,
            sprite: Sprite::None,
            death_texture: None,
            collisions: Collisions::default(),
            dead: false,
            remove: false,
        }
    }
}

impl Entity {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            ..Self::default()
        }
    }

    pub fn stateful(pos: Vec2, animator: Animator) -> Self {
        Self {
            kind: EntityKind::Stateful,
            pos,
            sprite: Sprite::Animated(animator),
            ..Self::default()
        }
    }

    pub fn item(pos: Vec2, item: ItemState, texture: Option<TextureId>) -> Self {
        Self {
            kind: EntityKind::Item(item),
            pos,
            body: Body::new(0.5, 0.5),
            sprite: texture
                .map(|texture| Sprite::Directional(vec![texture]))
                .unwrap_or(Sprite::None),
            ..Self::default()
        }
    }

    pub fn top(&self) -> f32 {
        self.elevation + self.body.height
    }

    pub fn center_elevation(&self) -> f32 {
        self.elevation + self.body.height / 2.0
    }

    pub fn center3(&self) -> Vec3 {
        Vec3::from_plane(self.pos, self.center_elevation())
    }

    pub fn rect(&self) -> Rect {
        Rect::from_center(self.pos, self.body.width, self.body.width)
    }

    pub fn attack_rect(&self) -> Rect {
        Rect::from_center(self.pos, self.body.attack_width, self.body.attack_width)
    }

    /// Vertical extent used by hit tests, centred on the body.
    pub fn attack_span(&self) -> (f32, f32) {
        let center = self.center_elevation();
        let half = self.body.attack_height / 2.0;
        (center - half, center + half)
    }

    pub fn forward(&self) -> Vec2 {
        Vec2::from_yaw(self.yaw)
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Applies damage and reports whether this call killed the entity.
    pub fn damage(&mut self, amount: f32) -> bool {
        if self.dead {
            return false;
        }
        self.health -= amount;
        if self.health <= 0.0 {
            self.dead = true;
            return true;
        }
        false
    }

    pub fn request_removal(&mut self) {
        self.remove = true;
    }

    pub fn removal_requested(&self) -> bool {
        self.remove
    }

    /// Texture seen from `viewer`. Dead entities show their death texture, or
    /// the placeholder when they have none.
    pub fn texture_for(&self, viewer: Vec2) -> Option<TextureId> {
        if self.dead {
            return Some(self.death_texture.unwrap_or(PLACEHOLDER_TEXTURE));
        }
        self.sprite.texture_for(self.yaw, self.pos, viewer)
    }

    pub fn player(&self) -> Option<&PlayerState> {
        match &self.kind {
            EntityKind::Player(state) => Some(state),
            _ => None,
        }
    }

    pub fn player_mut(&mut self) -> Option<&mut PlayerState> {
        match &mut self.kind {
            EntityKind::Player(state) => Some(state),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_heights_follow_body() {
        let entity = Entity {
            elevation: 0.5,
            body: Body::new(0.5, 1.0),
            ..Entity::default()
        };
        assert_eq!(entity.top(), 1.5);
        assert_eq!(entity.center_elevation(), 1.0);
        assert_eq!(entity.attack_span(), (0.5, 1.5));
    }

    #[test]
    fn damage_kills_once_and_swaps_texture() {
        let mut entity = Entity {
            sprite: Sprite::Directional(vec![TextureId(4)]),
            death_texture: Some(TextureId(9)),
            ..Entity::new(Vec2::new(1.5, 1.5))
        };
        assert_eq!(entity.texture_for(Vec2::ZERO), Some(TextureId(4)));
        assert!(!entity.damage(40.0));
        assert!(entity.damage(60.0));
        assert!(!entity.damage(10.0));
        assert!(entity.is_dead());
        assert_eq!(entity.texture_for(Vec2::ZERO), Some(TextureId(9)));
    }

    #[test]
    fn missiles_and_items_are_neither_solid_nor_targets() {
        let item = EntityKind::Item(ItemState {
            weapon: WeaponId(0),
            count: 1,
        });
        assert!(!item.collides());
        assert!(!item.attackable());
        assert!(EntityKind::Stateful.collides());
        assert!(EntityKind::Normal.attackable());
    }

    #[test]
    fn contact_codes_match_tri_state() {
        assert_eq!(Contact::None as u8, 0);
        assert_eq!(Contact::Blocked as u8, 1);
        assert_eq!(Contact::Climbed as u8, 2);
    }
}
