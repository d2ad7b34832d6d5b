use std::collections::BTreeMap;

use crate::audio::SoundId;
use crate::entity::Sprite;
use crate::world::TextureId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeaponId(pub u16);

/// Projectile fired by a missile weapon.
#[derive(Debug, Clone, PartialEq)]
pub struct MissileSpec {
    /// Tiles per game tick.
    pub speed: f32,
    pub damage: f32,
    pub blast_radius: f32,
    pub width: f32,
    pub height: f32,
    /// Expected to carry an `attack` state for the detonation.
    pub sprite: Sprite,
    pub detonate_sound: Option<SoundId>,
}

impl Default for MissileSpec {
    fn default() -> Self {
        Self {
            speed: 0.075,
            damage: 100.0,
            blast_radius: 0.5,
            width: 0.25,
            height: 0.25,
            sprite: Sprite::None,
            detonate_sound: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WeaponKind {
    Melee,
    Hitscan,
    Missile(MissileSpec),
}

/// First-person textures and frame timing for the held weapon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeaponVisuals {
    pub ground: Option<TextureId>,
    pub hold: Vec<TextureId>,
    pub attack: Vec<TextureId>,
    pub hold_time: f32,
    pub attack_time: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Weapon {
    pub name: String,
    pub kind: WeaponKind,
    pub damage: f32,
    pub range: f32,
    /// Game ticks between attacks.
    pub cooldown: f32,
    /// Ammo or durability. Zero means the weapon is never consumed.
    pub capacity: u32,
    pub visuals: WeaponVisuals,
    pub attack_sound: Option<SoundId>,
}

impl Weapon {
    pub fn fist() -> Self {
        Self {
            name: "fist".to_string(),
            kind: WeaponKind::Melee,
            damage: 100.0,
            range: 0.25,
            cooldown: 35.0,
            capacity: 0,
            visuals: WeaponVisuals::default(),
            attack_sound: None,
        }
    }

    pub fn shotgun() -> Self {
        Self {
            name: "shotgun".to_string(),
            kind: WeaponKind::Hitscan,
            damage: 100.0,
            range: 20.0,
            cooldown: 60.0,
            capacity: 25,
            visuals: WeaponVisuals::default(),
            attack_sound: None,
        }
    }

    pub fn launcher() -> Self {
        Self {
            name: "launcher".to_string(),
            kind: WeaponKind::Missile(MissileSpec::default()),
            damage: 0.0,
            range: 10.0,
            cooldown: 25.0,
            capacity: 25,
            visuals: WeaponVisuals::default(),
            attack_sound: None,
        }
    }

    pub fn consumes_ammo(&self) -> bool {
        self.capacity > 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct WeaponTable {
    weapons: Vec<Weapon>,
}

impl WeaponTable {
    pub fn insert(&mut self, weapon: Weapon) -> WeaponId {
        let id = WeaponId(self.weapons.len() as u16);
        self.weapons.push(weapon);
        id
    }

    pub fn get(&self, id: WeaponId) -> Option<&Weapon> {
        self.weapons.get(id.0 as usize)
    }

    pub fn find(&self, name: &str) -> Option<WeaponId> {
        self.weapons
            .iter()
            .position(|weapon| weapon.name == name)
            .map(|index| WeaponId(index as u16))
    }

    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }
}

/// Owned weapons and their remaining ammo or durability.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    counts: BTreeMap<WeaponId, u32>,
}

impl Inventory {
    pub fn has(&self, id: WeaponId) -> bool {
        self.counts.contains_key(&id)
    }

    pub fn count(&self, id: WeaponId) -> u32 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    /// Adds `amount`, clamped to `capacity` when the weapon has one.
    pub fn give(&mut self, id: WeaponId, amount: u32, capacity: u32) {
        let entry = self.counts.entry(id).or_insert(0);
        *entry = entry.saturating_add(amount);
        if capacity > 0 {
            *entry = (*entry).min(capacity);
        }
    }

    pub fn take_one(&mut self, id: WeaponId) -> bool {
        match self.counts.get_mut(&id) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn weapons(&self) -> impl Iterator<Item = WeaponId> + '_ {
        self.counts.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_carry_reference_stats() {
        let fist = Weapon::fist();
        assert_eq!(fist.range, 0.25);
        assert_eq!(fist.cooldown, 35.0);
        assert!(!fist.consumes_ammo());

        let shotgun = Weapon::shotgun();
        assert_eq!(shotgun.range, 20.0);
        assert_eq!(shotgun.capacity, 25);

        let launcher = Weapon::launcher();
        let WeaponKind::Missile(spec) = &launcher.kind else {
            panic!("launcher must fire missiles");
        };
        assert_eq!(spec.speed, 0.075);
        assert_eq!(spec.blast_radius, 0.5);
    }

    #[test]
    fn inventory_clamps_to_capacity_and_counts_down() {
        let mut inventory = Inventory::default();
        let id = WeaponId(1);
        inventory.give(id, 20, 25);
        inventory.give(id, 20, 25);
        assert_eq!(inventory.count(id), 25);

        assert!(inventory.take_one(id));
        assert_eq!(inventory.count(id), 24);
        assert!(!inventory.take_one(WeaponId(9)));
    }

    #[test]
    fn table_lookup_by_name() {
        let mut table = WeaponTable::default();
        let fist = table.insert(Weapon::fist());
        let shotgun = table.insert(Weapon::shotgun());
        assert_eq!(table.find("shotgun"), Some(shotgun));
        assert_eq!(table.find("fist"), Some(fist));
        assert!(table.find("bow").is_none());
    }
}
